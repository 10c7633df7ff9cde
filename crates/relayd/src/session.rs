//! Per-connection session plumbing.
//!
//! Each accepted connection owns an unbounded outbound queue with exactly one
//! writer task draining it to the socket for the session's whole lifetime.
//! The queue closes when the last [`SessionHandle`] clone is dropped (the
//! registry entry plus the connection handler's own copy); the writer drains
//! whatever is still buffered and then shuts the socket down, so lines
//! enqueued just before removal - like the idle-kick warning - still reach
//! the client.

use relay_core::PeerAddr;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// The registry-facing side of one session: its immutable peer address and a
/// sender for its outbound queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    addr: PeerAddr,
    outbound: mpsc::UnboundedSender<String>,
}

impl SessionHandle {
    pub fn new(addr: PeerAddr, outbound: mpsc::UnboundedSender<String>) -> Self {
        Self { addr, outbound }
    }

    /// Remote address this session was accepted from.
    pub fn addr(&self) -> &PeerAddr {
        &self.addr
    }

    /// Enqueues one line for delivery to this session's socket.
    ///
    /// Never blocks - the queue is unbounded. Fails only once the session's
    /// queue has closed (session going offline), which callers treat as
    /// "this user is gone".
    pub fn send(&self, line: String) -> Result<(), SessionClosed> {
        self.outbound.send(line).map_err(|_| SessionClosed)
    }
}

/// The session's outbound queue has closed; the user is offline.
#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("session queue closed")]
pub struct SessionClosed;

/// Spawns the single writer task for one session.
///
/// Drains the outbound queue to the socket, one message per line, until the
/// queue closes or a write fails. On queue close the remaining buffered
/// lines are written out first, then the write half is shut down.
pub fn spawn_writer<W>(mut outbound: mpsc::UnboundedReceiver<String>, writer: W) -> JoinHandle<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut writer = BufWriter::new(writer);

        while let Some(line) = outbound.recv().await {
            let result = async {
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                Ok::<(), std::io::Error>(())
            }
            .await;

            if let Err(e) = result {
                debug!(error = %e, "session writer stopping: write failed");
                return;
            }
        }

        // Queue closed at removal; send the peer a FIN.
        let _ = writer.shutdown().await;
    })
}
