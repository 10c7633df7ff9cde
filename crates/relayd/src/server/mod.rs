//! TCP server for the relay daemon.
//!
//! The server:
//! - Listens on a TCP address for client connections
//! - Spawns a ConnectionHandler for each client
//! - Keeps accepting after individual accept failures
//! - Supports shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   RelayServer   │
//! │                 │
//! │   TcpListener   │
//! └───────┬─────────┘
//!         │ accept()
//!         ▼
//! ┌─────────────────┐     ┌─────────────────┐
//! │ConnectionHandler│────▶│  RegistryHandle │
//! │  (per client)   │     │                 │
//! └───────┬─────────┘     └─────────────────┘
//!         │ chat lines
//!         ▼
//! ┌─────────────────┐
//! │ broadcast queue │
//! └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Accept errors are logged and allow continued operation

mod connection;

pub use connection::{ConnectionHandler, DisconnectReason};

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::registry::RegistryHandle;

/// Default listen address
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8888";

/// Default idle window before a silent client is kicked
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// TCP server for the relay daemon.
///
/// Owns the listener and the per-connection wiring.
pub struct RelayServer {
    /// Bound listener
    listener: TcpListener,

    /// Handle to the online-user registry
    registry: RegistryHandle,

    /// Producer side of the shared broadcast queue
    broadcast: mpsc::UnboundedSender<String>,

    /// Idle window applied to every connection
    idle_timeout: Duration,

    /// Cancellation token for shutdown
    cancel_token: CancellationToken,
}

impl RelayServer {
    /// Binds the listener and creates the server.
    ///
    /// Use an address with port `0` to bind an ephemeral port; the bound
    /// address is available through [`local_addr`](Self::local_addr).
    pub async fn bind(
        addr: &str,
        registry: RegistryHandle,
        broadcast: mpsc::UnboundedSender<String>,
        idle_timeout: Duration,
        cancel_token: CancellationToken,
    ) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await.map_err(|e| ServerError::Bind {
            addr: addr.to_string(),
            error: e.to_string(),
        })?;

        Ok(Self {
            listener,
            registry,
            broadcast,
            idle_timeout,
            cancel_token,
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::LocalAddr(e.to_string()))
    }

    /// Runs the accept loop.
    ///
    /// Accepts connections until the cancellation token fires. A failed
    /// accept is logged and the loop continues - one bad handshake never
    /// takes the server down.
    pub async fn run(self) -> Result<(), ServerError> {
        info!(addr = %self.local_addr()?, "relay server listening");

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("server shutdown requested");
                    break;
                }

                result = self.listener.accept() => {
                    match result {
                        Ok((stream, addr)) => self.handle_connection(stream, addr),
                        Err(e) => {
                            error!(error = %e, "failed to accept connection");
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Spawns the handler task for one accepted connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let handler = ConnectionHandler::new(
            stream,
            addr,
            self.registry.clone(),
            self.broadcast.clone(),
            self.idle_timeout,
            self.cancel_token.clone(),
        );

        tokio::spawn(handler.run());
    }
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {error}")]
    Bind { addr: String, error: String },

    #[error("listener address unavailable: {0}")]
    LocalAddr(String),
}
