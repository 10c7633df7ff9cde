//! Connection handler for individual clients.
//!
//! Each accepted connection gets its own `ConnectionHandler` that:
//! - Registers the session (default name = remote address) and announces it
//! - Reads lines and routes parsed commands
//! - Races the read loop against the idle watchdog
//! - Drives the one-shot offline transition on exit
//!
//! Session lifecycle: `Connecting → Online → Offline` (terminal). Every exit
//! path - EOF, transport error, idle timeout, server shutdown - funnels into
//! the same offline transition, which runs exactly once because it consumes
//! the handler.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Protocol errors become reply lines; transport errors end only this
//!   session, never the server

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use relay_core::{DomainError, PeerAddr, UserName};
use relay_protocol::{parse, reply, Command};

use crate::idle::IdleTimer;
use crate::registry::{RegistryError, RegistryHandle};
use crate::session::{spawn_writer, SessionHandle};

/// Why a connection ended. Idle kicks are policy, not errors, and are
/// logged distinctly from transport failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Client closed the connection.
    Eof,

    /// Read failed mid-stream.
    Transport(String),

    /// No inbound traffic for the full idle window.
    IdleTimeout,

    /// Server is shutting down.
    Cancelled,
}

/// Handler for a single client connection.
pub struct ConnectionHandler {
    stream: TcpStream,
    addr: PeerAddr,
    registry: RegistryHandle,
    broadcast: mpsc::UnboundedSender<String>,
    idle_timeout: Duration,
    cancel_token: CancellationToken,
}

impl ConnectionHandler {
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        registry: RegistryHandle,
        broadcast: mpsc::UnboundedSender<String>,
        idle_timeout: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            stream,
            addr: PeerAddr::new(addr.to_string()),
            registry,
            broadcast,
            idle_timeout,
            cancel_token,
        }
    }

    /// Runs the connection from accept to offline.
    pub async fn run(self) {
        debug!(addr = %self.addr, "client connected");

        let Self {
            stream,
            addr,
            registry,
            broadcast,
            idle_timeout,
            cancel_token,
        } = self;

        let (read_half, write_half) = stream.into_split();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        spawn_writer(outbound_rx, write_half);

        let session = SessionHandle::new(addr.clone(), outbound_tx);
        let mut name = UserName::from(&addr);

        // Connecting → Online
        if let Err(e) = registry.add(name.clone(), session.clone()).await {
            // An online user can hold this address string as a display name
            // (rename accepts arbitrary text), so the initial add can
            // legitimately collide. Tell the newcomer before hanging up; the
            // writer drains the queue after the handles drop.
            warn!(addr = %addr, error = %e, "failed to register session");
            if let RegistryError::Domain(DomainError::NameTaken { .. }) = e {
                let _ = session.send(reply::NAME_TAKEN.to_string());
            }
            return;
        }
        let _ = broadcast.send(reply::joined(&name));

        let (idle_timer, idle_watch) = IdleTimer::new(idle_timeout);
        tokio::pin! {
            let expired = idle_watch.expired();
        }

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();

        let reason = loop {
            line.clear();

            tokio::select! {
                _ = &mut expired => {
                    // Final warning; still flushed because the writer drains
                    // the queue before closing the socket.
                    let _ = session.send(reply::IDLE_KICK.to_string());
                    break DisconnectReason::IdleTimeout;
                }

                _ = cancel_token.cancelled() => {
                    break DisconnectReason::Cancelled;
                }

                result = reader.read_line(&mut line) => {
                    match result {
                        Ok(0) => break DisconnectReason::Eof,
                        Ok(_) => {
                            idle_timer.touch();
                            if let Some(cmd) = parse(&line) {
                                dispatch(cmd, &mut name, &session, &registry, &broadcast).await;
                            }
                        }
                        Err(e) => break DisconnectReason::Transport(e.to_string()),
                    }
                }
            }
        };

        set_offline(name, reason, &registry, &broadcast).await;
        // Dropping `session` (and the registry entry, already removed)
        // closes the outbound queue; the writer drains it and sends FIN,
        // which also unblocks the peer's in-flight read.
    }
}

/// Applies one parsed command for the session currently named `name`.
async fn dispatch(
    cmd: Command,
    name: &mut UserName,
    session: &SessionHandle,
    registry: &RegistryHandle,
    broadcast: &mpsc::UnboundedSender<String>,
) {
    match cmd {
        Command::Who => {
            for (index, user) in registry.online_users().await.iter().enumerate() {
                let _ = session.send(reply::who_row(index + 1, user));
            }
        }

        Command::Rename { name: new_name } => {
            match registry.rename(name.clone(), new_name.clone()).await {
                Ok(()) => {
                    *name = new_name;
                    let _ = session.send(reply::renamed_to(name));
                }
                Err(RegistryError::Domain(DomainError::NameTaken { .. })) => {
                    let _ = session.send(reply::NAME_TAKEN.to_string());
                }
                Err(e) => {
                    // UserNotFound for our own live name, or actor shutdown
                    warn!(name = %name, error = %e, "rename failed");
                }
            }
        }

        Command::Direct { target, text } => {
            // Target existence is resolved before the body is inspected, so
            // an unknown target reports absence even for an empty message.
            match registry.lookup(&target).await {
                None => {
                    let _ = session.send(reply::NO_SUCH_USER.to_string());
                }
                Some(_) if text.is_empty() => {
                    let _ = session.send(reply::EMPTY_MESSAGE.to_string());
                }
                Some(peer) => {
                    // Queue closed between lookup and send: the user is gone
                    if peer.send(reply::direct_line(name, &text)).is_err() {
                        let _ = session.send(reply::NO_SUCH_USER.to_string());
                    }
                }
            }
        }

        Command::Broadcast { text } => {
            let line = reply::chat_line(session.addr(), name, &text);
            if broadcast.send(line).is_err() {
                warn!(name = %name, "broadcast queue closed, dropping message");
            }
        }

        Command::Malformed(reason) => {
            let _ = session.send(reason.to_string());
        }
    }
}

/// Online → Offline, exactly once per connection.
///
/// The removal is acknowledged by the registry before the announcement is
/// enqueued, so the departing session is never part of the fan-out snapshot
/// for its own "left" line.
async fn set_offline(
    name: UserName,
    reason: DisconnectReason,
    registry: &RegistryHandle,
    broadcast: &mpsc::UnboundedSender<String>,
) {
    match &reason {
        DisconnectReason::IdleTimeout => {
            info!(name = %name, "kicking idle session");
        }
        DisconnectReason::Transport(error) => {
            debug!(name = %name, error = %error, "connection error");
        }
        DisconnectReason::Eof => {
            debug!(name = %name, "client disconnected");
        }
        DisconnectReason::Cancelled => {
            debug!(name = %name, "closing session for shutdown");
        }
    }

    registry.remove(&name).await;
    let _ = broadcast.send(reply::left(&name));
}
