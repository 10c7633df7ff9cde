//! Broadcast relay - fan-out from the shared queue to every session.
//!
//! One long-lived task consumes the broadcast queue (many producers: any
//! connection's chat lines, plus join/left announcements). For each line it
//! takes a registry snapshot and enqueues onto every online session's own
//! outbound queue. Because each session's queue is unbounded and independent,
//! a stalled session can never block delivery to the rest.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::registry::RegistryHandle;

/// Spawns the relay task.
///
/// Runs until the broadcast queue closes (all producers dropped) or the
/// cancellation token fires.
pub fn spawn_relay(
    mut inbox: mpsc::UnboundedReceiver<String>,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("broadcast relay started");

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("broadcast relay shutting down");
                    break;
                }

                line = inbox.recv() => {
                    match line {
                        Some(line) => fan_out(&registry, line).await,
                        None => {
                            debug!("broadcast queue closed");
                            break;
                        }
                    }
                }
            }
        }
    })
}

/// Delivers one line to the snapshot of sessions online right now.
async fn fan_out(registry: &RegistryHandle, line: String) {
    for (name, session) in registry.snapshot().await {
        // A session can go offline between snapshot and send; its queue
        // rejects the line and the disconnect path handles the rest.
        if session.send(line.clone()).is_err() {
            debug!(name = %name, "skipped broadcast to closed session queue");
        }
    }
}
