//! Per-connection idle watchdog.
//!
//! Each connection arms an [`IdleTimer`] and re-arms it on every line read.
//! The paired [`IdleWatch`] resolves once the deadline elapses untouched,
//! and the connection handler races it against the socket read in a single
//! `select!`. This is an explicit re-armable deadline rather than a
//! `tokio::time::timeout` wrapper around each read, so the window spans
//! inbound silence as a whole and the expiry path stays cancellable.
//!
//! State machine: `Armed -> (traffic) -> Armed` (deadline reset) or
//! `Armed -> (deadline elapsed) -> Expired`.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};

/// Re-armable idle deadline. Held by the connection's read loop.
pub struct IdleTimer {
    deadline: watch::Sender<Instant>,
    window: Duration,
}

impl IdleTimer {
    /// Creates an armed timer expiring `window` from now, and the watch
    /// future that resolves when it expires.
    pub fn new(window: Duration) -> (Self, IdleWatch) {
        let (tx, rx) = watch::channel(Instant::now() + window);
        (
            Self {
                deadline: tx,
                window,
            },
            IdleWatch { deadline: rx },
        )
    }

    /// Resets the deadline to a full window from now. Called on every
    /// observed inbound line.
    pub fn touch(&self) {
        self.deadline.send_replace(Instant::now() + self.window);
    }
}

/// The expiry side of an [`IdleTimer`].
pub struct IdleWatch {
    deadline: watch::Receiver<Instant>,
}

impl IdleWatch {
    /// Resolves once the deadline elapses without a `touch` in between.
    ///
    /// If the timer half is dropped the watch disarms and never resolves;
    /// by then the connection is tearing down anyway.
    pub async fn expired(mut self) {
        loop {
            let deadline = *self.deadline.borrow_and_update();

            tokio::select! {
                _ = sleep_until(deadline) => {
                    match self.deadline.has_changed() {
                        // Touched while we slept - re-arm with the new deadline
                        Ok(true) => continue,
                        // Genuinely expired
                        Ok(false) => return,
                        // Timer dropped - disarm
                        Err(_) => std::future::pending::<()>().await,
                    }
                }
                changed = self.deadline.changed() => {
                    if changed.is_err() {
                        std::future::pending::<()>().await;
                    }
                    // Deadline moved - loop picks up the new value
                }
            }
        }
    }
}
