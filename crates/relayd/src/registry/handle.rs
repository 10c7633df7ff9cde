//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` is a cheap-to-clone interface for sending commands
//! to the registry actor. Channel errors are mapped to
//! `RegistryError::ChannelClosed`; read operations degrade to empty/`None`
//! when the actor is gone, matching the "every failure is scoped to one
//! session" rule - a dying registry never panics a connection task.

use relay_core::{OnlineUser, UserName};
use tokio::sync::{mpsc, oneshot};

use crate::session::SessionHandle;

use super::commands::{RegistryCommand, RegistryError};

/// Handle for interacting with the registry actor.
///
/// Clone freely; all methods communicate with the actor via channels.
#[derive(Clone)]
pub struct RegistryHandle {
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Registers a session under `name`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::Domain(NameTaken)` if the name is already held
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn add(&self, name: UserName, session: SessionHandle) -> Result<(), RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Add {
                name,
                session,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await
            .map_err(|_| RegistryError::ChannelClosed)?
            .map_err(RegistryError::from)
    }

    /// Removes the entry for `name`, waiting for the removal to be applied.
    ///
    /// Idempotent; removing an absent name is a no-op. Actor shutdown is
    /// ignored - there is nothing left to remove from.
    pub async fn remove(&self, name: &UserName) {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Remove {
                name: name.clone(),
                respond_to: tx,
            })
            .await
            .is_err()
        {
            return;
        }

        let _ = rx.await;
    }

    /// Atomically renames `old` to `new`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::Domain(NameTaken)` if `new` is already held
    /// - `RegistryError::Domain(UserNotFound)` if `old` is not registered
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn rename(&self, old: UserName, new: UserName) -> Result<(), RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Rename {
                old,
                new,
                respond_to: tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await
            .map_err(|_| RegistryError::ChannelClosed)?
            .map_err(RegistryError::from)
    }

    /// Returns a defensive copy of the online map.
    ///
    /// Returns an empty vector if the actor has shut down.
    pub async fn snapshot(&self) -> Vec<(UserName, SessionHandle)> {
        let (tx, rx) = oneshot::channel();

        if self
            .sender
            .send(RegistryCommand::Snapshot { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Snapshot projected to the read-only view used by `who` replies.
    pub async fn online_users(&self) -> Vec<OnlineUser> {
        self.snapshot()
            .await
            .into_iter()
            .map(|(name, session)| OnlineUser {
                name,
                addr: session.addr().clone(),
            })
            .collect()
    }

    /// Looks up the session registered under `name`.
    ///
    /// Returns `None` if the user is not online or the actor has shut down.
    pub async fn lookup(&self, name: &UserName) -> Option<SessionHandle> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(RegistryCommand::Lookup {
                name: name.clone(),
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Check if the actor is still running.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}
