//! Registry actor commands and errors.
//!
//! Message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: commands sent to the actor
//! - `RegistryError`: errors surfaced to registry callers
//!
//! Each request-response command carries a oneshot channel for its reply.

use relay_core::{DomainError, UserName};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::session::SessionHandle;

/// Commands sent to the registry actor.
#[derive(Debug)]
pub enum RegistryCommand {
    /// Register a session under `name`.
    ///
    /// Inserts only if the name is absent; the entry is visible to all
    /// concurrent readers immediately after success.
    ///
    /// # Errors
    /// - `DomainError::NameTaken` if the name is already held
    Add {
        name: UserName,
        session: SessionHandle,
        respond_to: oneshot::Sender<Result<(), DomainError>>,
    },

    /// Remove the entry for `name`. Idempotent: removing an absent name is
    /// a no-op. The ack lets callers sequence removal before announcing it.
    Remove {
        name: UserName,
        respond_to: oneshot::Sender<()>,
    },

    /// Atomically move the session registered under `old` to `new`.
    ///
    /// Availability of `new` is checked first, then the swap; no observer
    /// window exists in which neither or both names map to the session.
    ///
    /// # Errors
    /// - `DomainError::NameTaken` if `new` is already held (including by
    ///   the caller itself - renaming to your current name is a conflict)
    /// - `DomainError::UserNotFound` if `old` is not registered
    Rename {
        old: UserName,
        new: UserName,
        respond_to: oneshot::Sender<Result<(), DomainError>>,
    },

    /// Defensive copy of the full online map. Later registry mutations are
    /// never visible through a snapshot.
    Snapshot {
        respond_to: oneshot::Sender<Vec<(UserName, SessionHandle)>>,
    },

    /// Point lookup for direct-message routing.
    Lookup {
        name: UserName,
        respond_to: oneshot::Sender<Option<SessionHandle>>,
    },
}

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A domain rule rejected the operation (name taken, user not found).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The actor has shut down and the command channel is closed.
    #[error("registry channel closed")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_error_display() {
        let err = RegistryError::Domain(DomainError::NameTaken {
            name: UserName::new("alice"),
        });
        assert_eq!(err.to_string(), "name taken: alice");

        let err = RegistryError::ChannelClosed;
        assert_eq!(err.to_string(), "registry channel closed");
    }

    #[tokio::test]
    async fn test_command_oneshot_pattern() {
        let (tx, rx) = oneshot::channel::<Result<(), DomainError>>();

        tokio::spawn(async move {
            tx.send(Ok(())).ok();
        });

        let result = rx.await;
        assert!(result.is_ok());
        assert!(result.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_command_channel_closed_error() {
        let (tx, rx) = oneshot::channel::<Result<(), DomainError>>();
        drop(tx);

        assert!(rx.await.is_err());
    }
}
