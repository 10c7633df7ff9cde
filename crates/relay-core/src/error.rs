//! Domain-specific error types following panic-free policy.

use crate::UserName;
use thiserror::Error;

/// Errors that can occur in domain operations.
#[derive(Error, Debug, Clone)]
pub enum DomainError {
    /// The requested user is not online
    #[error("no such user: {name}")]
    UserNotFound { name: UserName },

    /// The display name is already held by another online user
    #[error("name taken: {name}")]
    NameTaken { name: UserName },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
