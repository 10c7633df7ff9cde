//! Core domain types shared between the protocol and daemon crates.
//!
//! All production code follows the panic-free policy: no `.unwrap()`,
//! `.expect()`, `panic!()`, `unreachable!()`, `todo!()`.

pub mod error;
pub mod user;

// Re-exports for convenience
pub use error::{DomainError, DomainResult};
pub use user::{OnlineUser, PeerAddr, UserName};
