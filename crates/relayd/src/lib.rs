//! Relay daemon - in-memory chat relay over newline-delimited TCP.
//!
//! This crate provides the server side of the relay:
//! - `registry` - online-user directory actor, the single source of truth
//!   for who is connected
//! - `session` - per-connection outbound queue and its single writer task
//! - `relay` - broadcast fan-out from the shared queue to every session
//! - `idle` - per-connection watchdog that evicts silent clients
//! - `server` - TCP acceptor and per-connection command dispatch
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐  accept   ┌──────────────────┐  commands  ┌───────────────┐
//! │   RelayServer   │──────────▶│ConnectionHandler │───────────▶│ RegistryActor │
//! │  (TcpListener)  │           │  (per client)    │            │ (name→session)│
//! └─────────────────┘           └────────┬─────────┘            └───────┬───────┘
//!                                        │ chat lines                   │ snapshot
//!                                        ▼                              ▼
//!                               ┌──────────────────┐  fan-out   ┌───────────────┐
//!                               │ broadcast queue  │───────────▶│ every session │
//!                               │ (mpsc, 1 reader) │            │ outbound queue│
//!                               └──────────────────┘            └───────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod idle;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;
