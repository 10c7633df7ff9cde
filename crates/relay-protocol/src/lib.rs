//! Wire protocol for the relay chat server.
//!
//! The protocol is plain newline-delimited UTF-8 text over TCP - no framing
//! beyond the delimiter, no length prefixes, no structured envelope. This
//! crate owns both directions:
//!
//! - `command` - parsing one inbound line into a tagged [`Command`] variant
//! - `reply` - formatting the text lines the server sends back
//!
//! Parsing is fully decoupled from dispatch so it can be tested without a
//! socket in sight.

pub mod command;
pub mod reply;

pub use command::{parse, Command, Malformed};
