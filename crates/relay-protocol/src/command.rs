//! Parsing client input lines.
//!
//! Recognized forms (case-sensitive, keyword-exact):
//!
//! - `who` - list online users, reply to sender only
//! - `rename|<name>` - change display name
//! - `to|<target>|<message>` - direct message, split on the first two `|`
//! - anything else non-empty - public chat message
//!
//! A malformed `to|` line (fewer than two pipes, or an empty target) parses
//! to [`Command::Malformed`] and becomes an error reply, never a crash.

use relay_core::UserName;
use thiserror::Error;

/// One parsed line of client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `who` - query the online list.
    Who,

    /// `rename|<name>` - request a new display name.
    ///
    /// The name is trimmed of surrounding whitespace but otherwise taken
    /// verbatim - no length or character restrictions.
    Rename { name: UserName },

    /// `to|<target>|<text>` - direct message to one named user.
    ///
    /// An empty `text` is syntactically valid and parses as-is; whether the
    /// target exists is checked first at dispatch, so the emptiness reply
    /// never shadows `no such user`.
    Direct { target: UserName, text: String },

    /// Any other non-empty line - public chat message.
    Broadcast { text: String },

    /// Syntactically invalid command; the payload is the error reply.
    Malformed(Malformed),
}

/// Why a line failed to parse. The Display text doubles as the reply line
/// sent back to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Malformed {
    /// `to|` with fewer than two pipes.
    #[error("malformed command: expected to|<name>|<message>")]
    MissingSeparator,

    /// `to||<message>` - no target name.
    #[error("malformed command: expected to|<name>|<message>")]
    MissingTarget,
}

/// Parses one line of client input.
///
/// The trailing newline (and optional carriage return) is stripped first.
/// Returns `None` for empty lines, which are ignored rather than broadcast.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    if line.is_empty() {
        return None;
    }

    if line == "who" {
        return Some(Command::Who);
    }

    if let Some(rest) = line.strip_prefix("rename|") {
        return Some(Command::Rename {
            name: UserName::new(rest),
        });
    }

    if let Some(rest) = line.strip_prefix("to|") {
        return Some(parse_direct(rest));
    }

    Some(Command::Broadcast {
        text: line.to_string(),
    })
}

/// Parses the remainder of a `to|` line: `<target>|<text>`.
fn parse_direct(rest: &str) -> Command {
    let Some((target, text)) = rest.split_once('|') else {
        return Command::Malformed(Malformed::MissingSeparator);
    };

    let target = UserName::new(target);
    if target.is_empty() {
        return Command::Malformed(Malformed::MissingTarget);
    }

    Command::Direct {
        target,
        text: text.to_string(),
    }
}
