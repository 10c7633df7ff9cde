//! Formatting of the text lines the server sends.
//!
//! Every reply is a bare text line; the newline delimiter is appended by the
//! session writer, not here.

use relay_core::{OnlineUser, PeerAddr, UserName};

/// Reply to a `to|` command naming a user that is not online.
pub const NO_SUCH_USER: &str = "no such user";

/// Reply to a `to|` command with an online target but nothing to deliver.
/// Target existence is resolved first, so an unknown target always reports
/// [`NO_SUCH_USER`] even with an empty body.
pub const EMPTY_MESSAGE: &str = "empty message";

/// Reply to a `rename|` command that collided with an existing name.
pub const NAME_TAKEN: &str = "name taken";

/// Final warning sent to a session just before an idle disconnect.
pub const IDLE_KICK: &str = "kicked for inactivity";

/// Reply to a successful rename.
pub fn renamed_to(name: &UserName) -> String {
    format!("renamed to {name}")
}

/// One row of a `who` reply. `index` is 1-based.
pub fn who_row(index: usize, user: &OnlineUser) -> String {
    format!("{index}:[{}]{}:online", user.addr, user.name)
}

/// A public chat line as seen by every online user.
pub fn chat_line(addr: &PeerAddr, name: &UserName, text: &str) -> String {
    format!("[{addr}]{name}: {text}")
}

/// A direct message as seen by its target.
pub fn direct_line(sender: &UserName, text: &str) -> String {
    format!("{sender} says: {text}")
}

/// Broadcast announcement for a user coming online.
pub fn joined(name: &UserName) -> String {
    format!("{name} joined")
}

/// Broadcast announcement for a user going offline.
pub fn left(name: &UserName) -> String {
    format!("{name} left")
}
