//! User identity types.
//!
//! A connected client is identified by a display name (mutable, defaults to
//! the remote socket address) and its remote address (immutable).

use std::fmt;

/// Display name of a connected user.
///
/// Names are unique among concurrently-online users; uniqueness is enforced
/// by the registry, not here. Beyond trimming surrounding whitespace the
/// name is taken verbatim - no length or character restrictions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserName(String);

impl UserName {
    /// Creates a user name, trimming surrounding whitespace.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_string())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the trimmed name is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&PeerAddr> for UserName {
    /// The default name of a freshly accepted connection is its address.
    fn from(addr: &PeerAddr) -> Self {
        Self(addr.as_str().to_string())
    }
}

/// Remote address of a connection, kept as the string form it was accepted
/// with. Immutable for the lifetime of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr(String);

impl PeerAddr {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only view of one online user, as returned by registry snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineUser {
    pub name: UserName,
    pub addr: PeerAddr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_name_trims_whitespace() {
        assert_eq!(UserName::new("  alice \n").as_str(), "alice");
    }

    #[test]
    fn test_user_name_verbatim_otherwise() {
        // No character restrictions - pipes and spaces inside survive
        assert_eq!(UserName::new("al ice|x").as_str(), "al ice|x");
    }

    #[test]
    fn test_user_name_empty() {
        assert!(UserName::new("   ").is_empty());
        assert!(!UserName::new("a").is_empty());
    }

    #[test]
    fn test_default_name_is_peer_addr() {
        let addr = PeerAddr::new("127.0.0.1:50312");
        let name = UserName::from(&addr);
        assert_eq!(name.as_str(), "127.0.0.1:50312");
    }

    #[test]
    fn test_display_round_trip() {
        let name = UserName::new("bob");
        assert_eq!(name.to_string(), "bob");
        let addr = PeerAddr::new("10.0.0.1:9");
        assert_eq!(addr.to_string(), "10.0.0.1:9");
    }
}
