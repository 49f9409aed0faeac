//! Provider-issued identity.

use std::fmt::{Display, Formatter};

/// Assertion by the identity provider of who is signed in.
///
/// Immutable for the life of a session. Provider adapters build it from their
/// callback payloads; the core only restores one from a cached user record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    uid: String,
    email: String,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
        }
    }

    /// Opaque provider identifier. Also the user document id.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

// Only the uid is printed; emails stay out of logs.
impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uid)
    }
}
