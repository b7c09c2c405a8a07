//! Principals: users, their sessions, and their private keyrings.

use std::collections::HashMap;

use crate::crypto::SecretKey;

/// A user's private keyring.
///
/// The keys are only readable while the user's session is authenticated;
/// a locked keyring exposes nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UserKeyring {
    #[default]
    Locked,
    Unlocked(HashMap<String, SecretKey>),
}

impl UserKeyring {
    /// An unlocked keyring with no keys.
    pub fn unlocked() -> Self {
        UserKeyring::Unlocked(HashMap::new())
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, UserKeyring::Unlocked(_))
    }

    /// Add a key. Returns `false` if the keyring is locked.
    pub fn put(&mut self, collection_id: impl Into<String>, key: SecretKey) -> bool {
        match self {
            UserKeyring::Unlocked(keys) => {
                keys.insert(collection_id.into(), key);
                true
            }
            UserKeyring::Locked => false,
        }
    }

    /// The keys, or `None` while locked.
    pub fn keys(&self) -> Option<&HashMap<String, SecretKey>> {
        match self {
            UserKeyring::Unlocked(keys) => Some(keys),
            UserKeyring::Locked => None,
        }
    }

    /// Drop all key material and return to the locked state.
    pub fn lock(&mut self) {
        *self = UserKeyring::Locked;
    }
}

/// A user of the publishing system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
    pub keyring: Option<UserKeyring>,
    /// Administrators unlock the publishing queue after a restart.
    pub admin: bool,
}

impl User {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            keyring: None,
            admin: false,
        }
    }

    pub fn with_keyring(mut self, keyring: UserKeyring) -> Self {
        self.keyring = Some(keyring);
        self
    }

    pub fn as_admin(mut self) -> Self {
        self.admin = true;
        self
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub email: String,
}

impl Session {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_keyring_rejects_keys() {
        let mut keyring = UserKeyring::Locked;
        assert!(!keyring.put("c-1", SecretKey::generate()));
        assert!(keyring.keys().is_none());
    }

    #[test]
    fn test_lock_drops_keys() {
        let mut keyring = UserKeyring::unlocked();
        assert!(keyring.put("c-1", SecretKey::generate()));
        assert_eq!(keyring.keys().map(|k| k.len()), Some(1));

        keyring.lock();
        assert!(!keyring.is_unlocked());
    }
}
