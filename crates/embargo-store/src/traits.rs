//! Store traits: the abstract interfaces for key and description persistence.

use async_trait::async_trait;
use embargo_core::{CollectionDescription, SecretKey};

use crate::error::{Result, StoreError};

/// Canonical storage of one secret key per collection id.
///
/// This is the source of truth for keys: caches in front of it may be
/// dropped at any time (process restart) and refilled from here.
#[async_trait]
pub trait SecretKeyStore: Send + Sync {
    /// Load the key for a collection, if one has been stored.
    async fn load(&self, collection_id: &str) -> Result<Option<SecretKey>>;

    /// Store (or replace) the key for a collection.
    async fn store(&self, collection_id: &str, key: &SecretKey) -> Result<()>;

    /// Delete the key for a collection.
    ///
    /// Returns `true` if a key was present. Deleting an absent key is not an error.
    async fn delete(&self, collection_id: &str) -> Result<bool>;

    /// List every collection id that has a stored key.
    async fn list(&self) -> Result<Vec<String>>;
}

/// Persistence of collection descriptions.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Write the description, replacing any previous version.
    async fn save(&self, description: &CollectionDescription) -> Result<()>;

    /// Read a description by collection id.
    async fn load(&self, collection_id: &str) -> Result<Option<CollectionDescription>>;

    /// Remove a description. Returns `true` if one was present.
    async fn delete(&self, collection_id: &str) -> Result<bool>;
}

/// Reject ids that are empty or could escape a storage directory.
pub(crate) fn check_id(collection_id: &str) -> Result<()> {
    let bad = collection_id.is_empty()
        || collection_id == "."
        || collection_id == ".."
        || collection_id.contains(['/', '\\', '\0']);
    if bad {
        return Err(StoreError::InvalidId(collection_id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_id() {
        assert!(check_id("economy-2024-q1").is_ok());
        assert!(check_id("").is_err());
        assert!(check_id("..").is_err());
        assert!(check_id("../etc").is_err());
        assert!(check_id("a\\b").is_err());
    }
}
