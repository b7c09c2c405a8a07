//! In-memory implementations of the store traits.
//!
//! These are primarily for testing. They have the same semantics as the
//! persistent stores but keep everything in memory.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use embargo_core::{CollectionDescription, SecretKey};

use crate::error::{Result, StoreError};
use crate::traits::{check_id, CollectionStore, SecretKeyStore};

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::InvalidData(format!("lock poisoned: {}", e))
}

/// In-memory key store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<HashMap<String, SecretKey>>,
}

impl MemoryKeyStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.keys.read().map(|k| k.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SecretKeyStore for MemoryKeyStore {
    async fn load(&self, collection_id: &str) -> Result<Option<SecretKey>> {
        let keys = self.keys.read().map_err(poisoned)?;
        Ok(keys.get(collection_id).cloned())
    }

    async fn store(&self, collection_id: &str, key: &SecretKey) -> Result<()> {
        check_id(collection_id)?;
        let mut keys = self.keys.write().map_err(poisoned)?;
        keys.insert(collection_id.to_string(), key.clone());
        Ok(())
    }

    async fn delete(&self, collection_id: &str) -> Result<bool> {
        let mut keys = self.keys.write().map_err(poisoned)?;
        Ok(keys.remove(collection_id).is_some())
    }

    async fn list(&self) -> Result<Vec<String>> {
        let keys = self.keys.read().map_err(poisoned)?;
        let mut ids: Vec<String> = keys.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

/// In-memory description store.
#[derive(Default)]
pub struct MemoryCollectionStore {
    descriptions: RwLock<HashMap<String, CollectionDescription>>,
}

impl MemoryCollectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CollectionStore for MemoryCollectionStore {
    async fn save(&self, description: &CollectionDescription) -> Result<()> {
        check_id(&description.id)?;
        let mut descriptions = self.descriptions.write().map_err(poisoned)?;
        descriptions.insert(description.id.clone(), description.clone());
        Ok(())
    }

    async fn load(&self, collection_id: &str) -> Result<Option<CollectionDescription>> {
        let descriptions = self.descriptions.read().map_err(poisoned)?;
        Ok(descriptions.get(collection_id).cloned())
    }

    async fn delete(&self, collection_id: &str) -> Result<bool> {
        let mut descriptions = self.descriptions.write().map_err(poisoned)?;
        Ok(descriptions.remove(collection_id).is_some())
    }
}
