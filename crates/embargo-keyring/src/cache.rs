//! The process-wide collection key cache.
//!
//! The cache is the one piece of shared, concurrently mutated state in the
//! system: HTTP request handlers and approval runs query it at the same
//! time. [`StoreBackedCache`] serialises every get/add/remove on a single
//! `RwLock`, so each operation is atomic per collection id.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use embargo_core::SecretKey;
use embargo_store::SecretKeyStore;

use crate::error::CacheError;

type CacheResult<T> = std::result::Result<T, CacheError>;

/// Central mapping of collection id to secret key.
#[async_trait]
pub trait KeyringCache: Send + Sync {
    /// Look up the key for a collection.
    async fn get(&self, collection_id: &str) -> CacheResult<Option<SecretKey>>;

    /// Add the key for a collection.
    ///
    /// Adding the same key again is a no-op. Adding a *different* key for a
    /// collection that already has one fails with [`CacheError::KeyMismatch`].
    async fn add(&self, collection_id: &str, key: &SecretKey) -> CacheResult<()>;

    /// Remove the key for a collection. Removing an absent key is not an error.
    async fn remove(&self, collection_id: &str) -> CacheResult<()>;
}

/// Write-through cache in front of a [`SecretKeyStore`].
///
/// - `add` persists to the store before the entry becomes visible.
/// - `get` falls back to the store on a miss and memoises what it finds,
///   so a freshly started process serves keys without any user logging in.
/// - `remove` deletes from both.
pub struct StoreBackedCache {
    store: Arc<dyn SecretKeyStore>,
    entries: RwLock<HashMap<String, SecretKey>>,
}

impl StoreBackedCache {
    pub fn new(store: Arc<dyn SecretKeyStore>) -> Self {
        Self {
            store,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Load every stored key into memory. Returns how many were loaded.
    pub async fn preload(&self) -> CacheResult<usize> {
        let ids = self.store.list().await?;
        let mut entries = self.entries.write().await;

        let mut loaded = 0;
        for id in ids {
            if let Some(key) = self.store.load(&id).await? {
                entries.insert(id, key);
                loaded += 1;
            }
        }

        tracing::info!(keys = loaded, "preloaded collection keyring cache");
        Ok(loaded)
    }

    /// Number of keys currently held in memory.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Whether a key is held in memory (without consulting the store).
    pub async fn contains(&self, collection_id: &str) -> bool {
        self.entries.read().await.contains_key(collection_id)
    }
}

#[async_trait]
impl KeyringCache for StoreBackedCache {
    async fn get(&self, collection_id: &str) -> CacheResult<Option<SecretKey>> {
        if let Some(key) = self.entries.read().await.get(collection_id) {
            return Ok(Some(key.clone()));
        }

        let mut entries = self.entries.write().await;
        // Another caller may have filled the entry while we waited.
        if let Some(key) = entries.get(collection_id) {
            return Ok(Some(key.clone()));
        }

        let loaded = self.store.load(collection_id).await?;
        if let Some(key) = &loaded {
            entries.insert(collection_id.to_string(), key.clone());
        }
        Ok(loaded)
    }

    async fn add(&self, collection_id: &str, key: &SecretKey) -> CacheResult<()> {
        let mut entries = self.entries.write().await;

        let canonical = match entries.get(collection_id) {
            Some(existing) => Some(existing.clone()),
            None => self.store.load(collection_id).await?,
        };

        match canonical {
            Some(existing) if &existing == key => {
                entries.insert(collection_id.to_string(), existing);
                Ok(())
            }
            Some(_) => {
                tracing::error!(
                    collection_id,
                    "refusing key that diverges from the canonical collection key"
                );
                Err(CacheError::KeyMismatch {
                    collection_id: collection_id.to_string(),
                })
            }
            None => {
                self.store.store(collection_id, key).await?;
                entries.insert(collection_id.to_string(), key.clone());
                tracing::debug!(collection_id, fingerprint = %key.fingerprint(), "added collection key");
                Ok(())
            }
        }
    }

    async fn remove(&self, collection_id: &str) -> CacheResult<()> {
        let mut entries = self.entries.write().await;
        self.store.delete(collection_id).await?;
        entries.remove(collection_id);
        Ok(())
    }
}
