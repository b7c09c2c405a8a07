//! Process-wide holder for the single [`CollectionKeyring`].

use std::sync::{Arc, RwLock};

use embargo_core::{Collection, SecretKey, User};

use crate::cache::KeyringCache;
use crate::error::{KeyringError, Result};
use crate::keyring::CollectionKeyring;
use crate::permissions::PermissionService;

static GLOBAL: KeyringSlot = KeyringSlot::new();

/// The process-wide keyring slot.
pub fn global() -> &'static KeyringSlot {
    &GLOBAL
}

/// Holds at most one keyring.
///
/// Operations on an empty slot fail with [`KeyringError::NotInitialized`].
/// Initialising again replaces the previous instance; callers holding the
/// old `Arc` keep using it until they drop it.
pub struct KeyringSlot {
    inner: RwLock<Option<Arc<CollectionKeyring>>>,
}

impl KeyringSlot {
    pub const fn new() -> Self {
        Self {
            inner: RwLock::new(None),
        }
    }

    /// Build a keyring from its collaborators and install it.
    pub fn init(
        &self,
        cache: Arc<dyn KeyringCache>,
        permissions: Arc<dyn PermissionService>,
    ) -> Arc<CollectionKeyring> {
        self.install(Arc::new(CollectionKeyring::new(cache, permissions)))
    }

    /// Install an already-built keyring.
    pub fn install(&self, keyring: Arc<CollectionKeyring>) -> Arc<CollectionKeyring> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let replaced = inner.replace(keyring.clone()).is_some();
        tracing::info!(replaced, "collection keyring initialised");
        keyring
    }

    /// The installed keyring.
    pub fn instance(&self) -> Result<Arc<CollectionKeyring>> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(KeyringError::NotInitialized)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Empty the slot.
    pub fn reset(&self) {
        self.inner.write().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub async fn get(
        &self,
        user: Option<&User>,
        collection: Option<&Collection>,
    ) -> Result<Option<SecretKey>> {
        self.instance()?.get(user, collection).await
    }

    pub async fn remove(&self, user: Option<&User>, collection: Option<&Collection>) -> Result<()> {
        self.instance()?.remove(user, collection).await
    }

    pub async fn add(
        &self,
        user: Option<&User>,
        collection: Option<&Collection>,
        key: &SecretKey,
    ) -> Result<bool> {
        self.instance()?.add(user, collection, key).await
    }

    pub async fn populate_from_user(&self, user: Option<&User>) -> Result<()> {
        self.instance()?.populate_from_user(user).await
    }
}

impl Default for KeyringSlot {
    fn default() -> Self {
        Self::new()
    }
}
