//! # Embargo Keyring
//!
//! Custody of the per-collection symmetric keys that protect embargoed
//! content at rest.
//!
//! ## Overview
//!
//! [`CollectionKeyring`] is the only component allowed to hand a decryption
//! key to a caller. Every read is gated by a [`PermissionService`] check; a
//! denied caller gets `None`, exactly as if the key did not exist.
//!
//! Keys live in a process-wide [`KeyringCache`]. The provided
//! [`StoreBackedCache`] writes through to a [`SecretKeyStore`], so a key
//! never lives only in one user's private keyring and survives restarts.
//!
//! ## Lifecycle
//!
//! A `CollectionKeyring` can only be constructed with both collaborators.
//! For code that reaches the keyring through process-wide state,
//! [`KeyringSlot`] holds the single instance: every operation on an empty
//! slot fails with [`KeyringError::NotInitialized`].
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use embargo_keyring::{KeyringSlot, StoreBackedCache};
//! use embargo_store::SqliteKeyStore;
//! # use embargo_keyring::PermissionService;
//!
//! # fn example(permissions: Arc<dyn PermissionService>) {
//! let store = Arc::new(SqliteKeyStore::open("keys.db").unwrap());
//! let cache = Arc::new(StoreBackedCache::new(store));
//!
//! let slot = KeyringSlot::new();
//! slot.init(cache, permissions);
//! # }
//! ```
//!
//! [`SecretKeyStore`]: embargo_store::SecretKeyStore

pub mod cache;
pub mod error;
pub mod keyring;
pub mod permissions;
pub mod slot;

pub use cache::{KeyringCache, StoreBackedCache};
pub use error::{CacheError, InvalidInput, KeyringError, PermissionError, Result};
pub use keyring::CollectionKeyring;
pub use permissions::PermissionService;
pub use slot::{global, KeyringSlot};
