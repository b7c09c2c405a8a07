//! # Embargo Store
//!
//! Persistence behind two traits:
//!
//! - [`SecretKeyStore`] - The canonical per-collection key store. Opaque
//!   byte-level storage, no access logic. Implemented by [`SqliteKeyStore`]
//!   and [`MemoryKeyStore`].
//! - [`CollectionStore`] - Persists [`CollectionDescription`] records.
//!   Implemented by [`JsonCollectionStore`] (one JSON file per collection)
//!   and [`MemoryCollectionStore`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use embargo_core::SecretKey;
//! use embargo_store::{SecretKeyStore, SqliteKeyStore};
//!
//! async fn example() {
//!     let store = SqliteKeyStore::open("keys.db").unwrap();
//!
//!     store.store("c-1", &SecretKey::generate()).await.unwrap();
//!     let key = store.load("c-1").await.unwrap();
//!     assert!(key.is_some());
//! }
//! ```
//!
//! [`CollectionDescription`]: embargo_core::CollectionDescription

pub mod error;
pub mod json;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use json::JsonCollectionStore;
pub use memory::{MemoryCollectionStore, MemoryKeyStore};
pub use sqlite::SqliteKeyStore;
pub use traits::{CollectionStore, SecretKeyStore};
