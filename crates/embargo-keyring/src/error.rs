//! Error types for the keyring module.

use embargo_store::StoreError;
use thiserror::Error;

/// A violated precondition on a keyring call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidInput {
    #[error("user required but was none")]
    UserMissing,

    #[error("collection required but was none")]
    CollectionMissing,

    #[error("collection description required but was none")]
    DescriptionMissing,

    #[error("collection id required but was empty")]
    CollectionIdMissing,

    #[error("user keyring required but was none")]
    UserKeyringMissing,

    #[error("user keyring is locked")]
    UserKeyringLocked,
}

/// Fault raised by a [`PermissionService`](crate::PermissionService) while
/// answering a question (as opposed to answering "no").
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("permission backend error: {0}")]
    Backend(String),
}

/// Fault raised by a [`KeyringCache`](crate::KeyringCache).
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing key store failed.
    #[error("key store error: {0}")]
    Store(#[from] StoreError),

    /// A key offered for a collection differs from the canonical key.
    #[error("key for collection {collection_id} does not match the canonical key")]
    KeyMismatch { collection_id: String },
}

/// Errors that can occur during keyring operations.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// No keyring has been installed in the slot.
    #[error("keyring accessed before it was initialised")]
    NotInitialized,

    /// A required argument was absent or empty.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInput),

    /// The permission service could not answer.
    #[error("permission check failed for {email} on collection {collection_id}")]
    PermissionCheckFailed {
        collection_id: String,
        email: String,
        #[source]
        source: PermissionError,
    },

    /// The central cache failed.
    #[error("keyring cache failure for collection {collection_id}")]
    CacheFailure {
        collection_id: String,
        #[source]
        source: CacheError,
    },
}

/// Result type for keyring operations.
pub type Result<T> = std::result::Result<T, KeyringError>;
