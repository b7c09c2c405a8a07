//! Store errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite failure in the key database.
    #[error("key database: {0}")]
    Database(#[from] rusqlite::Error),

    /// A collection record that would not encode or decode as JSON.
    #[error("collection record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored bytes that do not form a valid value, such as a short key.
    #[error("corrupt stored value: {0}")]
    InvalidData(String),

    /// Collection id that is empty or would escape the store directory.
    #[error("invalid collection id: {0:?}")]
    InvalidId(String),

    /// Schema could not be brought up to date.
    #[error("schema migration failed: {0}")]
    Migration(String),

    /// The blocking task running a query panicked or was cancelled.
    #[error("store task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
