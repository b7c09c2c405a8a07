//! Error types for content access.

use embargo_core::CoreError;
use thiserror::Error;

/// Errors that can occur while reading, writing or versioning content.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The URI is empty or contains a `.`/`..` segment.
    #[error("invalid content URI: {0}")]
    InvalidUri(String),

    /// Sealing or opening content failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CoreError),

    /// No free version directory was found.
    #[error("could not allocate a version directory under {0}")]
    VersionsExhausted(String),
}

/// Result type for content operations.
pub type Result<T> = std::result::Result<T, ContentError>;
