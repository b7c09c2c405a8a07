//! Error types for Embargo Core.

use thiserror::Error;

/// Errors raised by the core primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encryption failed: {0}")]
    Seal(String),

    #[error("decryption failed: {0}")]
    Open(String),

    #[error("sealed payload too short: {0} bytes")]
    Truncated(usize),

    #[error("invalid key length: expected 32, got {0}")]
    InvalidKeyLength(usize),

    #[error("invalid hex key: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
