//! Content traits.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{ContentError, Result};

/// Reads content items by URI.
#[async_trait]
pub trait ContentReader: Send + Sync {
    /// Read the item at `uri`. Returns `None` if it does not exist.
    async fn read(&self, uri: &str) -> Result<Option<Bytes>>;

    /// Every file URI in the tree, sorted.
    async fn list_uris(&self) -> Result<Vec<String>>;
}

/// Writes content items by URI.
#[async_trait]
pub trait ContentWriter: Send + Sync {
    /// Write (or replace) the item at `uri`, creating parents as needed.
    async fn write(&self, uri: &str, data: Bytes) -> Result<()>;
}

/// Canonical form of a content URI: a leading slash, no trailing slash,
/// no empty, `.` or `..` segments.
pub fn normalize_uri(uri: &str) -> Result<String> {
    let mut normalized = String::with_capacity(uri.len() + 1);

    for segment in uri.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." || segment.contains('\\') {
            return Err(ContentError::InvalidUri(uri.to_string()));
        }
        normalized.push('/');
        normalized.push_str(segment);
    }

    if normalized.is_empty() {
        return Err(ContentError::InvalidUri(uri.to_string()));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_uri() {
        assert_eq!(normalize_uri("/a/b/data.json").unwrap(), "/a/b/data.json");
        assert_eq!(normalize_uri("a//b/").unwrap(), "/a/b");
        assert!(normalize_uri("/").is_err());
        assert!(normalize_uri("").is_err());
        assert!(normalize_uri("/a/../b").is_err());
        assert!(normalize_uri("/a/./b").is_err());
    }
}
