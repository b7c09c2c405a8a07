//! In-memory content tree.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::traits::{normalize_uri, ContentReader, ContentWriter};

/// Content held in a sorted map. Primarily for tests.
#[derive(Debug, Default)]
pub struct MemoryContent {
    items: RwLock<BTreeMap<String, Bytes>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `(uri, bytes)` pairs.
    pub fn with_items<I, U, B>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = (U, B)>,
        U: AsRef<str>,
        B: Into<Bytes>,
    {
        let mut map = BTreeMap::new();
        for (uri, data) in items {
            map.insert(normalize_uri(uri.as_ref())?, data.into());
        }
        Ok(Self {
            items: RwLock::new(map),
        })
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentReader for MemoryContent {
    async fn read(&self, uri: &str) -> Result<Option<Bytes>> {
        let uri = normalize_uri(uri)?;
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.get(&uri).cloned())
    }

    async fn list_uris(&self) -> Result<Vec<String>> {
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        Ok(items.keys().cloned().collect())
    }
}

#[async_trait]
impl ContentWriter for MemoryContent {
    async fn write(&self, uri: &str, data: Bytes) -> Result<()> {
        let uri = normalize_uri(uri)?;
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(uri, data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_round_trip_normalizes_uris() {
        let content = MemoryContent::new();
        content.write("a/b/", Bytes::from_static(b"x")).await.unwrap();

        assert_eq!(content.read("/a/b").await.unwrap(), Some(Bytes::from_static(b"x")));
        assert_eq!(content.list_uris().await.unwrap(), vec!["/a/b"]);
    }
}
