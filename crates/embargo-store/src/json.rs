//! File-backed [`CollectionStore`]: one `<id>.json` per collection.
//!
//! Writes go to a temporary sibling then rename over the target, so a
//! reader never observes a half-written description.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use embargo_core::CollectionDescription;

use crate::error::Result;
use crate::traits::{check_id, CollectionStore};

const JSON_EXTENSION: &str = "json";

/// Stores descriptions as pretty-printed JSON files under a root directory.
#[derive(Debug, Clone)]
pub struct JsonCollectionStore {
    root: PathBuf,
}

impl JsonCollectionStore {
    /// Use `root` as the collections directory. It is created on first save.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the description file for a collection.
    pub fn description_path(&self, collection_id: &str) -> Result<PathBuf> {
        check_id(collection_id)?;
        Ok(self.root.join(format!("{}.{}", collection_id, JSON_EXTENSION)))
    }
}

#[async_trait]
impl CollectionStore for JsonCollectionStore {
    async fn save(&self, description: &CollectionDescription) -> Result<()> {
        let path = self.description_path(&description.id)?;
        let json = serde_json::to_vec_pretty(description)?;

        tokio::fs::create_dir_all(&self.root).await?;
        let tmp = self
            .root
            .join(format!("{}.{}.tmp", description.id, JSON_EXTENSION));
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!(
            collection_id = %description.id,
            status = ?description.approval_status,
            "saved collection description"
        );
        Ok(())
    }

    async fn load(&self, collection_id: &str) -> Result<Option<CollectionDescription>> {
        let path = self.description_path(collection_id)?;

        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, collection_id: &str) -> Result<bool> {
        let path = self.description_path(collection_id)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embargo_core::{ApprovalStatus, Event, EventType};

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCollectionStore::new(dir.path().join("collections"));

        let mut description = CollectionDescription::new("c-1", "Retail sales");
        description.approval_status = ApprovalStatus::Complete;
        description.add_event(Event::new(EventType::Approved, "ed@example.com"));

        store.save(&description).await.unwrap();

        let loaded = store.load("c-1").await.unwrap().unwrap();
        assert_eq!(loaded, description);
        assert!(dir.path().join("collections/c-1.json").exists());
        assert!(!dir.path().join("collections/c-1.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCollectionStore::new(dir.path());

        assert!(store.load("nope").await.unwrap().is_none());
        assert!(!store.delete("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCollectionStore::new(dir.path());

        assert!(store.load("../outside").await.is_err());
    }
}
