//! Filesystem-backed content tree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::traits::{normalize_uri, ContentReader, ContentWriter};

/// A content tree rooted at a directory. URI `/a/b.json` maps to `<root>/a/b.json`.
#[derive(Debug, Clone)]
pub struct FsContent {
    root: PathBuf,
}

impl FsContent {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for a URI.
    pub fn path_for(&self, uri: &str) -> Result<PathBuf> {
        let uri = normalize_uri(uri)?;
        Ok(self.root.join(&uri[1..]))
    }
}

#[async_trait]
impl ContentReader for FsContent {
    async fn read(&self, uri: &str) -> Result<Option<Bytes>> {
        let path = self.path_for(uri)?;

        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            // Reading a directory is "no such item", not a fault.
            Err(_) if path.is_dir() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_uris(&self) -> Result<Vec<String>> {
        let mut uris = Vec::new();
        if !tokio::fs::try_exists(&self.root).await? {
            return Ok(uris);
        }

        let mut pending = vec![(self.root.clone(), String::new())];
        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                let uri = format!("{}/{}", prefix, name);
                if entry.file_type().await?.is_dir() {
                    pending.push((entry.path(), uri));
                } else {
                    uris.push(uri);
                }
            }
        }

        uris.sort();
        Ok(uris)
    }
}

#[async_trait]
impl ContentWriter for FsContent {
    async fn write(&self, uri: &str, data: Bytes) -> Result<()> {
        let path = self.path_for(uri)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        tracing::trace!(uri, bytes = data.len(), "wrote content");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_read_list() {
        let dir = tempfile::tempdir().unwrap();
        let content = FsContent::new(dir.path());

        content
            .write("/economy/inflation/data.json", Bytes::from_static(b"{}"))
            .await
            .unwrap();
        content
            .write("/economy/data.json", Bytes::from_static(b"[]"))
            .await
            .unwrap();

        assert_eq!(
            content.read("/economy/inflation/data.json").await.unwrap(),
            Some(Bytes::from_static(b"{}"))
        );
        assert!(content.read("/missing/data.json").await.unwrap().is_none());
        assert!(content.read("/economy").await.unwrap().is_none());

        assert_eq!(
            content.list_uris().await.unwrap(),
            vec!["/economy/data.json", "/economy/inflation/data.json"]
        );
    }

    #[tokio::test]
    async fn test_missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let content = FsContent::new(dir.path().join("absent"));
        assert!(content.list_uris().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_escaping_uri() {
        let dir = tempfile::tempdir().unwrap();
        let content = FsContent::new(dir.path());
        assert!(content.read("/../secret").await.is_err());
    }
}
