//! Versioned content items.
//!
//! A content item keeps superseded copies of itself under
//! `<item>/previous/v1`, `v2`, ... in creation order.

use std::path::{Path, PathBuf};

use crate::error::{ContentError, Result};

/// Name of the directory holding previous versions, relative to the item.
pub const VERSION_DIRECTORY: &str = "previous";

/// Attempts to find a free version directory before giving up.
const MAX_ALLOCATION_ATTEMPTS: usize = 1024;

/// A content item that can hold previous versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedContentItem {
    uri: String,
    path: PathBuf,
}

/// A created version of a content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItemVersion {
    /// `v1`, `v2`, ...
    pub identifier: String,
    /// Directory holding the version's files.
    pub path: PathBuf,
    /// URI of the versioned item.
    pub item_uri: String,
    /// `<item_uri>/previous/<identifier>`.
    pub uri: String,
}

impl VersionedContentItem {
    pub fn new(uri: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            uri: uri.into(),
            path: path.into(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version_directory_path(&self) -> PathBuf {
        self.path.join(VERSION_DIRECTORY)
    }

    /// Snapshot the files of `source_path` as a new version of this item.
    ///
    /// `source_path` is usually the published copy of the item, not the
    /// item's own directory. Only regular files are copied; subdirectories
    /// are skipped.
    ///
    /// The version number starts at one more than the number of entries in
    /// `previous/`. The directory is created exclusively; if another writer
    /// got there first the next number is tried, so concurrent callers
    /// always end up in distinct directories.
    pub async fn create_version(&self, source_path: &Path) -> Result<ContentItemVersion> {
        let versions = self.version_directory_path();
        tokio::fs::create_dir_all(&versions).await?;

        let first = count_entries(&versions).await? + 1;
        let mut allocated = None;
        for number in first..first + MAX_ALLOCATION_ATTEMPTS {
            let identifier = format!("v{}", number);
            let candidate = versions.join(&identifier);
            match tokio::fs::create_dir(&candidate).await {
                Ok(()) => {
                    allocated = Some((identifier, candidate));
                    break;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(item = %self.uri, %identifier, "version taken, trying next");
                }
                Err(e) => return Err(e.into()),
            }
        }
        let Some((identifier, version_path)) = allocated else {
            return Err(ContentError::VersionsExhausted(
                versions.display().to_string(),
            ));
        };

        let copied = match copy_files(source_path, &version_path).await {
            Ok(copied) => copied,
            Err(e) => {
                // Leave no half-filled version behind.
                if let Err(cleanup) = tokio::fs::remove_dir_all(&version_path).await {
                    tracing::warn!(path = %version_path.display(), error = %cleanup, "failed to remove incomplete version");
                }
                return Err(e);
            }
        };

        let version = ContentItemVersion {
            uri: format!(
                "{}/{}/{}",
                self.uri.trim_end_matches('/'),
                VERSION_DIRECTORY,
                identifier
            ),
            identifier,
            path: version_path,
            item_uri: self.uri.clone(),
        };

        tracing::info!(item = %self.uri, version = %version.identifier, files = copied, "created content version");
        Ok(version)
    }

    /// Whether at least one previous version exists.
    pub async fn version_exists(&self) -> Result<bool> {
        let versions = self.version_directory_path();
        match tokio::fs::read_dir(&versions).await {
            Ok(mut entries) => Ok(entries.next_entry().await?.is_some()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

async fn count_entries(dir: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut count = 0;
    while entries.next_entry().await?.is_some() {
        count += 1;
    }
    Ok(count)
}

/// Copy the non-directory entries of `from` into `to`. Returns the count.
async fn copy_files(from: &Path, to: &Path) -> Result<usize> {
    let mut entries = tokio::fs::read_dir(from).await?;
    let mut copied = 0;

    while let Some(entry) = entries.next_entry().await? {
        // Follows symlinks, so a link to a directory is skipped too.
        if tokio::fs::metadata(entry.path()).await?.is_dir() {
            continue;
        }
        tokio::fs::copy(entry.path(), to.join(entry.file_name())).await?;
        copied += 1;
    }

    Ok(copied)
}
