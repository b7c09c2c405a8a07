//! Default [`ArchiveCompressor`]: zips each time series directory.
//!
//! For every `<prefix>/timeseries/...` file in the collection, the files are
//! grouped by `<prefix>` and written to `<prefix>/timeseries-to-publish.zip`
//! with entry names relative to the `timeseries` directory. Each archive is
//! read back and every entry checked by blake3 digest against its source.

use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use embargo_content::{ContentReader, ContentWriter};
use embargo_core::Collection;

use super::collaborators::ArchiveCompressor;
use super::notification::is_previous_version;

pub const TIMESERIES_DIRECTORY: &str = "timeseries";
pub const ARCHIVE_NAME: &str = "timeseries-to-publish.zip";

/// Files of one time series directory, keyed by entry name.
type ArchiveSources = BTreeMap<String, Bytes>;

#[derive(Debug, Clone)]
pub struct ZipTimeseriesCompressor {
    attempts: u32,
}

impl ZipTimeseriesCompressor {
    /// Try each archive up to `attempts` times before reporting it unverified.
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
        }
    }
}

impl Default for ZipTimeseriesCompressor {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Split `<prefix>/timeseries/<rest>` into `(prefix, rest)`.
///
/// Versioned copies under `previous/` are not published, so they are not
/// archived either.
fn split_timeseries_uri(uri: &str) -> Option<(&str, &str)> {
    if is_previous_version(uri) {
        return None;
    }
    let marker = format!("/{}/", TIMESERIES_DIRECTORY);
    let at = uri.find(&marker)?;
    let rest = &uri[at + marker.len()..];
    if rest.is_empty() {
        return None;
    }
    Some((&uri[..at], rest))
}

fn build_archive(sources: &ArchiveSources) -> anyhow::Result<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    for (name, data) in sources {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(data)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Whether `archive` holds exactly `sources`, byte for byte. An archive
/// that cannot be opened or read does not verify.
fn verify_archive(archive: &[u8], sources: &ArchiveSources) -> bool {
    let Ok(mut zip) = ZipArchive::new(Cursor::new(archive)) else {
        return false;
    };
    if zip.len() != sources.len() {
        return false;
    }

    sources.iter().all(|(name, data)| {
        let Ok(mut entry) = zip.by_name(name) else {
            return false;
        };
        let mut unpacked = Vec::new();
        entry.read_to_end(&mut unpacked).is_ok() && blake3::hash(&unpacked) == blake3::hash(data)
    })
}

impl ZipTimeseriesCompressor {
    /// Write one archive and verify it. Returns whether it verified within the attempt budget.
    async fn compress_one(
        &self,
        archive_uri: &str,
        sources: ArchiveSources,
        reader: &dyn ContentReader,
        writer: &dyn ContentWriter,
    ) -> anyhow::Result<bool> {
        for attempt in 1..=self.attempts {
            let to_pack = sources.clone();
            let archive = tokio::task::spawn_blocking(move || build_archive(&to_pack))
                .await
                .context("archive task panicked")??;
            writer.write(archive_uri, Bytes::from(archive)).await?;

            let written = reader
                .read(archive_uri)
                .await?
                .with_context(|| format!("archive {} missing after write", archive_uri))?;
            let to_check = sources.clone();
            let verified = tokio::task::spawn_blocking(move || verify_archive(&written, &to_check))
                .await
                .context("verification task panicked")?;

            if verified {
                tracing::debug!(archive = archive_uri, attempt, entries = sources.len(), "verified time series archive");
                return Ok(true);
            }
            tracing::warn!(archive = archive_uri, attempt, "time series archive failed verification");
        }
        Ok(false)
    }
}

#[async_trait]
impl ArchiveCompressor for ZipTimeseriesCompressor {
    async fn compress(
        &self,
        collection: &Collection,
        reader: &dyn ContentReader,
        writer: &dyn ContentWriter,
    ) -> anyhow::Result<bool> {
        let mut groups: BTreeMap<String, ArchiveSources> = BTreeMap::new();
        for uri in reader.list_uris().await? {
            let Some((prefix, rest)) = split_timeseries_uri(&uri) else {
                continue;
            };
            let data = reader
                .read(&uri)
                .await?
                .with_context(|| format!("listed file {} vanished", uri))?;
            groups
                .entry(prefix.to_string())
                .or_default()
                .insert(rest.to_string(), data);
        }

        let mut all_verified = true;
        for (prefix, sources) in groups {
            let archive_uri = format!("{}/{}", prefix, ARCHIVE_NAME);
            if !self.compress_one(&archive_uri, sources, reader, writer).await? {
                all_verified = false;
            }
        }

        if !all_verified {
            tracing::warn!(
                collection_id = collection.id().unwrap_or_default(),
                "time series archives failed verification"
            );
        }
        Ok(all_verified)
    }
}
