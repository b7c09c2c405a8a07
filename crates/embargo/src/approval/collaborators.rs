//! The stage collaborators an approval run drives.
//!
//! Each trait is one external concern. They return `anyhow::Result`; the
//! pipeline wraps failures in the stage's [`ApprovalError`] variant.
//!
//! [`ApprovalError`]: crate::ApprovalError

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use embargo_content::{ContentReader, ContentWriter};
use embargo_core::{Collection, ContentDetail, Session};

/// Resolves reviewed URIs to content details.
#[async_trait]
pub trait ContentDetailResolver: Send + Sync {
    async fn resolve(
        &self,
        reviewed: &[String],
        reader: &dyn ContentReader,
    ) -> anyhow::Result<Vec<ContentDetail>>;
}

/// Links a collection's content into its release page.
#[async_trait]
pub trait ReleasePopulator: Send + Sync {
    async fn populate(
        &self,
        collection: &Collection,
        reader: &dyn ContentReader,
        writer: &dyn ContentWriter,
        details: &[ContentDetail],
    ) -> anyhow::Result<()>;
}

/// One requested change to a time series, keyed by CDID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesUpdateCommand {
    pub cdid: String,
    /// Resolved through the [`DataIndex`] before generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl TimeseriesUpdateCommand {
    pub fn new(cdid: impl Into<String>) -> Self {
        Self {
            cdid: cdid.into(),
            uri: None,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Parses an update command file.
#[async_trait]
pub trait UpdateCommandImporter: Send + Sync {
    async fn import(&self, data: &[u8]) -> anyhow::Result<Vec<TimeseriesUpdateCommand>>;
}

/// Maps CDIDs to time series URIs.
pub trait DataIndex: Send + Sync {
    /// The URI for a lower-cased CDID.
    fn uri_for_cdid(&self, cdid: &str) -> Option<String>;
}

/// A [`DataIndex`] held in a map.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataIndex {
    uris: HashMap<String, String>,
}

impl MemoryDataIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cdid: &str, uri: impl Into<String>) {
        self.uris.insert(cdid.to_lowercase(), uri.into());
    }
}

impl<S: AsRef<str>, U: Into<String>> FromIterator<(S, U)> for MemoryDataIndex {
    fn from_iter<I: IntoIterator<Item = (S, U)>>(iter: I) -> Self {
        let mut index = Self::new();
        for (cdid, uri) in iter {
            index.insert(cdid.as_ref(), uri);
        }
        index
    }
}

impl DataIndex for MemoryDataIndex {
    fn uri_for_cdid(&self, cdid: &str) -> Option<String> {
        self.uris.get(cdid).cloned()
    }
}

/// Regenerates derived time series content.
#[async_trait]
pub trait TimeseriesGenerator: Send + Sync {
    /// `compound` reads the collection's reviewed content over the published tree.
    async fn generate(
        &self,
        published: &dyn ContentReader,
        compound: &dyn ContentReader,
        writer: &dyn ContentWriter,
        index: &dyn DataIndex,
        commands: &[TimeseriesUpdateCommand],
    ) -> anyhow::Result<()>;
}

/// A rendered document to be written into the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub uri: String,
    pub data: Bytes,
}

/// Renders PDF versions of content.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(
        &self,
        session: &Session,
        collection: &Collection,
        details: &[ContentDetail],
    ) -> anyhow::Result<Vec<RenderedDocument>>;
}

/// Builds and verifies the time series archives of a collection.
#[async_trait]
pub trait ArchiveCompressor: Send + Sync {
    /// Returns `false` if an archive failed verification.
    async fn compress(
        &self,
        collection: &Collection,
        reader: &dyn ContentReader,
        writer: &dyn ContentWriter,
    ) -> anyhow::Result<bool>;
}

/// What a successful approval hands to the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishNotification {
    pub collection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<i64>,
    /// URIs to publish, sorted.
    pub uris: Vec<String>,
    /// Content to delete, unique by URI, in first-seen order.
    pub deletes: Vec<ContentDetail>,
}

/// Tells the publishing scheduler a collection is approved.
#[async_trait]
pub trait PublishNotifier: Send + Sync {
    async fn notify(&self, notification: &PublishNotification) -> anyhow::Result<()>;
}
