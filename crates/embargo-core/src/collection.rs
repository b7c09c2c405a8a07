//! Collections and their persisted description.

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Workflow state of a collection's approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Draft; no approval attempted yet.
    #[default]
    NotStarted,
    /// An approval run is in progress.
    InProgress,
    /// Approved and ready to publish.
    Complete,
    /// The most recent approval attempt failed.
    Error,
}

impl ApprovalStatus {
    /// Whether a new approval attempt may start from this state.
    pub fn can_begin_approval(self) -> bool {
        matches!(self, ApprovalStatus::NotStarted | ApprovalStatus::Error)
    }
}

/// How the collection gets published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionType {
    #[default]
    Manual,
    Scheduled,
}

/// Structured metadata of one content item.
///
/// Also used as a tree node: a pending delete carries the root of the
/// subtree to remove, with its descendants in `children`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetail {
    pub uri: String,
    #[serde(rename = "type", default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentDetail>,
}

impl ContentDetail {
    pub fn new(uri: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            content_type: content_type.into(),
            ..Default::default()
        }
    }

    /// Add a child node.
    pub fn with_child(mut self, child: ContentDetail) -> Self {
        self.children.push(child);
        self
    }

    /// Visit this node and every descendant, depth first, parents before children.
    pub fn walk<F: FnMut(&ContentDetail)>(&self, visit: &mut F) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// A subtree of published content scheduled for deletion on publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDelete {
    /// Who requested the deletion.
    pub user: String,
    pub root: ContentDetail,
}

/// The persisted record of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionDescription {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub collection_type: CollectionType,
    #[serde(default)]
    pub approval_status: ApprovalStatus,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub pending_deletes: Vec<PendingDelete>,
    /// Collection-relative paths of time series update CSVs.
    #[serde(default)]
    pub timeseries_import_files: Vec<String>,
    /// URI of the release page this collection publishes, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_uri: Option<String>,
    /// Scheduled publish time (Unix ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<i64>,
}

impl CollectionDescription {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Append an event to the log.
    pub fn add_event(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// A staged batch of content awaiting approval.
///
/// The description is optional because a collection directory may exist
/// before (or without) a readable description record; callers that need
/// one must check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Collection {
    pub description: Option<CollectionDescription>,
    /// URIs of reviewed content items.
    pub reviewed: Vec<String>,
    /// URIs of items still being edited.
    pub in_progress: Vec<String>,
    /// URIs of items finished but not yet reviewed.
    pub complete: Vec<String>,
}

impl Collection {
    pub fn new(description: CollectionDescription) -> Self {
        Self {
            description: Some(description),
            reviewed: Vec::new(),
            in_progress: Vec::new(),
            complete: Vec::new(),
        }
    }

    /// Set the reviewed URIs.
    pub fn with_reviewed<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reviewed = uris.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_in_progress<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.in_progress = uris.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_complete<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.complete = uris.into_iter().map(Into::into).collect();
        self
    }

    /// Whether every item has been through review.
    pub fn is_fully_reviewed(&self) -> bool {
        self.in_progress.is_empty() && self.complete.is_empty()
    }

    /// The collection id, if a description with a non-empty id is present.
    pub fn id(&self) -> Option<&str> {
        self.description
            .as_ref()
            .map(|d| d.id.as_str())
            .filter(|id| !id.is_empty())
    }
}
