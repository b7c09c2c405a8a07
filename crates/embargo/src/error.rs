//! Error types for the approval pipeline, scheduler and service facade.

use embargo_content::ContentError;
use embargo_core::ApprovalStatus;
use embargo_keyring::KeyringError;
use embargo_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// A violated precondition of an approval run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    #[error("collection required but was none")]
    CollectionMissing,

    #[error("collection description required but was none")]
    DescriptionMissing,

    #[error("session required but was none")]
    SessionMissing,

    #[error("session email required but was empty")]
    SessionEmailMissing,
}

/// Errors raised inside an approval run.
///
/// [`InvalidArgument`](ApprovalError::InvalidArgument) is a contract
/// violation and never reaches the recovery path. Every other variant names
/// the stage that failed and is recorded on the collection.
#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("approval task unsuccessful: {0}")]
    InvalidArgument(#[from] InvalidArgument),

    #[error("failed to mark collection as in progress")]
    BeginApproval(#[source] StoreError),

    #[error("failed to resolve content details")]
    ResolveDetails(#[source] anyhow::Error),

    #[error("time series import file {0} not found in collection")]
    ImportFileMissing(String),

    #[error("failed to read time series import file {file}")]
    ReadImportFile {
        file: String,
        #[source]
        source: ContentError,
    },

    #[error("failed to import time series update commands from {file}")]
    ImportUpdates {
        file: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to generate time series")]
    GenerateTimeseries(#[source] anyhow::Error),

    #[error("failed to generate PDFs")]
    RenderPdfs(#[source] anyhow::Error),

    #[error("failed to write rendered document {uri}")]
    WriteDocument {
        uri: String,
        #[source]
        source: ContentError,
    },

    #[error("failed to list reviewed content")]
    ListContent(#[source] ContentError),

    #[error("failed to compress time series archives")]
    CompressArchives(#[source] anyhow::Error),

    #[error("failed to save approved collection")]
    SaveCollection(#[source] StoreError),

    #[error("failed to send publish notification")]
    Notify(#[source] anyhow::Error),
}

/// Errors raised when submitting work to the [`ApprovalScheduler`](crate::ApprovalScheduler).
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("an approval of collection {0} is already running")]
    AlreadyRunning(String),

    #[error("collection {collection_id} cannot be approved from status {status:?}")]
    NotApprovable {
        collection_id: String,
        status: ApprovalStatus,
    },

    #[error("collection has no id")]
    MissingCollectionId,
}

/// Errors surfaced by the [`Embargo`](crate::Embargo) facade.
#[derive(Debug, Error)]
pub enum EmbargoError {
    #[error("keyring error: {0}")]
    Keyring(#[from] KeyringError),

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("content error: {0}")]
    Content(#[from] ContentError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("collection {0} not found")]
    CollectionNotFound(String),

    /// The user may not edit the collection.
    #[error("not permitted to approve or unlock collection {0}")]
    NotPermitted(String),

    /// Some items are still being edited or awaiting review.
    #[error("collection {collection_id} has {in_progress} item(s) in progress and {complete} awaiting review")]
    IncompleteItems {
        collection_id: String,
        in_progress: usize,
        complete: usize,
    },

    /// No key for the collection was available to the user.
    #[error("no key available for collection {0}")]
    KeyUnavailable(String),
}

/// Result type for [`Embargo`](crate::Embargo) operations.
pub type Result<T> = std::result::Result<T, EmbargoError>;
