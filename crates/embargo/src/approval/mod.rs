//! The approval pipeline.
//!
//! [`ApproveTask`] validates, transforms and seals one collection. The
//! pieces of work it delegates (PDF rendering, time series generation,
//! notifications) sit behind the traits in [`collaborators`]; defaults are
//! provided for the ones that only need the content tree.

pub mod collaborators;
pub mod compress;
pub mod event_log;
pub mod notification;
pub mod release;
pub mod resolver;
pub mod task;

pub use collaborators::{
    ArchiveCompressor, ContentDetailResolver, DataIndex, MemoryDataIndex, PdfRenderer,
    PublishNotification, PublishNotifier, ReleasePopulator, RenderedDocument,
    TimeseriesGenerator, TimeseriesUpdateCommand, UpdateCommandImporter,
};
pub use compress::ZipTimeseriesCompressor;
pub use event_log::{ApprovalEventLog, Checkpoint};
pub use notification::build_publish_notification;
pub use release::LinkingReleasePopulator;
pub use resolver::JsonContentDetailResolver;
pub use task::{
    ApprovalContent, ApprovalServices, ApproveTask, APPROVAL_FAILED_ALERT,
    VERIFICATION_ADVICE, VERIFICATION_FAILED_ALERT,
};
