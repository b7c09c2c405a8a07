//! Checkpoints of one approval run, kept for diagnostics.

use std::fmt;

use serde::Serialize;

use embargo_core::now_millis;

/// A point an approval run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Checkpoint {
    Started,
    ResolvedDetails,
    PopulatedReleasePage,
    GeneratedTimeseries,
    GeneratedPdfs,
    CreatedPublishNotification,
    CompressedZipFiles,
    ApprovalStateSet,
    SentPublishNotification,
    Completed,
}

impl Checkpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Checkpoint::Started => "STARTED",
            Checkpoint::ResolvedDetails => "RESOLVED_DETAILS",
            Checkpoint::PopulatedReleasePage => "POPULATED_RELEASE_PAGE",
            Checkpoint::GeneratedTimeseries => "GENERATED_TIMESERIES",
            Checkpoint::GeneratedPdfs => "GENERATED_PDFS",
            Checkpoint::CreatedPublishNotification => "CREATED_PUBLISH_NOTIFICATION",
            Checkpoint::CompressedZipFiles => "COMPRESSED_ZIP_FILES",
            Checkpoint::ApprovalStateSet => "APPROVAL_STATE_SET",
            Checkpoint::SentPublishNotification => "SENT_PUBLISH_NOTIFICATION",
            Checkpoint::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedCheckpoint {
    pub checkpoint: Checkpoint,
    pub at: i64,
}

/// Append-only record of the checkpoints one run reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalEventLog {
    pub collection_id: String,
    pub approver: String,
    pub checkpoints: Vec<LoggedCheckpoint>,
}

impl ApprovalEventLog {
    /// A log that has reached [`Checkpoint::Started`].
    pub fn start(collection_id: impl Into<String>, approver: impl Into<String>) -> Self {
        let mut log = Self {
            collection_id: collection_id.into(),
            approver: approver.into(),
            checkpoints: Vec::new(),
        };
        log.reached(Checkpoint::Started);
        log
    }

    pub fn reached(&mut self, checkpoint: Checkpoint) {
        self.checkpoints.push(LoggedCheckpoint {
            checkpoint,
            at: now_millis(),
        });
    }

    pub fn last(&self) -> Option<Checkpoint> {
        self.checkpoints.last().map(|c| c.checkpoint)
    }

    pub fn contains(&self, checkpoint: Checkpoint) -> bool {
        self.checkpoints.iter().any(|c| c.checkpoint == checkpoint)
    }
}

/// One line per checkpoint: `NAME at <ms>`.
impl fmt::Display for ApprovalEventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, logged) in self.checkpoints.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{} at {}", logged.checkpoint, logged.at)?;
        }
        Ok(())
    }
}
