//! Worker pool for approval runs.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::approval::ApproveTask;
use crate::error::SchedulerError;

/// Runs approvals in the background, at most `workers` at a time.
///
/// Submitting returns immediately; the outcome is the handle's `bool`, and
/// is also observable by re-reading the collection. Only one run per
/// collection may be queued or running.
#[derive(Clone)]
pub struct ApprovalScheduler {
    permits: Arc<Semaphore>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Removes a collection from the in-flight set when the run ends, however it ends.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    collection_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.collection_id);
    }
}

impl ApprovalScheduler {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Queue an approval run. Must be called from within a tokio runtime.
    pub fn submit(&self, task: ApproveTask) -> Result<JoinHandle<bool>, SchedulerError> {
        let collection_id = task
            .collection_id()
            .ok_or(SchedulerError::MissingCollectionId)?
            .to_string();

        if let Some(status) = task.approval_status() {
            if !status.can_begin_approval() {
                return Err(SchedulerError::NotApprovable {
                    collection_id,
                    status,
                });
            }
        }

        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
            if !in_flight.insert(collection_id.clone()) {
                return Err(SchedulerError::AlreadyRunning(collection_id));
            }
        }

        let guard = InFlightGuard {
            in_flight: self.in_flight.clone(),
            collection_id: collection_id.clone(),
        };
        let permits = self.permits.clone();

        tracing::info!(collection_id = %collection_id, "approval scheduled");
        Ok(tokio::spawn(async move {
            let _guard = guard;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(collection_id = %collection_id, "approval pool closed");
                    return false;
                }
            };
            task.run().await
        }))
    }

    pub fn is_running(&self, collection_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(collection_id)
    }

    /// Runs queued or executing.
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Workers currently idle.
    pub fn available_workers(&self) -> usize {
        self.permits.available_permits()
    }
}
