//! The schedulable job and its run loop.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use filehub_core::traits::notifier::NotificationView;
use filehub_core::types::{JobId, OperationKind};

use super::{TransferJob, ViewLabels};

/// Receives lifecycle callbacks from running jobs.
///
/// Callbacks arrive on worker tasks, concurrently for different jobs.
pub trait JobListener: Send + Sync + 'static {
    /// The job was picked up by a worker.
    fn on_start(&self, job: &Job);

    /// The job finished processing one more item.
    fn on_progress(&self, job: &Job);

    /// The job ended with at least one failed item. `on_finished` is not
    /// called by the job afterwards.
    fn on_failed(&self, job: &Job);

    /// The job ended without failed items.
    fn on_finished(&self, job: &Job);
}

/// A source item that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    /// Storage path of the source.
    pub item: String,
    /// Why it failed.
    pub reason: String,
}

/// Transfer progress of a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Items attempted so far, failed ones included.
    pub processed: usize,
    /// Total number of source items.
    pub total: usize,
    /// Bytes transferred so far.
    pub bytes_copied: u64,
}

/// One file operation: identity, sources, and mutable run state.
pub struct Job {
    id: JobId,
    kind: OperationKind,
    sources: Vec<String>,
    labels: ViewLabels,
    cancelled: AtomicBool,
    started: AtomicBool,
    cleaned_up: AtomicBool,
    failed: Mutex<Vec<FailedItem>>,
    progress: Mutex<JobProgress>,
    /// Taken out while the job runs and when it is cleaned up.
    transfer: Mutex<Option<Box<dyn TransferJob>>>,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("sources", &self.sources.len())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl Job {
    /// Create a job that runs `transfer` over `sources`.
    pub fn new(
        id: JobId,
        kind: OperationKind,
        sources: Vec<String>,
        transfer: Box<dyn TransferJob>,
    ) -> Self {
        let progress = JobProgress {
            total: sources.len(),
            ..JobProgress::default()
        };
        Self {
            id,
            kind,
            labels: transfer.labels(),
            sources,
            cancelled: AtomicBool::new(false),
            started: AtomicBool::new(false),
            cleaned_up: AtomicBool::new(false),
            failed: Mutex::new(Vec::new()),
            progress: Mutex::new(progress),
            transfer: Mutex::new(Some(transfer)),
        }
    }

    /// The job's identity.
    pub fn id(&self) -> &JobId {
        &self.id
    }

    /// The operation performed.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Storage paths of the items to process.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    /// Ask the job to stop. Never blocks; a running job notices between
    /// items.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Whether a worker ever picked the job up.
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether any item failed.
    pub fn failed(&self) -> bool {
        !self.lock_failed().is_empty()
    }

    /// Items that failed so far.
    pub fn failed_items(&self) -> Vec<FailedItem> {
        self.lock_failed().clone()
    }

    /// Current progress.
    pub fn progress(&self) -> JobProgress {
        *self.progress.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a failed item. An item is only recorded once.
    pub fn record_failure(&self, item: &str, reason: impl Into<String>) {
        let mut failed = self.lock_failed();
        if failed.iter().all(|f| f.item != item) {
            failed.push(FailedItem {
                item: item.to_string(),
                reason: reason.into(),
            });
        }
    }

    /// Mark every source as failed, e.g. when set-up could not complete.
    pub fn fail_all(&self, reason: &str) {
        for src in &self.sources {
            self.record_failure(src, reason);
        }
    }

    /// View shown when the job starts.
    pub fn setup_view(&self) -> NotificationView {
        NotificationView::Setup {
            title: self.labels.setup.to_string(),
        }
    }

    /// View shown while items are transferred.
    pub fn progress_view(&self) -> NotificationView {
        let progress = self.progress();
        NotificationView::Progress {
            title: self.labels.progress.to_string(),
            processed: progress.processed,
            total: progress.total,
            bytes_copied: progress.bytes_copied,
        }
    }

    /// View shown when items failed.
    pub fn failure_view(&self) -> NotificationView {
        NotificationView::Failure {
            title: self.labels.failure.to_string(),
            failed_items: self.lock_failed().iter().map(|f| f.item.clone()).collect(),
        }
    }

    /// Release the job's transfer resources. Returns `false` if the job had
    /// already been cleaned up.
    pub fn cleanup(&self) -> bool {
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return false;
        }
        let transfer = self
            .transfer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(mut transfer) = transfer {
            transfer.cleanup();
        }
        debug!(job_id = %self.id, "Job cleaned up");
        true
    }

    /// Run the job to completion, reporting to `listener`.
    ///
    /// Ends with exactly one of `on_failed` or `on_finished`, also when the
    /// transfer panics.
    pub async fn run(self: Arc<Self>, listener: Arc<dyn JobListener>) {
        self.started.store(true, Ordering::SeqCst);
        info!(
            job_id = %self.id,
            kind = %self.kind,
            items = self.sources.len(),
            "Job started"
        );
        listener.on_start(&self);

        let taken = self
            .transfer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(mut transfer) = taken else {
            error!(job_id = %self.id, "Job has no transfer, it was cleaned up before running");
            listener.on_finished(&self);
            return;
        };

        let outcome = AssertUnwindSafe(self.drive(transfer.as_mut(), listener.as_ref()))
            .catch_unwind()
            .await;
        if outcome.is_err() {
            error!(job_id = %self.id, "Job panicked, failing unprocessed items");
            self.fail_unprocessed("Job aborted unexpectedly");
        }

        *self.transfer.lock().unwrap_or_else(|e| e.into_inner()) = Some(transfer);

        if self.failed() {
            listener.on_failed(&self);
        } else {
            info!(job_id = %self.id, cancelled = self.is_cancelled(), "Job completed");
            listener.on_finished(&self);
        }
    }

    async fn drive(&self, transfer: &mut dyn TransferJob, listener: &dyn JobListener) {
        if transfer.set_up(self).await {
            if !self.is_cancelled() {
                self.transfer_items(transfer, listener).await;
            }
            transfer.finish(self).await;
        } else {
            warn!(job_id = %self.id, "Job set-up failed");
        }
    }

    /// Fail every source not yet attempted, or all of them if the job died
    /// after the last item.
    fn fail_unprocessed(&self, reason: &str) {
        let processed = self.progress().processed.min(self.sources.len());
        let remaining = &self.sources[processed..];
        if remaining.is_empty() {
            self.fail_all(reason);
            return;
        }
        for src in remaining {
            self.record_failure(src, reason);
        }
    }

    async fn transfer_items(&self, transfer: &mut dyn TransferJob, listener: &dyn JobListener) {
        if !transfer.check_space(self).await {
            warn!(job_id = %self.id, "Not enough free space at destination");
            self.fail_all("Not enough free space at destination");
            return;
        }

        for src in &self.sources {
            if self.is_cancelled() {
                info!(job_id = %self.id, "Job cancelled, stopping transfer");
                break;
            }

            let dest = join_path(transfer.destination(), file_name(src));
            let bytes = match transfer.process_item(self, src, &dest).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(job_id = %self.id, item = %src, error = %e, "Item failed");
                    self.record_failure(src, e.to_string());
                    0
                }
            };

            {
                let mut progress = self.progress.lock().unwrap_or_else(|e| e.into_inner());
                progress.processed += 1;
                progress.bytes_copied += bytes;
            }

            if self.kind.reports_progress() {
                listener.on_progress(self);
            }
        }
    }

    fn lock_failed(&self) -> std::sync::MutexGuard<'_, Vec<FailedItem>> {
        self.failed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Last path segment of a storage path.
fn file_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}
