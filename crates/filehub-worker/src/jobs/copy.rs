//! Copy and move transfers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use filehub_core::result::AppResult;
use filehub_core::traits::storage::StorageProvider;

use super::{Job, TransferJob, ViewLabels};

/// Whether sources are kept after being transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Keep the sources.
    Copy,
    /// Delete each source once it was copied.
    Move,
}

/// Copies (or moves) items into a destination directory.
#[derive(Debug)]
pub struct CopyJob {
    mode: TransferMode,
    storage: Arc<dyn StorageProvider>,
    destination: String,
}

impl CopyJob {
    /// Create a transfer into `destination` on `storage`.
    pub fn new(mode: TransferMode, storage: Arc<dyn StorageProvider>, destination: String) -> Self {
        Self {
            mode,
            storage,
            destination,
        }
    }

    /// Whether sources are kept.
    pub fn mode(&self) -> TransferMode {
        self.mode
    }

    /// Send subsequent items somewhere else.
    pub(crate) fn redirect(&mut self, destination: String) {
        debug!(from = %self.destination, to = %destination, "Redirecting transfer");
        self.destination = destination;
    }
}

#[async_trait]
impl TransferJob for CopyJob {
    async fn set_up(&mut self, job: &Job) -> bool {
        match self.storage.metadata(&self.destination).await {
            Ok(meta) if meta.is_directory => true,
            Ok(_) => {
                error!(job_id = %job.id(), destination = %self.destination, "Destination is not a directory");
                job.fail_all("Destination is not a directory");
                false
            }
            Err(e) => {
                error!(job_id = %job.id(), destination = %self.destination, error = %e, "Destination unavailable");
                job.fail_all(&format!("Destination unavailable: {e}"));
                false
            }
        }
    }

    async fn check_space(&self, job: &Job) -> bool {
        let (total, used) = match self.storage.capacity().await {
            Ok(capacity) => capacity,
            Err(e) => {
                warn!(job_id = %job.id(), error = %e, "Could not query capacity, assuming it fits");
                return true;
            }
        };
        if total == 0 {
            return true;
        }

        let mut required = 0u64;
        for src in job.sources() {
            if let Ok(meta) = self.storage.metadata(src).await {
                required += meta.size_bytes;
            }
        }

        let free = total.saturating_sub(used);
        debug!(job_id = %job.id(), required, free, "Checked destination space");
        required <= free
    }

    fn destination(&self) -> &str {
        &self.destination
    }

    async fn process_item(&mut self, _job: &Job, src: &str, dest: &str) -> AppResult<u64> {
        let bytes = self.storage.copy(src, dest).await?;
        if self.mode == TransferMode::Move {
            self.storage.delete(src).await?;
        }
        Ok(bytes)
    }

    fn labels(&self) -> ViewLabels {
        match self.mode {
            TransferMode::Copy => ViewLabels {
                setup: "Preparing to copy",
                progress: "Copying files",
                failure: "Some files couldn't be copied",
            },
            TransferMode::Move => ViewLabels {
                setup: "Preparing to move",
                progress: "Moving files",
                failure: "Some files couldn't be moved",
            },
        }
    }
}
