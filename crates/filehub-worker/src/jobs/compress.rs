//! Compress transfers.
//!
//! A compress job is a copy into a freshly created archive: set-up creates
//! the archive at the requested destination and points the inner
//! [`CopyJob`] at the archive's writable root, items are transferred by
//! the copy logic unchanged, and `finish` seals the archive.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use filehub_core::result::AppResult;
use filehub_core::traits::archive::{ArchiveHandle, ArchiveProvider};
use filehub_core::traits::storage::StorageProvider;

use super::{CopyJob, Job, TransferJob, TransferMode, ViewLabels};

/// Copies items into a new archive.
#[derive(Debug)]
pub struct CompressJob {
    inner: CopyJob,
    archives: Arc<dyn ArchiveProvider>,
    archive_name: String,
    /// Open archive, until it is sealed.
    archive: Option<ArchiveHandle>,
}

impl CompressJob {
    /// Create a compress transfer producing `archive_name` in `destination`.
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        archives: Arc<dyn ArchiveProvider>,
        destination: String,
        archive_name: String,
    ) -> Self {
        Self {
            inner: CopyJob::new(TransferMode::Copy, storage, destination),
            archives,
            archive_name,
            archive: None,
        }
    }

    /// The archive currently open for writing.
    pub fn archive(&self) -> Option<&ArchiveHandle> {
        self.archive.as_ref()
    }

    async fn seal(&mut self, job: &Job) {
        let Some(handle) = self.archive.take() else {
            return;
        };
        if let Err(e) = self.archives.close_archive(&handle).await {
            error!(job_id = %job.id(), archive = %handle.archive_path, error = %e, "Failed to seal archive");
            job.fail_all(&format!("Archive could not be sealed: {e}"));
        }
    }
}

#[async_trait]
impl TransferJob for CompressJob {
    async fn set_up(&mut self, job: &Job) -> bool {
        let handle = match self
            .archives
            .create_archive(self.inner.destination(), &self.archive_name)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                error!(job_id = %job.id(), error = %e, "Failed to create archive");
                job.fail_all(&format!("Archive could not be created: {e}"));
                return false;
            }
        };

        self.inner.redirect(handle.root.clone());
        self.archive = Some(handle);

        if self.inner.set_up(job).await {
            true
        } else {
            self.seal(job).await;
            false
        }
    }

    async fn check_space(&self, _job: &Job) -> bool {
        // The compressed size is unknown until the archive is written.
        true
    }

    fn destination(&self) -> &str {
        self.inner.destination()
    }

    async fn process_item(&mut self, job: &Job, src: &str, dest: &str) -> AppResult<u64> {
        self.inner.process_item(job, src, dest).await
    }

    async fn finish(&mut self, job: &Job) {
        self.seal(job).await;
    }

    fn labels(&self) -> ViewLabels {
        ViewLabels {
            setup: "Preparing to compress",
            progress: "Compressing files",
            failure: "Some files couldn't be compressed",
        }
    }

    fn cleanup(&mut self) {
        if let Some(handle) = &self.archive {
            warn!(archive = %handle.archive_path, "Archive was never sealed");
        }
    }
}
