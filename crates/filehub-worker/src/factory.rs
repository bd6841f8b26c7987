//! Builds the right job for a requested operation.

use std::sync::Arc;

use tracing::debug;

use filehub_core::traits::archive::ArchiveProvider;
use filehub_core::traits::storage::StorageProvider;
use filehub_core::types::{JobId, OperationKind};

use crate::error::OperationError;
use crate::jobs::{CompressJob, CopyJob, Job, TransferJob, TransferMode};

/// Constructs jobs for operation kinds.
pub trait JobFactory: Send + Sync + std::fmt::Debug + 'static {
    /// Build a job of `kind` over `sources` into `destination`.
    fn create(
        &self,
        kind: OperationKind,
        id: JobId,
        sources: Vec<String>,
        destination: String,
    ) -> Result<Job, OperationError>;
}

/// Job factory backed by a storage provider and an archive provider.
#[derive(Debug, Clone)]
pub struct DefaultJobFactory {
    storage: Arc<dyn StorageProvider>,
    archives: Arc<dyn ArchiveProvider>,
    archive_name: String,
}

impl DefaultJobFactory {
    /// Create a factory. Compress jobs name their archive `archive_name`.
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        archives: Arc<dyn ArchiveProvider>,
        archive_name: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            archives,
            archive_name: archive_name.into(),
        }
    }
}

impl JobFactory for DefaultJobFactory {
    fn create(
        &self,
        kind: OperationKind,
        id: JobId,
        sources: Vec<String>,
        destination: String,
    ) -> Result<Job, OperationError> {
        let transfer: Box<dyn TransferJob> = match kind {
            OperationKind::Copy => Box::new(CopyJob::new(
                TransferMode::Copy,
                Arc::clone(&self.storage),
                destination,
            )),
            OperationKind::Move => Box::new(CopyJob::new(
                TransferMode::Move,
                Arc::clone(&self.storage),
                destination,
            )),
            OperationKind::Compress => Box::new(CompressJob::new(
                Arc::clone(&self.storage),
                Arc::clone(&self.archives),
                destination,
                self.archive_name.clone(),
            )),
            OperationKind::Delete => return Err(OperationError::Unsupported(kind)),
        };

        debug!(job_id = %id, %kind, items = sources.len(), "Created job");
        Ok(Job::new(id, kind, sources, transfer))
    }
}
