//! Job lifecycle events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{JobId, OperationKind};

/// Lifecycle transitions of a file operation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobEvent {
    /// A worker picked the job up and began setting it up.
    Started {
        /// The job ID.
        job_id: JobId,
        /// The operation being performed.
        kind: OperationKind,
        /// When the job started.
        at: DateTime<Utc>,
    },
    /// The job finished processing one more source item.
    Progress {
        /// The job ID.
        job_id: JobId,
        /// Items processed so far, failed ones included.
        processed: usize,
        /// Total number of source items.
        total: usize,
        /// Bytes transferred so far.
        bytes_copied: u64,
    },
    /// The job completed with at least one failed item.
    Failed {
        /// The job ID.
        job_id: JobId,
        /// Sources that could not be processed.
        failed_items: Vec<String>,
    },
    /// The job left the registry. Always the last event for an id.
    Finished {
        /// The job ID.
        job_id: JobId,
        /// Whether the job was cancelled before or while running.
        cancelled: bool,
        /// When the job was removed.
        at: DateTime<Utc>,
    },
}

impl JobEvent {
    /// The job this event belongs to.
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Started { job_id, .. }
            | Self::Progress { job_id, .. }
            | Self::Failed { job_id, .. }
            | Self::Finished { job_id, .. } => job_id,
        }
    }

    /// Short name of the transition, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Progress { .. } => "progress",
            Self::Failed { .. } => "failed",
            Self::Finished { .. } => "finished",
        }
    }
}
