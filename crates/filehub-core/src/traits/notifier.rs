//! Presentation sink for job notifications.

use serde::{Deserialize, Serialize};

use crate::types::JobId;

/// What a notifier should show for a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum NotificationView {
    /// The job has started and is preparing its transfer.
    Setup {
        /// Human-readable title.
        title: String,
    },
    /// The job is transferring items.
    Progress {
        /// Human-readable title.
        title: String,
        /// Items processed so far.
        processed: usize,
        /// Total number of items.
        total: usize,
        /// Bytes transferred so far.
        bytes_copied: u64,
    },
    /// The job ended with failed items.
    Failure {
        /// Human-readable title.
        title: String,
        /// Sources that could not be processed.
        failed_items: Vec<String>,
    },
}

impl NotificationView {
    /// Whether this view tracks an ongoing job and goes away on dismissal.
    pub fn is_ongoing(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

/// Renders job notifications.
///
/// `dismiss` only clears ongoing (setup/progress) views; failure views stay
/// visible until the user acts on them. Both calls must be cheap and must
/// tolerate ids they have never seen.
pub trait Notifier: Send + Sync + std::fmt::Debug + 'static {
    /// Show or replace the view for a job.
    fn show(&self, job_id: &JobId, view: NotificationView);

    /// Dismiss the ongoing view for a job, if any.
    fn dismiss(&self, job_id: &JobId);
}
