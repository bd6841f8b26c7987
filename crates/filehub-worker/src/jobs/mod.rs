//! File operation jobs.
//!
//! A [`Job`] is the schedulable unit the registry tracks: identity,
//! cancellation flag, failure and progress accounting, and the run loop.
//! What a job actually does to each item is delegated to a
//! [`TransferJob`], implemented by [`CopyJob`] (copy and move) and
//! [`CompressJob`].

pub mod compress;
pub mod copy;
pub mod job;

use async_trait::async_trait;

use filehub_core::result::AppResult;

pub use compress::CompressJob;
pub use copy::{CopyJob, TransferMode};
pub use job::{FailedItem, Job, JobListener, JobProgress};

/// Titles used when presenting a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewLabels {
    /// Shown while the job sets up.
    pub setup: &'static str,
    /// Shown while items are transferred.
    pub progress: &'static str,
    /// Shown when items failed.
    pub failure: &'static str,
}

/// The per-operation behaviour a [`Job`] drives.
///
/// `set_up` runs first; when it returns `true` the job checks space,
/// processes every source with `process_item`, and always calls `finish`
/// once afterwards, whether items failed or the job was cancelled. A
/// transfer whose `set_up` fails must record its own failures on the job.
#[async_trait]
pub trait TransferJob: Send + Sync + std::fmt::Debug {
    /// Prepare the destination. Returns `false` if the job cannot proceed.
    async fn set_up(&mut self, job: &Job) -> bool;

    /// Whether the destination can hold every source.
    async fn check_space(&self, job: &Job) -> bool;

    /// The directory items are currently transferred into.
    fn destination(&self) -> &str;

    /// Transfer one source to `dest`. Returns the number of bytes moved.
    async fn process_item(&mut self, job: &Job, src: &str, dest: &str) -> AppResult<u64>;

    /// Runs once after all items were attempted.
    async fn finish(&mut self, _job: &Job) {}

    /// Presentation titles for this operation.
    fn labels(&self) -> ViewLabels;

    /// Release anything still held. Called once, after the job left the
    /// registry.
    fn cleanup(&mut self) {}
}
