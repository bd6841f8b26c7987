//! Archive container provider used by compress jobs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// An open archive created by an [`ArchiveProvider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveHandle {
    /// Storage path of the archive file itself.
    pub archive_path: String,
    /// Storage path that items are written under to land inside the archive.
    pub root: String,
}

/// Creates and seals archive containers.
#[async_trait]
pub trait ArchiveProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Create an empty archive called `name` inside the `parent` directory.
    async fn create_archive(&self, parent: &str, name: &str) -> AppResult<ArchiveHandle>;

    /// Seal the archive so it can be read. Nothing may be written under
    /// `handle.root` afterwards.
    async fn close_archive(&self, handle: &ArchiveHandle) -> AppResult<()>;
}
