//! Storage provider trait for pluggable file storage backends.

use async_trait::async_trait;

use crate::result::AppResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageObjectMeta {
    /// Path within the storage provider.
    pub path: String,
    /// Size in bytes. For directories, the total size of contained files.
    pub size_bytes: u64,
    /// Last modified timestamp.
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
    /// Whether this is a directory.
    pub is_directory: bool,
}

/// Trait for file storage backends used by transfer jobs.
///
/// Paths are relative to the provider's root. The [`StorageProvider`] trait
/// is defined here in `filehub-core` and implemented in `filehub-storage`.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local").
    fn provider_type(&self) -> &str;

    /// Check whether a file or directory exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Get metadata about a file or directory.
    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta>;

    /// Copy a file or directory tree. Returns the number of bytes copied.
    async fn copy(&self, from: &str, to: &str) -> AppResult<u64>;

    /// Delete a file or directory tree.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Create a directory (and any missing parents).
    async fn create_dir(&self, path: &str) -> AppResult<()>;

    /// Get the total and used capacity of this storage backend.
    ///
    /// A total of zero means the capacity is unknown.
    async fn capacity(&self) -> AppResult<(u64, u64)>;
}
