//! Local filesystem storage provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

use filehub_core::error::{AppError, ErrorKind};
use filehub_core::result::AppResult;
use filehub_core::traits::storage::{StorageObjectMeta, StorageProvider};

/// Local filesystem storage provider.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Root directory for all stored files.
    root: PathBuf,
}

/// One entry of a directory tree, relative to the tree root.
#[derive(Debug)]
struct TreeEntry {
    relative: PathBuf,
    is_dir: bool,
    size: u64,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root_path: &str) -> AppResult<Self> {
        let root = PathBuf::from(root_path);
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    /// The directory all paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative path to an absolute path within the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let clean = path.trim_start_matches('/');
        self.root.join(clean)
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Walk a directory tree off the async runtime.
    async fn walk(&self, dir: PathBuf) -> AppResult<Vec<TreeEntry>> {
        tokio::task::spawn_blocking(move || walk_tree(&dir))
            .await
            .map_err(|e| AppError::internal(format!("Directory walk panicked: {e}")))?
            .map_err(|e| AppError::with_source(ErrorKind::Storage, "Failed to walk directory", e))
    }
}

fn walk_tree(dir: &Path) -> std::io::Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        let meta = entry.metadata()?;
        entries.push(TreeEntry {
            relative,
            is_dir: meta.is_dir(),
            size: if meta.is_file() { meta.len() } else { 0 },
        });
    }
    Ok(entries)
}

fn storage_error(op: &str, path: &str, e: std::io::Error) -> AppError {
    if e.kind() == std::io::ErrorKind::NotFound {
        AppError::not_found(format!("Path not found: {path}"))
    } else {
        AppError::with_source(ErrorKind::Storage, format!("Failed to {op}: {path}"), e)
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        Ok(fs::try_exists(self.resolve(path)).await.unwrap_or(false))
    }

    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta> {
        let full_path = self.resolve(path);
        let meta = fs::metadata(&full_path)
            .await
            .map_err(|e| storage_error("get metadata", path, e))?;

        let size_bytes = if meta.is_dir() {
            self.walk(full_path).await?.iter().map(|e| e.size).sum()
        } else {
            meta.len()
        };

        Ok(StorageObjectMeta {
            path: path.to_string(),
            size_bytes,
            last_modified: meta.modified().ok().map(chrono::DateTime::<chrono::Utc>::from),
            is_directory: meta.is_dir(),
        })
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<u64> {
        let from_path = self.resolve(from);
        let to_path = self.resolve(to);
        let meta = fs::metadata(&from_path)
            .await
            .map_err(|e| storage_error("copy", from, e))?;

        if !meta.is_dir() {
            self.ensure_parent(&to_path).await?;
            let bytes = fs::copy(&from_path, &to_path).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to copy {from} -> {to}"),
                    e,
                )
            })?;
            debug!(from, to, bytes, "Copied file");
            return Ok(bytes);
        }

        fs::create_dir_all(&to_path)
            .await
            .map_err(|e| storage_error("create directory", to, e))?;

        let mut total = 0u64;
        for entry in self.walk(from_path.clone()).await? {
            let target = to_path.join(&entry.relative);
            if entry.is_dir {
                fs::create_dir_all(&target)
                    .await
                    .map_err(|e| storage_error("create directory", to, e))?;
            } else {
                self.ensure_parent(&target).await?;
                total += fs::copy(from_path.join(&entry.relative), &target)
                    .await
                    .map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Storage,
                            format!(
                                "Failed to copy {} inside {from} -> {to}",
                                entry.relative.display()
                            ),
                            e,
                        )
                    })?;
            }
        }

        debug!(from, to, bytes = total, "Copied directory tree");
        Ok(total)
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path);
        let meta = match fs::metadata(&full_path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(storage_error("delete", path, e)),
        };

        let removed = if meta.is_dir() {
            fs::remove_dir_all(&full_path).await
        } else {
            fs::remove_file(&full_path).await
        };
        removed.map_err(|e| storage_error("delete", path, e))?;

        debug!(path, "Deleted");
        Ok(())
    }

    async fn create_dir(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path);
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| storage_error("create directory", path, e))
    }

    #[cfg(unix)]
    async fn capacity(&self) -> AppResult<(u64, u64)> {
        let root = self.root.clone();
        let stat = tokio::task::spawn_blocking(move || nix::sys::statvfs::statvfs(root.as_path()))
            .await
            .map_err(|e| AppError::internal(format!("statvfs panicked: {e}")))?
            .map_err(|e| {
                AppError::with_source(ErrorKind::Storage, "Failed to query filesystem capacity", e)
            })?;

        let fragment = stat.fragment_size() as u64;
        let total = stat.blocks() as u64 * fragment;
        let available = stat.blocks_available() as u64 * fragment;
        Ok((total, total.saturating_sub(available)))
    }

    #[cfg(not(unix))]
    async fn capacity(&self) -> AppResult<(u64, u64)> {
        Ok((0, 0))
    }
}
