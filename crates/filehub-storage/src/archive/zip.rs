//! Zip archive provider.
//!
//! An archive is created as an empty zip file plus a hidden staging
//! directory next to it. Transfer jobs write items under the staging
//! directory as if it were the inside of the archive; sealing packs the
//! staging tree into the zip file and removes the staging directory.

use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use filehub_core::error::{AppError, ErrorKind};
use filehub_core::result::AppResult;
use filehub_core::traits::archive::{ArchiveHandle, ArchiveProvider};

/// Creates zip archives inside a local storage root.
#[derive(Debug, Clone)]
pub struct ZipArchiveProvider {
    /// Storage root that archive paths are relative to.
    root: PathBuf,
}

impl ZipArchiveProvider {
    /// Create a provider for archives under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

fn join(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

fn archive_error(message: impl Into<String>, e: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::with_source(ErrorKind::Archive, message, e)
}

/// Pack every entry below `staging` into a deflated zip written to `out`.
/// Returns the number of files written.
fn pack_tree<W: Write + Seek>(staging: &Path, out: W) -> AppResult<usize> {
    let mut writer = ZipWriter::new(out);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut files = 0;

    for entry in WalkDir::new(staging).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| archive_error("Failed to walk archive staging", e))?;
        let name = entry
            .path()
            .strip_prefix(staging)
            .map_err(|e| archive_error("Staging entry escaped its root", e))?
            .to_string_lossy()
            .replace('\\', "/");

        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .map_err(|e| archive_error("Failed to add directory entry", e))?;
            continue;
        }

        writer
            .start_file(name.clone(), options)
            .map_err(|e| archive_error(format!("Failed to start entry {name}"), e))?;
        let mut source = File::open(entry.path())
            .map_err(|e| archive_error(format!("Failed to open staged file {name}"), e))?;
        io::copy(&mut source, &mut writer)
            .map_err(|e| archive_error(format!("Failed to write entry {name}"), e))?;
        files += 1;
    }

    writer
        .finish()
        .map_err(|e| archive_error("Failed to finish zip archive", e))?;
    Ok(files)
}

#[async_trait]
impl ArchiveProvider for ZipArchiveProvider {
    async fn create_archive(&self, parent: &str, name: &str) -> AppResult<ArchiveHandle> {
        let parent_path = self.resolve(parent);
        let is_dir = fs::metadata(&parent_path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(AppError::archive(format!(
                "Archive destination is not a directory: {parent}"
            )));
        }

        let handle = ArchiveHandle {
            archive_path: join(parent, name),
            root: join(parent, &format!(".{name}.staging")),
        };

        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.resolve(&handle.archive_path))
            .await
            .map_err(|e| {
                archive_error(format!("Failed to create archive {}", handle.archive_path), e)
            })?;

        fs::create_dir_all(self.resolve(&handle.root))
            .await
            .map_err(|e| archive_error(format!("Failed to create staging {}", handle.root), e))?;

        debug!(archive = %handle.archive_path, staging = %handle.root, "Created archive");
        Ok(handle)
    }

    async fn close_archive(&self, handle: &ArchiveHandle) -> AppResult<()> {
        let staging = self.resolve(&handle.root);
        let archive = self.resolve(&handle.archive_path);

        let staged = staging.clone();
        let files = tokio::task::spawn_blocking(move || {
            let out = File::create(&archive)
                .map_err(|e| archive_error("Failed to open archive for writing", e))?;
            pack_tree(&staged, out)
        })
        .await
        .map_err(|e| AppError::internal(format!("Archive packing panicked: {e}")))??;

        fs::remove_dir_all(&staging)
            .await
            .map_err(|e| archive_error(format!("Failed to remove staging {}", handle.root), e))?;

        info!(archive = %handle.archive_path, files, "Sealed archive");
        Ok(())
    }
}
