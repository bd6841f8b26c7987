//! # filehub-storage
//!
//! Storage and archive provider implementations for FileHub file
//! operations: a local filesystem [`StorageProvider`] and a zip-backed
//! [`ArchiveProvider`].
//!
//! [`StorageProvider`]: filehub_core::traits::StorageProvider
//! [`ArchiveProvider`]: filehub_core::traits::ArchiveProvider

pub mod archive;
pub mod providers;

pub use archive::ZipArchiveProvider;
pub use providers::LocalStorageProvider;
