//! Core traits defined in `filehub-core` and implemented by other crates.

pub mod archive;
pub mod host;
pub mod notifier;
pub mod storage;

pub use archive::{ArchiveHandle, ArchiveProvider};
pub use host::{HostRuntime, WakeLock};
pub use notifier::{NotificationView, Notifier};
pub use storage::{StorageObjectMeta, StorageProvider};
