//! Storage provider configuration.

use serde::{Deserialize, Serialize};

/// Storage configuration for file operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root path for local file storage. Job sources and destinations are
    /// resolved relative to it.
    #[serde(default = "default_root")]
    pub root: String,
    /// File name given to archives created by compress jobs.
    #[serde(default = "default_archive_name")]
    pub archive_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            archive_name: default_archive_name(),
        }
    }
}

fn default_root() -> String {
    "./data/storage".to_string()
}

fn default_archive_name() -> String {
    "archive.zip".to_string()
}
