//! File operation kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Kind of file operation a job performs. Immutable once a job exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Copy sources into the destination.
    Copy,
    /// Copy sources into the destination, then delete them.
    Move,
    /// Delete sources. Recognised but not yet supported by the worker.
    Delete,
    /// Copy sources into a new archive created at the destination.
    Compress,
}

impl OperationKind {
    /// Return the wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
            Self::Delete => "delete",
            Self::Compress => "compress",
        }
    }

    /// Whether jobs of this kind report incremental progress.
    pub fn reports_progress(&self) -> bool {
        matches!(self, Self::Copy | Self::Move | Self::Compress)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "copy" => Ok(Self::Copy),
            "move" => Ok(Self::Move),
            "delete" => Ok(Self::Delete),
            "compress" => Ok(Self::Compress),
            _ => Err(AppError::validation(format!("Unknown operation kind: {s}"))),
        }
    }
}
