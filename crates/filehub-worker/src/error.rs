//! Request and registry errors for file operations.

use filehub_core::error::AppError;
use filehub_core::types::{JobId, OperationKind};

/// Error returned when a file operation request is rejected or the
/// registry is asked about a job it never created.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    /// A job with this id is already scheduled or running.
    #[error("Job '{0}' is already scheduled or running")]
    DuplicateJob(JobId),

    /// The operation kind is not recognised.
    #[error("Unknown operation kind '{0}'")]
    UnknownKind(String),

    /// The operation kind is recognised but not implemented yet.
    #[error("Operation '{0}' is not supported yet")]
    Unsupported(OperationKind),

    /// No live job has this id.
    #[error("Job '{0}' is not registered")]
    UnknownJob(JobId),

    /// The requested start delay is above the configured ceiling.
    #[error("Delay of {delay_ms}ms exceeds the {max_ms}ms ceiling")]
    InvalidDelay {
        /// Requested delay.
        delay_ms: u64,
        /// Configured ceiling.
        max_ms: u64,
    },

    /// The request is malformed.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

impl From<OperationError> for AppError {
    fn from(err: OperationError) -> Self {
        let message = err.to_string();
        match err {
            OperationError::DuplicateJob(_) => AppError::conflict(message),
            OperationError::UnknownKind(_)
            | OperationError::InvalidDelay { .. }
            | OperationError::InvalidRequest(_) => AppError::validation(message),
            OperationError::Unsupported(_) => AppError::not_implemented(message),
            OperationError::UnknownJob(_) => AppError::not_found(message),
            OperationError::Internal(inner) => inner,
        }
    }
}
