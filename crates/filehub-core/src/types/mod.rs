//! Core type definitions used across the FileHub workspace.

pub mod id;
pub mod operation;

pub use id::JobId;
pub use operation::OperationKind;
