//! # filehub-core
//!
//! Core crate for FileHub file operations. Contains the collaborator traits
//! consumed by the operation worker, configuration schemas, typed
//! identifiers, job lifecycle events, and the unified error system.
//!
//! This crate has **no** internal dependencies on other FileHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
