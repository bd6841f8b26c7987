//! Background file operation processing for FileHub.
//!
//! This crate provides:
//! - A file operation service that accepts copy/move/compress requests,
//!   tracks live jobs, and relays their lifecycle to a notifier
//! - A job registry guarding live jobs and the host keep-alive lock
//! - A fixed-size worker pool that runs jobs after an optional delay
//! - Job implementations for copy, move, and compress

pub mod error;
pub mod factory;
pub mod guard;
pub mod jobs;
pub mod pool;
pub mod registry;
pub mod request;
pub mod service;

pub use error::OperationError;
pub use factory::{DefaultJobFactory, JobFactory};
pub use jobs::{Job, JobListener};
pub use request::{CancelRequest, OperationRequest, Request};
pub use service::FileOperationService;
