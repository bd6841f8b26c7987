//! Domain events emitted by FileHub file operations.
//!
//! Events are published by the operation worker as jobs move through their
//! lifecycle and consumed by observers such as the CLI output writer and
//! integration tests.

pub mod job;

pub use job::JobEvent;
