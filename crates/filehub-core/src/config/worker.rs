//! File operation worker configuration.

use serde::{Deserialize, Serialize};

/// File operation worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Number of jobs that may execute in parallel.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    /// Delay applied when a request does not specify one, in milliseconds.
    #[serde(default)]
    pub default_delay_ms: u64,
    /// Upper bound for a requested start delay, in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
    /// How long the binary waits for outstanding jobs after input closes.
    #[serde(default = "default_drain_timeout")]
    pub drain_timeout_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            default_delay_ms: 0,
            max_delay_ms: default_max_delay(),
            drain_timeout_seconds: default_drain_timeout(),
        }
    }
}

fn default_pool_size() -> usize {
    2
}

fn default_max_delay() -> u64 {
    10_000
}

fn default_drain_timeout() -> u64 {
    30
}
