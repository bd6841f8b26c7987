//! Keep-alive lock and self-stop for the file operation service.

use std::sync::Arc;

use tracing::{debug, warn};

use filehub_core::traits::host::{HostRuntime, WakeLock};

/// Tag under which the keep-alive lock is requested from the host.
pub const WAKE_LOCK_TAG: &str = "FileOperationService";

/// Holds the host keep-alive lock while jobs are live.
///
/// Not synchronized on its own: it lives inside the registry state and is
/// only touched under the registry lock.
#[derive(Debug)]
pub struct ResourceGuard {
    host: Arc<dyn HostRuntime>,
    wake_lock: Option<Arc<dyn WakeLock>>,
    last_start: u64,
}

impl ResourceGuard {
    /// Create a guard that does not hold the lock yet.
    pub fn new(host: Arc<dyn HostRuntime>) -> Self {
        Self {
            host,
            wake_lock: None,
            last_start: 0,
        }
    }

    /// Remember the token of the most recently accepted request.
    pub fn record_start(&mut self, token: u64) {
        self.last_start = token;
    }

    /// Token of the most recently accepted request.
    pub fn last_start(&self) -> u64 {
        self.last_start
    }

    /// Take the keep-alive lock unless it is already held.
    pub fn acquire(&mut self) {
        if self.wake_lock.is_some() {
            return;
        }
        let lock = self.host.new_wake_lock(WAKE_LOCK_TAG);
        lock.acquire();
        debug!("Wake lock acquired");
        self.wake_lock = Some(lock);
    }

    /// Give the keep-alive lock back and forget it.
    pub fn release(&mut self) {
        match self.wake_lock.take() {
            Some(lock) => {
                lock.release();
                debug!("Wake lock released");
            }
            None => warn!("Release requested but no wake lock is held"),
        }
    }

    /// Whether the keep-alive lock is held.
    pub fn is_held(&self) -> bool {
        self.wake_lock.as_ref().is_some_and(|lock| lock.is_held())
    }

    /// Ask the host to stop the service on behalf of the last accepted
    /// request. A refusal is logged and otherwise ignored.
    pub fn attempt_stop(&self) -> bool {
        let stopped = self.host.stop_self(self.last_start);
        if !stopped {
            warn!(
                last_start = self.last_start,
                "Service should be stopping, but host reports otherwise"
            );
        }
        stopped
    }
}
