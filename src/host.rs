//! Process host for the stdio driver.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use filehub_core::traits::host::{HostRuntime, WakeLock};

/// Keep-alive lock that only records whether it is held.
#[derive(Debug)]
pub struct ProcessWakeLock {
    tag: String,
    held: AtomicBool,
}

impl WakeLock for ProcessWakeLock {
    fn acquire(&self) {
        self.held.store(true, Ordering::SeqCst);
        tracing::debug!("Wake lock '{}' acquired", self.tag);
    }

    fn release(&self) {
        self.held.store(false, Ordering::SeqCst);
        tracing::debug!("Wake lock '{}' released", self.tag);
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

/// Host that lets the service stop only once no more requests can arrive.
#[derive(Debug, Default)]
pub struct StdioHost {
    input_closed: AtomicBool,
}

impl StdioHost {
    /// Mark stdin as exhausted.
    pub fn close_input(&self) {
        self.input_closed.store(true, Ordering::SeqCst);
    }
}

impl HostRuntime for StdioHost {
    fn new_wake_lock(&self, tag: &str) -> Arc<dyn WakeLock> {
        Arc::new(ProcessWakeLock {
            tag: tag.to_string(),
            held: AtomicBool::new(false),
        })
    }

    fn stop_self(&self, start_token: u64) -> bool {
        let closed = self.input_closed.load(Ordering::SeqCst);
        tracing::debug!(start_token, closed, "Stop requested");
        closed
    }
}
