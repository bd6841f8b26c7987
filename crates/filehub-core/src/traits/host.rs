//! Host runtime hooks: keep-alive locks and self-stop.

use std::sync::Arc;

/// A keep-alive resource that stops the host from suspending while held.
pub trait WakeLock: Send + Sync + std::fmt::Debug {
    /// Take the lock.
    fn acquire(&self);

    /// Give the lock back.
    fn release(&self);

    /// Whether the lock is currently held.
    fn is_held(&self) -> bool;
}

/// The environment hosting the file operation service.
pub trait HostRuntime: Send + Sync + std::fmt::Debug + 'static {
    /// Create a new, not yet acquired, keep-alive lock.
    fn new_wake_lock(&self, tag: &str) -> Arc<dyn WakeLock>;

    /// Ask the host to stop the service. `start_token` is the token of the
    /// last request the service accepted; the host refuses (returns `false`)
    /// when it has handed out a newer request since.
    fn stop_self(&self, start_token: u64) -> bool;
}
