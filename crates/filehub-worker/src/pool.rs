//! Fixed-size pool running jobs after an optional start delay.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use filehub_core::error::AppError;
use filehub_core::result::AppResult;

const PENDING: u8 = 0;
const RUNNING: u8 = 1;
const DONE: u8 = 2;
const CANCELLED: u8 = 3;

#[derive(Debug)]
struct TaskState {
    state: AtomicU8,
    deadline: Instant,
}

/// Cancellable handle to a scheduled task.
#[derive(Debug, Clone)]
pub struct JobHandle {
    state: Arc<TaskState>,
    abort: AbortHandle,
}

impl JobHandle {
    /// Time left before the task becomes eligible to run. Zero once the
    /// deadline passed, even if the task still waits for a worker.
    pub fn remaining_delay(&self) -> Duration {
        self.state
            .deadline
            .saturating_duration_since(Instant::now())
    }

    /// Whether a worker began executing the task.
    pub fn has_started(&self) -> bool {
        matches!(self.state.state.load(Ordering::SeqCst), RUNNING | DONE)
    }

    /// Whether the task was cancelled before it completed.
    pub fn is_cancelled(&self) -> bool {
        self.state.state.load(Ordering::SeqCst) == CANCELLED
    }

    /// Whether the task ran to completion.
    pub fn is_done(&self) -> bool {
        self.state.state.load(Ordering::SeqCst) == DONE
    }

    /// Cancel the task.
    ///
    /// A task that has not started yet never runs. A running task is only
    /// aborted when `interrupt_if_running` is set. Returns `true` if this
    /// call cancelled the task.
    pub fn cancel(&self, interrupt_if_running: bool) -> bool {
        if self
            .state
            .state
            .compare_exchange(PENDING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            self.abort.abort();
            return true;
        }

        if interrupt_if_running
            && self
                .state
                .state
                .compare_exchange(RUNNING, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            self.abort.abort();
            return true;
        }

        false
    }
}

/// Runs at most `size` tasks concurrently.
#[derive(Debug)]
pub struct WorkerPool {
    size: usize,
    permits: Arc<Semaphore>,
    accepting: AtomicBool,
    tasks: Mutex<Vec<JobHandle>>,
}

impl WorkerPool {
    /// Create a pool with `size` workers (at least one).
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        debug!(size, "Worker pool created");
        Self {
            size,
            permits: Arc::new(Semaphore::new(size)),
            accepting: AtomicBool::new(true),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `task` once `delay` elapsed and a worker is free.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F>(&self, task: F, delay: Duration) -> AppResult<JobHandle>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(AppError::service_unavailable(
                "Worker pool is no longer accepting work",
            ));
        }

        let state = Arc::new(TaskState {
            state: AtomicU8::new(PENDING),
            deadline: Instant::now() + delay,
        });
        let permits = Arc::clone(&self.permits);
        let task_state = Arc::clone(&state);

        let join = tokio::spawn(async move {
            tokio::time::sleep_until(task_state.deadline).await;
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if task_state
                .state
                .compare_exchange(PENDING, RUNNING, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return;
            }
            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                error!("Scheduled task panicked");
            }
            let _ = task_state.state.compare_exchange(
                RUNNING,
                DONE,
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
        });

        let handle = JobHandle {
            state,
            abort: join.abort_handle(),
        };

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        tasks.retain(|t| !t.is_done() && !t.is_cancelled());
        tasks.push(handle.clone());
        Ok(handle)
    }

    /// Tasks scheduled but not yet picked up by a worker.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|t| !t.has_started() && !t.is_cancelled())
            .count()
    }

    /// Stop accepting work and release the workers.
    ///
    /// Running tasks are left to complete. Tasks that never started are
    /// cancelled, and their presence is reported as an error.
    pub fn drain_and_stop(&self) -> AppResult<()> {
        self.accepting.store(false, Ordering::SeqCst);
        self.permits.close();

        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        let unexecuted = tasks.iter().filter(|t| t.cancel(false)).count();

        if unexecuted > 0 {
            warn!(unexecuted, "Worker pool stopped with unexecuted tasks");
            return Err(AppError::internal(format!(
                "{unexecuted} task(s) were never executed"
            )));
        }

        info!(size = self.size, "Worker pool stopped");
        Ok(())
    }
}
