//! Live job registry.
//!
//! Every read and write of the registry, the keep-alive guard, and the
//! worker pool happens through a [`RegistryLock`], so a cancel for one id
//! can never observe another id half registered or half removed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tracing::{debug, error, info};

use filehub_core::traits::host::HostRuntime;
use filehub_core::types::{JobId, OperationKind};

use crate::error::OperationError;
use crate::factory::JobFactory;
use crate::guard::ResourceGuard;
use crate::jobs::{Job, JobListener};
use crate::pool::{JobHandle, WorkerPool};

/// A live job and its execution handle.
#[derive(Debug, Clone)]
pub struct JobRecord {
    /// The job.
    pub job: Arc<Job>,
    /// Handle of the scheduled task running it.
    pub handle: JobHandle,
}

/// What a cancel request did.
#[derive(Debug)]
pub enum CancelOutcome {
    /// No live job has the id.
    Unknown,
    /// The job is running and will stop on its own.
    Cooperative,
    /// The job never started and never will. The caller drives its finish.
    Unscheduled(Arc<Job>),
}

#[derive(Debug)]
struct RegistryState {
    records: HashMap<JobId, JobRecord>,
    guard: ResourceGuard,
    /// Created on first submit, dropped when the registry drains.
    pool: Option<WorkerPool>,
}

/// Map of live jobs, guarded by a single lock.
#[derive(Debug)]
pub struct JobRegistry {
    state: Mutex<RegistryState>,
    factory: Arc<dyn JobFactory>,
    pool_size: usize,
}

impl JobRegistry {
    /// Create an empty registry.
    pub fn new(factory: Arc<dyn JobFactory>, host: Arc<dyn HostRuntime>, pool_size: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState {
                records: HashMap::new(),
                guard: ResourceGuard::new(host),
                pool: None,
            }),
            factory,
            pool_size,
        }
    }

    /// Take the registry lock.
    pub fn lock(&self) -> RegistryLock<'_> {
        RegistryLock {
            state: self.state.lock().unwrap_or_else(|e| e.into_inner()),
            factory: self.factory.as_ref(),
            pool_size: self.pool_size,
        }
    }
}

/// Exclusive access to the registry.
pub struct RegistryLock<'a> {
    state: MutexGuard<'a, RegistryState>,
    factory: &'a dyn JobFactory,
    pool_size: usize,
}

impl RegistryLock<'_> {
    /// Build a job for a request. Fails if `id` is live.
    pub fn create(
        &self,
        kind: OperationKind,
        id: JobId,
        sources: Vec<String>,
        destination: String,
    ) -> Result<Arc<Job>, OperationError> {
        if self.state.records.contains_key(&id) {
            return Err(OperationError::DuplicateJob(id));
        }
        let job = self.factory.create(kind, id, sources, destination)?;
        Ok(Arc::new(job))
    }

    /// Schedule `job` after `delay` and register it.
    ///
    /// Takes the keep-alive lock first and starts the worker pool if the
    /// registry had drained before. Must be called from within a Tokio
    /// runtime.
    pub fn submit(
        &mut self,
        job: Arc<Job>,
        delay: Duration,
        listener: Arc<dyn JobListener>,
    ) -> Result<JobHandle, OperationError> {
        let id = job.id().clone();
        if self.state.records.contains_key(&id) {
            return Err(OperationError::DuplicateJob(id));
        }

        let state = &mut *self.state;
        state.guard.acquire();
        let pool_size = self.pool_size;
        let pool = state.pool.get_or_insert_with(|| WorkerPool::new(pool_size));

        let task = Arc::clone(&job).run(listener);
        let handle = match pool.schedule(task, delay) {
            Ok(handle) => handle,
            Err(e) => {
                if state.records.is_empty() {
                    state.guard.release();
                }
                return Err(e.into());
            }
        };

        debug!(job_id = %id, delay_ms = delay.as_millis() as u64, "Job scheduled");
        state.records.insert(
            id,
            JobRecord {
                job,
                handle: handle.clone(),
            },
        );
        Ok(handle)
    }

    /// Cancel the job with `id`, if it is live.
    ///
    /// Sets the job's cancellation flag. A job still waiting for its turn
    /// is withdrawn from the pool; a running job is never interrupted.
    pub fn cancel(&self, id: &JobId) -> CancelOutcome {
        let Some(record) = self.state.records.get(id) else {
            debug!(job_id = %id, "Cancel for unknown job ignored");
            return CancelOutcome::Unknown;
        };

        record.job.cancel();
        if record.handle.cancel(false) {
            info!(job_id = %id, "Cancelled job before it started");
            CancelOutcome::Unscheduled(Arc::clone(&record.job))
        } else {
            info!(job_id = %id, "Cancellation requested for running job");
            CancelOutcome::Cooperative
        }
    }

    /// Remove a terminal job and clean it up.
    ///
    /// When the registry becomes empty the worker pool is drained, the
    /// keep-alive lock released, and the host asked to stop. All of that is
    /// deferred while the pool still holds work no job accounts for.
    pub fn remove(&mut self, id: &JobId) -> Result<Arc<Job>, OperationError> {
        let record = self
            .state
            .records
            .remove(id)
            .ok_or_else(|| OperationError::UnknownJob(id.clone()))?;

        record.job.cleanup();
        debug!(job_id = %id, remaining = self.state.records.len(), "Job removed");

        if self.state.records.is_empty() {
            self.shutdown();
        }
        Ok(record.job)
    }

    fn shutdown(&mut self) {
        let state = &mut *self.state;

        if let Some(pool) = state.pool.as_ref() {
            let pending = pool.pending();
            if pending > 0 {
                error!(pending, "Registry drained but worker pool still has pending work, deferring stop");
                return;
            }
            if let Err(e) = pool.drain_and_stop() {
                error!(error = %e, "Worker pool did not drain cleanly");
            }
            state.pool = None;
        }

        state.guard.release();
        state.guard.attempt_stop();
        info!("All file operations complete, worker pool stopped");
    }

    /// Remember the token of the most recently accepted request.
    pub fn record_start(&mut self, token: u64) {
        self.state.guard.record_start(token);
    }

    /// Number of live jobs.
    pub fn len(&self) -> usize {
        self.state.records.len()
    }

    /// Whether no job is live.
    pub fn is_empty(&self) -> bool {
        self.state.records.is_empty()
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: &JobId) -> bool {
        self.state.records.contains_key(id)
    }

    /// The live job with `id`.
    pub fn job(&self, id: &JobId) -> Option<Arc<Job>> {
        self.state.records.get(id).map(|r| Arc::clone(&r.job))
    }

    /// Whether the keep-alive lock is held.
    pub fn holds_wake_lock(&self) -> bool {
        self.state.guard.is_held()
    }

    /// Whether a worker pool is currently running.
    pub fn has_pool(&self) -> bool {
        self.state.pool.is_some()
    }
}
