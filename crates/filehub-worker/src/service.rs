//! File operation service.
//!
//! Accepts operation and cancel requests, drives the [`JobRegistry`], and
//! relays job lifecycle callbacks to the [`Notifier`] and to event
//! subscribers. Requests are expected one at a time; job callbacks arrive
//! concurrently from the worker pool.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use filehub_core::config::WorkerConfig;
use filehub_core::events::JobEvent;
use filehub_core::traits::host::HostRuntime;
use filehub_core::traits::notifier::Notifier;
use filehub_core::types::{JobId, OperationKind};

use crate::error::OperationError;
use crate::factory::JobFactory;
use crate::jobs::{Job, JobListener};
use crate::pool::JobHandle;
use crate::registry::{CancelOutcome, JobRegistry};
use crate::request::{OperationRequest, Request};

const EVENT_CAPACITY: usize = 256;

/// Schedules file operations and tracks them until they are removed.
#[derive(Debug, Clone)]
pub struct FileOperationService {
    inner: Arc<ServiceInner>,
}

#[derive(Debug)]
struct ServiceInner {
    registry: JobRegistry,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<JobEvent>,
    config: WorkerConfig,
    next_start: AtomicU64,
}

impl FileOperationService {
    /// Create a service with no live jobs.
    pub fn new(
        config: WorkerConfig,
        factory: Arc<dyn JobFactory>,
        host: Arc<dyn HostRuntime>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ServiceInner {
                registry: JobRegistry::new(factory, host, config.pool_size),
                notifier,
                events,
                config,
                next_start: AtomicU64::new(0),
            }),
        }
    }

    /// Handle one request. Cancels for unknown ids succeed silently.
    pub fn handle_request(&self, request: Request) -> Result<(), OperationError> {
        match request {
            Request::Cancel(cancel) => {
                if !cancel.cancel {
                    return Err(OperationError::InvalidRequest(
                        "cancel requests must set `cancel` to true".to_string(),
                    ));
                }
                self.handle_cancel(&cancel.job_id);
                Ok(())
            }
            Request::Operation(operation) => self.handle_operation(operation).map(|_| ()),
        }
    }

    /// Validate and schedule an operation.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn handle_operation(&self, request: OperationRequest) -> Result<JobHandle, OperationError> {
        let kind: OperationKind = request
            .operation_kind
            .parse()
            .map_err(|_| OperationError::UnknownKind(request.operation_kind.clone()))?;

        let delay_ms = request
            .delay_millis
            .unwrap_or(self.inner.config.default_delay_ms);
        if delay_ms > self.inner.config.max_delay_ms {
            return Err(OperationError::InvalidDelay {
                delay_ms,
                max_ms: self.inner.config.max_delay_ms,
            });
        }

        let job_id = request.job_id.clone();
        let items = request.sources.len();

        let mut registry = self.inner.registry.lock();
        let job = registry.create(kind, request.job_id, request.sources, request.destination)?;
        let listener: Arc<dyn JobListener> = self.inner.clone();
        let handle = registry.submit(job, Duration::from_millis(delay_ms), listener)?;
        let token = self.inner.next_start.fetch_add(1, Ordering::SeqCst) + 1;
        registry.record_start(token);
        drop(registry);

        info!(job_id = %job_id, %kind, items, delay_ms, "Accepted file operation");
        Ok(handle)
    }

    /// Cancel a live job. Its notification is dismissed in every case.
    pub fn handle_cancel(&self, job_id: &JobId) {
        {
            let mut registry = self.inner.registry.lock();
            if let CancelOutcome::Unscheduled(job) = registry.cancel(job_id) {
                if let Err(e) = registry.remove(job_id) {
                    error!(job_id = %job_id, error = %e, "Failed to remove cancelled job");
                }
                self.inner.publish(JobEvent::Finished {
                    job_id: job.id().clone(),
                    cancelled: true,
                    at: Utc::now(),
                });
            }
        }

        self.inner.notifier.dismiss(job_id);
    }

    /// Subscribe to lifecycle events of all jobs.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.inner.events.subscribe()
    }

    /// Whether the host keep-alive lock is held.
    pub fn holds_wake_lock(&self) -> bool {
        self.inner.registry.lock().holds_wake_lock()
    }

    /// Number of live jobs.
    pub fn active_jobs(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Whether no job is live.
    pub fn is_idle(&self) -> bool {
        self.inner.registry.lock().is_empty()
    }

    /// The live job with `job_id`.
    pub fn job(&self, job_id: &JobId) -> Option<Arc<Job>> {
        self.inner.registry.lock().job(job_id)
    }

    /// Wait until every live job left the registry.
    ///
    /// Once this returns, the `Finished` event of every removed job has been
    /// sent to subscribers.
    pub async fn wait_until_idle(&self) {
        let mut events = self.subscribe();
        loop {
            if self.is_idle() {
                return;
            }
            match events.recv().await {
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

impl ServiceInner {
    fn publish(&self, event: JobEvent) {
        debug!(job_id = %event.job_id(), event = event.name(), "Publishing job event");
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl JobListener for ServiceInner {
    fn on_start(&self, job: &Job) {
        self.notifier.show(job.id(), job.setup_view());
        self.publish(JobEvent::Started {
            job_id: job.id().clone(),
            kind: job.kind(),
            at: Utc::now(),
        });
    }

    fn on_progress(&self, job: &Job) {
        self.notifier.show(job.id(), job.progress_view());
        let progress = job.progress();
        self.publish(JobEvent::Progress {
            job_id: job.id().clone(),
            processed: progress.processed,
            total: progress.total,
            bytes_copied: progress.bytes_copied,
        });
    }

    fn on_failed(&self, job: &Job) {
        let failed_items: Vec<String> = job.failed_items().into_iter().map(|f| f.item).collect();
        error!(
            job_id = %job.id(),
            kind = %job.kind(),
            failed = failed_items.len(),
            "File operation finished with failed items"
        );
        self.notifier.show(job.id(), job.failure_view());
        self.publish(JobEvent::Failed {
            job_id: job.id().clone(),
            failed_items,
        });
        self.on_finished(job);
    }

    fn on_finished(&self, job: &Job) {
        self.notifier.dismiss(job.id());

        // Published under the registry lock so an idle registry implies the
        // event is already queued.
        let mut registry = self.registry.lock();
        if let Err(e) = registry.remove(job.id()) {
            error!(job_id = %job.id(), error = %e, "Finished job was not registered");
        }
        self.publish(JobEvent::Finished {
            job_id: job.id().clone(),
            cancelled: job.is_cancelled(),
            at: Utc::now(),
        });
    }
}
