//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, broadcast};

use filehub_core::config::WorkerConfig;
use filehub_core::error::AppError;
use filehub_core::events::JobEvent;
use filehub_core::result::AppResult;
use filehub_core::traits::archive::{ArchiveHandle, ArchiveProvider};
use filehub_core::traits::host::{HostRuntime, WakeLock};
use filehub_core::traits::notifier::{NotificationView, Notifier};
use filehub_core::traits::storage::{StorageObjectMeta, StorageProvider};
use filehub_core::types::JobId;
use filehub_worker::{DefaultJobFactory, FileOperationService, OperationRequest};

/// How long a test waits for a single event before giving up.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// ── Storage ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tree {
    files: BTreeMap<String, u64>,
    dirs: BTreeSet<String>,
}

impl Tree {
    fn under<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = (&'a String, &'a u64)> + 'a {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        self.files
            .iter()
            .filter(move |(path, _)| path.starts_with(&prefix))
    }
}

/// In-memory storage with injectable failures and an optional gate that
/// holds every copy until a permit is released.
#[derive(Debug)]
pub struct MemoryStorage {
    tree: Mutex<Tree>,
    failing: Mutex<HashSet<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    capacity: Mutex<(u64, u64)>,
    copies: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tree: Mutex::new(Tree::default()),
            failing: Mutex::new(HashSet::new()),
            gate: Mutex::new(None),
            capacity: Mutex::new((0, 0)),
            copies: AtomicUsize::new(0),
        })
    }

    pub fn add_file(&self, path: &str, size: u64) {
        self.tree.lock().unwrap().files.insert(path.to_string(), size);
    }

    pub fn add_dir(&self, path: &str) {
        self.tree
            .lock()
            .unwrap()
            .dirs
            .insert(path.trim_end_matches('/').to_string());
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.tree.lock().unwrap().files.contains_key(path)
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.tree.lock().unwrap().dirs.contains(path)
    }

    pub fn file_size(&self, path: &str) -> Option<u64> {
        self.tree.lock().unwrap().files.get(path).copied()
    }

    /// Copying `path` fails with a storage error.
    pub fn fail_on(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    pub fn set_capacity(&self, total: u64, used: u64) {
        *self.capacity.lock().unwrap() = (total, used);
    }

    /// Hold every subsequent copy until the returned semaphore gets a
    /// permit. Each copy consumes one permit.
    pub fn gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Number of copies that started.
    pub fn copies(&self) -> usize {
        self.copies.load(Ordering::SeqCst)
    }

    fn current_gate(&self) -> Option<Arc<Semaphore>> {
        self.gate.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    fn provider_type(&self) -> &str {
        "memory"
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let tree = self.tree.lock().unwrap();
        Ok(tree.files.contains_key(path) || tree.dirs.contains(path))
    }

    async fn metadata(&self, path: &str) -> AppResult<StorageObjectMeta> {
        let tree = self.tree.lock().unwrap();
        if let Some(size) = tree.files.get(path) {
            return Ok(StorageObjectMeta {
                path: path.to_string(),
                size_bytes: *size,
                last_modified: None,
                is_directory: false,
            });
        }
        if tree.dirs.contains(path) {
            return Ok(StorageObjectMeta {
                path: path.to_string(),
                size_bytes: tree.under(path).map(|(_, size)| size).sum(),
                last_modified: None,
                is_directory: true,
            });
        }
        Err(AppError::not_found(format!("Path not found: {path}")))
    }

    async fn copy(&self, from: &str, to: &str) -> AppResult<u64> {
        self.copies.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = self.current_gate() {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if self.failing.lock().unwrap().contains(from) {
            return Err(AppError::storage(format!("Failed to copy: {from}")));
        }

        let mut tree = self.tree.lock().unwrap();
        if let Some(size) = tree.files.get(from).copied() {
            tree.files.insert(to.to_string(), size);
            return Ok(size);
        }
        if tree.dirs.contains(from) {
            let copied: Vec<(String, u64)> = tree
                .under(from)
                .map(|(path, size)| (format!("{to}{}", &path[from.len()..]), *size))
                .collect();
            let total: u64 = copied.iter().map(|(_, size)| size).sum();
            tree.dirs.insert(to.to_string());
            tree.files.extend(copied);
            return Ok(total);
        }
        Err(AppError::not_found(format!("Path not found: {from}")))
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let mut tree = self.tree.lock().unwrap();
        tree.files.remove(path);
        let prefix = format!("{path}/");
        tree.files.retain(|p, _| !p.starts_with(&prefix));
        tree.dirs.retain(|d| d != path && !d.starts_with(&prefix));
        Ok(())
    }

    async fn create_dir(&self, path: &str) -> AppResult<()> {
        self.add_dir(path);
        Ok(())
    }

    async fn capacity(&self) -> AppResult<(u64, u64)> {
        Ok(*self.capacity.lock().unwrap())
    }
}

// ── Archives ─────────────────────────────────────────────────────

/// Archive provider over [`MemoryStorage`]. A sealed archive becomes a
/// file whose size is the sum of what was written into it.
#[derive(Debug)]
pub struct MemoryArchives {
    storage: Arc<MemoryStorage>,
    fail: AtomicBool,
    created: AtomicUsize,
    closed: AtomicUsize,
    sealed: Mutex<Vec<(String, Vec<String>)>>,
}

impl MemoryArchives {
    pub fn new(storage: Arc<MemoryStorage>) -> Arc<Self> {
        Arc::new(Self {
            storage,
            fail: AtomicBool::new(false),
            created: AtomicUsize::new(0),
            closed: AtomicUsize::new(0),
            sealed: Mutex::new(Vec::new()),
        })
    }

    /// Make every subsequent archive creation fail.
    pub fn fail_creation(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sealed archives with the entry names they contain.
    pub fn sealed(&self) -> Vec<(String, Vec<String>)> {
        self.sealed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveProvider for MemoryArchives {
    async fn create_archive(&self, parent: &str, name: &str) -> AppResult<ArchiveHandle> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::archive("Archive backend unavailable"));
        }
        if !self.storage.has_dir(parent) {
            return Err(AppError::archive(format!(
                "Archive parent is not a directory: {parent}"
            )));
        }

        let handle = ArchiveHandle {
            archive_path: format!("{parent}/{name}"),
            root: format!("{parent}/.{name}.staging"),
        };
        self.storage.add_file(&handle.archive_path, 0);
        self.storage.add_dir(&handle.root);
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    async fn close_archive(&self, handle: &ArchiveHandle) -> AppResult<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);

        let (entries, size) = {
            let tree = self.storage.tree.lock().unwrap();
            let prefix = format!("{}/", handle.root);
            let entries: Vec<String> = tree
                .under(&handle.root)
                .map(|(path, _)| path[prefix.len()..].to_string())
                .collect();
            let size: u64 = tree.under(&handle.root).map(|(_, size)| size).sum();
            (entries, size)
        };

        self.storage.delete(&handle.root).await?;
        self.storage.add_file(&handle.archive_path, size);
        self.sealed
            .lock()
            .unwrap()
            .push((handle.archive_path.clone(), entries));
        Ok(())
    }
}

// ── Notifier ─────────────────────────────────────────────────────

/// One call made to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    Show(JobId, NotificationView),
    Dismiss(JobId),
}

/// Notifier that records every call and tracks what is visible.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    calls: Mutex<Vec<NotifierCall>>,
    visible: Mutex<BTreeMap<JobId, NotificationView>>,
}

impl RecordingNotifier {
    pub fn calls_for(&self, id: &str) -> Vec<NotifierCall> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| match call {
                NotifierCall::Show(job_id, _) | NotifierCall::Dismiss(job_id) => {
                    job_id.as_str() == id
                }
            })
            .cloned()
            .collect()
    }

    pub fn dismissals(&self, id: &str) -> usize {
        self.calls_for(id)
            .iter()
            .filter(|call| matches!(call, NotifierCall::Dismiss(_)))
            .count()
    }

    /// The view currently shown for `id`.
    pub fn visible(&self, id: &str) -> Option<NotificationView> {
        self.visible.lock().unwrap().get(id).cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, job_id: &JobId, view: NotificationView) {
        self.calls
            .lock()
            .unwrap()
            .push(NotifierCall::Show(job_id.clone(), view.clone()));
        self.visible.lock().unwrap().insert(job_id.clone(), view);
    }

    fn dismiss(&self, job_id: &JobId) {
        self.calls
            .lock()
            .unwrap()
            .push(NotifierCall::Dismiss(job_id.clone()));
        let mut visible = self.visible.lock().unwrap();
        if visible.get(job_id).is_some_and(NotificationView::is_ongoing) {
            visible.remove(job_id);
        }
    }
}

// ── Host ─────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FakeWakeLock {
    held: AtomicBool,
}

impl WakeLock for FakeWakeLock {
    fn acquire(&self) {
        assert!(
            !self.held.swap(true, Ordering::SeqCst),
            "wake lock acquired twice"
        );
    }

    fn release(&self) {
        assert!(
            self.held.swap(false, Ordering::SeqCst),
            "wake lock released while not held"
        );
    }

    fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }
}

/// Host that records wake locks and stop requests.
#[derive(Debug)]
pub struct FakeHost {
    locks: Mutex<Vec<Arc<FakeWakeLock>>>,
    stops: Mutex<Vec<u64>>,
    will_stop: AtomicBool,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            locks: Mutex::new(Vec::new()),
            stops: Mutex::new(Vec::new()),
            will_stop: AtomicBool::new(true),
        })
    }

    /// Make the host refuse (or accept) stop requests.
    pub fn set_will_stop(&self, will_stop: bool) {
        self.will_stop.store(will_stop, Ordering::SeqCst);
    }

    /// Start tokens passed to `stop_self`, in order.
    pub fn stop_requests(&self) -> Vec<u64> {
        self.stops.lock().unwrap().clone()
    }

    /// Number of wake locks ever created.
    pub fn locks_created(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    /// Whether any wake lock is currently held.
    pub fn any_lock_held(&self) -> bool {
        self.locks.lock().unwrap().iter().any(|l| l.is_held())
    }
}

impl HostRuntime for FakeHost {
    fn new_wake_lock(&self, _tag: &str) -> Arc<dyn WakeLock> {
        let lock = Arc::new(FakeWakeLock::default());
        self.locks.lock().unwrap().push(Arc::clone(&lock));
        lock
    }

    fn stop_self(&self, start_token: u64) -> bool {
        self.stops.lock().unwrap().push(start_token);
        self.will_stop.load(Ordering::SeqCst)
    }
}

// ── Harness ──────────────────────────────────────────────────────

/// A service wired to in-memory collaborators, subscribed to its events
/// from construction on.
pub struct Harness {
    pub service: FileOperationService,
    pub storage: Arc<MemoryStorage>,
    pub archives: Arc<MemoryArchives>,
    pub notifier: Arc<RecordingNotifier>,
    pub host: Arc<FakeHost>,
    events: broadcast::Receiver<JobEvent>,
    backlog: Vec<JobEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(WorkerConfig::default())
    }

    pub fn with_config(config: WorkerConfig) -> Self {
        let storage = MemoryStorage::new();
        let archives = MemoryArchives::new(Arc::clone(&storage));
        let notifier = Arc::new(RecordingNotifier::default());
        let host = FakeHost::new();

        let factory = Arc::new(DefaultJobFactory::new(
            storage.clone(),
            archives.clone(),
            "archive.zip",
        ));
        let service =
            FileOperationService::new(config, factory, host.clone(), notifier.clone());
        let events = service.subscribe();

        Self {
            service,
            storage,
            archives,
            notifier,
            host,
            events,
            backlog: Vec::new(),
        }
    }

    /// Seed a source directory `src` with `names`, each `size` bytes, and
    /// an empty destination directory `dest`.
    pub fn seed(&self, names: &[&str], size: u64) -> Vec<String> {
        self.storage.add_dir("src");
        self.storage.add_dir("dest");
        names
            .iter()
            .map(|name| {
                let path = format!("src/{name}");
                self.storage.add_file(&path, size);
                path
            })
            .collect()
    }

    pub fn request(&self, id: &str, kind: &str, sources: Vec<String>) -> OperationRequest {
        OperationRequest::new(id, kind, sources, "dest")
    }

    /// Next event for `id`, buffering events of other jobs.
    pub async fn next_event(&mut self, id: &str) -> JobEvent {
        if let Some(pos) = self.backlog.iter().position(|e| e.job_id().as_str() == id) {
            return self.backlog.remove(pos);
        }
        loop {
            let event = tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
                .await
                .unwrap_or_else(|_| panic!("timed out waiting for an event of '{id}'"))
                .expect("event channel closed or lagged");
            if event.job_id().as_str() == id {
                return event;
            }
            self.backlog.push(event);
        }
    }

    /// Every event of `id` up to and including `Finished`.
    pub async fn events_until_finished(&mut self, id: &str) -> Vec<JobEvent> {
        let mut events = Vec::new();
        loop {
            let event = self.next_event(id).await;
            let done = matches!(event, JobEvent::Finished { .. });
            events.push(event);
            if done {
                return events;
            }
        }
    }
}

/// Short names of `events`, e.g. `["started", "progress", "finished"]`.
pub fn names(events: &[JobEvent]) -> Vec<&'static str> {
    events.iter().map(JobEvent::name).collect()
}
