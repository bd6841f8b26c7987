//! Integration tests driving the service with JSON requests over a real
//! local storage root.

mod helpers;

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use filehub_core::config::WorkerConfig;
use filehub_core::error::ErrorKind;
use filehub_core::events::JobEvent;
use filehub_core::types::JobId;
use filehub_storage::{LocalStorageProvider, ZipArchiveProvider};
use filehub_worker::{DefaultJobFactory, FileOperationService, OperationError, Request};

use helpers::{EVENT_TIMEOUT, FakeHost, RecordingNotifier};

struct DiskHarness {
    _dir: tempfile::TempDir,
    root: std::path::PathBuf,
    service: FileOperationService,
    events: tokio::sync::broadcast::Receiver<JobEvent>,
}

impl DiskHarness {
    async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        std::fs::create_dir_all(root.join("src/nested")).unwrap();
        std::fs::create_dir_all(root.join("out")).unwrap();
        std::fs::write(root.join("src/a.txt"), "alpha").unwrap();
        std::fs::write(root.join("src/b.txt"), "bravo!").unwrap();
        std::fs::write(root.join("src/nested/c.txt"), "charlie").unwrap();

        let storage = Arc::new(
            LocalStorageProvider::new(root.to_str().unwrap())
                .await
                .unwrap(),
        );
        let archives = Arc::new(ZipArchiveProvider::new(&root));
        let factory = Arc::new(DefaultJobFactory::new(storage, archives, "archive.zip"));
        let service = FileOperationService::new(
            WorkerConfig::default(),
            factory,
            FakeHost::new(),
            Arc::new(RecordingNotifier::default()),
        );
        let events = service.subscribe();

        Self {
            _dir: dir,
            root,
            service,
            events,
        }
    }

    fn send(&self, json: &str) -> Result<(), OperationError> {
        let request = Request::parse(json).expect("request should parse");
        self.service.handle_request(request)
    }

    async fn finished(&mut self, id: &str) -> Vec<JobEvent> {
        let mut seen = Vec::new();
        loop {
            let event = tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
                .await
                .expect("timed out waiting for events")
                .unwrap();
            if event.job_id().as_str() != id {
                continue;
            }
            let done = matches!(event, JobEvent::Finished { .. });
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.root.join(path)).unwrap()
    }

    fn exists(&self, path: &str) -> bool {
        self.root.join(path).exists()
    }
}

fn zip_entries(path: &Path) -> Vec<(String, String)> {
    let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        entries.push((entry.name().to_string(), contents));
    }
    entries.sort();
    entries
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_copy_request_copies_files_and_directories() {
    let mut h = DiskHarness::new().await;

    h.send(r#"{"jobId":"copy-1","operationKind":"copy","sources":["src/a.txt","src/nested"],"destination":"out"}"#)
        .unwrap();
    let events = h.finished("copy-1").await;

    assert!(matches!(
        events.last(),
        Some(JobEvent::Finished { cancelled: false, .. })
    ));
    assert_eq!(h.read("out/a.txt"), "alpha");
    assert_eq!(h.read("out/nested/c.txt"), "charlie");
    assert!(h.exists("src/a.txt"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_move_request_removes_sources() {
    let mut h = DiskHarness::new().await;

    h.send(r#"{"jobId":"move-1","operationKind":"MOVE","delayMillis":0,"sources":["src/b.txt"],"destination":"out"}"#)
        .unwrap();
    h.finished("move-1").await;

    assert_eq!(h.read("out/b.txt"), "bravo!");
    assert!(!h.exists("src/b.txt"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_compress_request_writes_zip() {
    let mut h = DiskHarness::new().await;

    h.send(r#"{"jobId":"zip-1","operationKind":"compress","sources":["src/a.txt","src/b.txt","src/nested"],"destination":"out"}"#)
        .unwrap();
    let events = h.finished("zip-1").await;

    assert!(!events.iter().any(|e| matches!(e, JobEvent::Failed { .. })));
    assert!(!h.exists("out/.archive.zip.staging"));
    assert_eq!(
        zip_entries(&h.root.join("out/archive.zip")),
        vec![
            ("a.txt".to_string(), "alpha".to_string()),
            ("b.txt".to_string(), "bravo!".to_string()),
            ("nested/c.txt".to_string(), "charlie".to_string()),
        ]
    );
    assert!(h.exists("src/a.txt"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_source_is_reported_as_failed_item() {
    let mut h = DiskHarness::new().await;

    h.send(r#"{"jobId":"miss","operationKind":"copy","sources":["src/a.txt","src/nope.txt"],"destination":"out"}"#)
        .unwrap();
    let events = h.finished("miss").await;

    let failed = events.iter().find_map(|e| match e {
        JobEvent::Failed { failed_items, .. } => Some(failed_items.clone()),
        _ => None,
    });
    assert_eq!(failed, Some(vec!["src/nope.txt".to_string()]));
    assert_eq!(h.read("out/a.txt"), "alpha");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_destination_fails_every_item() {
    let mut h = DiskHarness::new().await;

    h.send(r#"{"jobId":"nodest","operationKind":"copy","sources":["src/a.txt","src/b.txt"],"destination":"absent"}"#)
        .unwrap();
    let events = h.finished("nodest").await;

    let names: Vec<_> = events.iter().map(JobEvent::name).collect();
    assert_eq!(names, ["started", "failed", "finished"]);
    assert!(!h.exists("absent"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_request_rejections() {
    let h = DiskHarness::new().await;

    h.send(r#"{"jobId":"dup","operationKind":"copy","delayMillis":5000,"sources":["src/a.txt"],"destination":"out"}"#)
        .unwrap();
    let err = h
        .send(r#"{"jobId":"dup","operationKind":"copy","sources":[],"destination":"out"}"#)
        .unwrap_err();
    assert!(matches!(err, OperationError::DuplicateJob(_)));

    let err = h
        .send(r#"{"jobId":"x","operationKind":"delete","sources":[],"destination":"out"}"#)
        .unwrap_err();
    assert!(matches!(err, OperationError::Unsupported(_)));

    let err = h
        .send(r#"{"jobId":"x","operationKind":"copy","delayMillis":20000,"destination":"out"}"#)
        .unwrap_err();
    assert!(matches!(err, OperationError::InvalidDelay { .. }));

    let err = h
        .send(r#"{"jobId":"x","cancel":false}"#)
        .unwrap_err();
    assert!(matches!(err, OperationError::InvalidRequest(_)));

    let err = Request::parse(r#"{"operationKind":"copy"}"#).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    h.service.handle_cancel(&JobId::new("dup"));
    assert!(h.service.is_idle());
}
