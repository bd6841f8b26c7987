//! FileHub file operations — runs copy, move and compress jobs.
//!
//! Reads one JSON request per line from stdin, writes notifications and
//! lifecycle events as JSON lines to stdout, and logs to stderr. Exits
//! once stdin is closed and every accepted job has left the registry.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, fmt};

use filehub_core::config::AppConfig;
use filehub_core::error::AppError;
use filehub_storage::{LocalStorageProvider, ZipArchiveProvider};
use filehub_worker::{DefaultJobFactory, FileOperationService, Request};

mod host;
mod notifier;

const FORWARDER_FLUSH: Duration = Duration::from_secs(5);

use host::StdioHost;
use notifier::JsonLinesNotifier;

/// FileHub file operation worker
#[derive(Debug, Parser)]
#[command(name = "filehub-fileops", version, about, long_about = None)]
struct Cli {
    /// Configuration environment overlay (`config/<env>.toml`)
    #[arg(short, long, env = "FILEHUB_ENV", default_value = "development")]
    env: String,

    /// Storage root, overriding the configured one
    #[arg(short, long)]
    root: Option<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match AppConfig::load(&cli.env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(root) = cli.root {
        config.storage.root = root;
    }

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("File operation worker error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .with_writer(std::io::stderr)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        "Starting FileHub file operations v{} (root: {}, workers: {})",
        env!("CARGO_PKG_VERSION"),
        config.storage.root,
        config.worker.pool_size
    );

    let storage = Arc::new(LocalStorageProvider::new(&config.storage.root).await?);
    let archives = Arc::new(ZipArchiveProvider::new(storage.root()));
    let factory = Arc::new(DefaultJobFactory::new(
        storage,
        archives,
        config.storage.archive_name.clone(),
    ));
    let host = Arc::new(StdioHost::default());

    let service = FileOperationService::new(
        config.worker.clone(),
        factory,
        host.clone(),
        Arc::new(JsonLinesNotifier),
    );

    let mut events = service.subscribe();
    let mut forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => notifier::print_line(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::error!("Event output lagged, {} event(s) skipped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let request = match Request::parse(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Rejected request: {}", e);
                continue;
            }
        };
        let job_id = request.job_id().clone();
        if let Err(e) = service.handle_request(request) {
            tracing::warn!(job_id = %job_id, "Rejected request: {}", e);
        }
    }

    host.close_input();
    tracing::info!(
        "Input closed, waiting for {} job(s) to finish",
        service.active_jobs()
    );

    let drain = Duration::from_secs(config.worker.drain_timeout_seconds);
    let drained = tokio::time::timeout(drain, service.wait_until_idle())
        .await
        .is_ok();
    if !drained {
        tracing::error!(
            "{} job(s) still running after {}s, exiting",
            service.active_jobs(),
            config.worker.drain_timeout_seconds
        );
    }

    // The event channel closes once the last job task drops the service,
    // and the forwarder prints everything queued before that.
    drop(service);
    if !drained {
        forwarder.abort();
    } else if tokio::time::timeout(FORWARDER_FLUSH, &mut forwarder)
        .await
        .is_err()
    {
        tracing::warn!("Event output did not close in time");
        forwarder.abort();
    }

    tracing::info!("File operation worker stopped");
    Ok(())
}
