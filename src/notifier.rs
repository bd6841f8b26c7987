//! Notifier writing JSON lines to stdout.

use std::io::Write;

use serde::Serialize;

use filehub_core::traits::notifier::{NotificationView, Notifier};
use filehub_core::types::JobId;

#[derive(Debug, Serialize)]
#[serde(tag = "notification", rename_all = "snake_case")]
enum NotificationLine<'a> {
    Show {
        job_id: &'a JobId,
        #[serde(flatten)]
        view: NotificationView,
    },
    Dismiss {
        job_id: &'a JobId,
    },
}

/// Prints every notification as one JSON object per line.
#[derive(Debug, Default)]
pub struct JsonLinesNotifier;

impl Notifier for JsonLinesNotifier {
    fn show(&self, job_id: &JobId, view: NotificationView) {
        print_line(&NotificationLine::Show { job_id, view });
    }

    fn dismiss(&self, job_id: &JobId) {
        print_line(&NotificationLine::Dismiss { job_id });
    }
}

/// Write `value` as a single JSON line to stdout.
pub fn print_line<T: Serialize>(value: &T) {
    match serde_json::to_string(value) {
        Ok(line) => {
            let mut out = std::io::stdout().lock();
            if let Err(e) = writeln!(out, "{}", line) {
                tracing::warn!("Failed to write output line: {}", e);
            }
        }
        Err(e) => tracing::error!("Failed to serialize output line: {}", e),
    }
}
