//! Structured requests accepted by the file operation service.

use serde::{Deserialize, Serialize};

use filehub_core::error::{AppError, ErrorKind};
use filehub_core::result::AppResult;
use filehub_core::types::JobId;

/// Request to cancel a live job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CancelRequest {
    /// Job to cancel.
    pub job_id: JobId,
    /// Must be `true`.
    pub cancel: bool,
}

impl CancelRequest {
    /// Cancel `job_id`.
    pub fn new(job_id: impl Into<JobId>) -> Self {
        Self {
            job_id: job_id.into(),
            cancel: true,
        }
    }
}

/// Request to start a file operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRequest {
    /// Caller-chosen identity, unique among live jobs.
    pub job_id: JobId,
    /// `copy`, `move`, `delete` or `compress`.
    pub operation_kind: String,
    /// Start delay. The service default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_millis: Option<u64>,
    /// Storage paths of the items to process.
    #[serde(default)]
    pub sources: Vec<String>,
    /// Directory the items go to.
    pub destination: String,
}

impl OperationRequest {
    /// Start `operation_kind` over `sources` into `destination`.
    pub fn new(
        job_id: impl Into<JobId>,
        operation_kind: impl Into<String>,
        sources: Vec<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            operation_kind: operation_kind.into(),
            delay_millis: None,
            sources,
            destination: destination.into(),
        }
    }

    /// Set the start delay.
    pub fn with_delay(mut self, delay_millis: u64) -> Self {
        self.delay_millis = Some(delay_millis);
        self
    }
}

/// Any request the service accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Request {
    /// Cancel a job.
    Cancel(CancelRequest),
    /// Start a job.
    Operation(OperationRequest),
}

impl Request {
    /// Parse a request from its JSON form.
    pub fn parse(input: &str) -> AppResult<Self> {
        serde_json::from_str(input.trim()).map_err(|e| {
            AppError::with_source(ErrorKind::Validation, format!("Malformed request: {e}"), e)
        })
    }

    /// Id of the job the request targets.
    pub fn job_id(&self) -> &JobId {
        match self {
            Self::Cancel(r) => &r.job_id,
            Self::Operation(r) => &r.job_id,
        }
    }
}

impl From<CancelRequest> for Request {
    fn from(request: CancelRequest) -> Self {
        Self::Cancel(request)
    }
}

impl From<OperationRequest> for Request {
    fn from(request: OperationRequest) -> Self {
        Self::Operation(request)
    }
}
