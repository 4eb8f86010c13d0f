//! Submit operation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Submit request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    /// Caller-assigned job identifier; resubmitting it is idempotent.
    pub job_id: String,
    /// SHA-256 hex of the canonical parameter set.
    pub job_key: String,
    /// Full job descriptor as produced by the gateway.
    pub descriptor: serde_json::Value,
}

/// Submit response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// The job ID (echoed).
    pub job_id: String,
    /// Backend-side identifier for the created job.
    pub backend_job_id: String,
    /// Initial job state.
    pub state: JobState,
    /// When the backend accepted the job.
    pub accepted_at: DateTime<Utc>,
    /// True when the job already existed and nothing new was created.
    #[serde(default)]
    pub existing: bool,
}

/// Job state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Job is pending execution.
    Queued,
    /// Job is actively executing.
    Running,
    /// Job completed successfully.
    Succeeded,
    /// Job completed with failure.
    Failed,
    /// Job was cancelled.
    Cancelled,
}

impl JobState {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}
