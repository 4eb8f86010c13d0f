//! Status operation types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use super::submit::JobState;

/// Status request payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    /// The job ID to query.
    pub job_id: String,
}

/// Status response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// The job ID.
    pub job_id: String,
    /// Current job state.
    pub state: JobState,
    /// Job key recorded at submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_key: Option<String>,
    /// Last state change.
    pub updated_at: DateTime<Utc>,
}
