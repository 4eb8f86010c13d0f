//! Error types for the backend protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes returned in backend error responses.
///
/// These codes are stable and used for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed JSON, missing required fields, or invalid field values.
    InvalidRequest,
    /// Protocol version is not spoken by the backend.
    UnsupportedProtocol,
    /// Unknown operation requested.
    UnknownOperation,
    /// Backend is at capacity; retry after the specified delay.
    Busy,
    /// Backend cannot accept work right now (maintenance, draining).
    Unavailable,
    /// Backend refuses the job for its own reasons.
    Rejected,
    /// Job not found.
    JobNotFound,
    /// Job id already exists with a different job_key.
    JobKeyMismatch,
    /// Backend abandoned the submission because it was cancelled.
    Cancelled,
}

impl ErrorCode {
    /// Whether a caller may retry the same request later without changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy | Self::Unavailable)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "INVALID_REQUEST"),
            Self::UnsupportedProtocol => write!(f, "UNSUPPORTED_PROTOCOL"),
            Self::UnknownOperation => write!(f, "UNKNOWN_OPERATION"),
            Self::Busy => write!(f, "BUSY"),
            Self::Unavailable => write!(f, "UNAVAILABLE"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::JobNotFound => write!(f, "JOB_NOT_FOUND"),
            Self::JobKeyMismatch => write!(f, "JOB_KEY_MISMATCH"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Backend error response payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code from the registry.
    pub code: ErrorCode,
    /// Human-readable, single-line error message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new error with additional data.
    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an INVALID_REQUEST error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Create an UNSUPPORTED_PROTOCOL error.
    pub fn unsupported_protocol(version: i32, supported: i32) -> Self {
        Self::with_data(
            ErrorCode::UnsupportedProtocol,
            format!("protocol_version {} is not supported (expected {})", version, supported),
            serde_json::json!({ "requested": version, "supported": supported }),
        )
    }

    /// Create an UNKNOWN_OPERATION error.
    pub fn unknown_operation(op: &str) -> Self {
        Self::with_data(
            ErrorCode::UnknownOperation,
            format!("unknown operation: {}", op),
            serde_json::json!({ "op": op }),
        )
    }

    /// Create a BUSY error with retry information.
    pub fn busy(retry_after_seconds: u32) -> Self {
        Self::with_data(
            ErrorCode::Busy,
            format!("backend is at capacity, retry after {} seconds", retry_after_seconds),
            serde_json::json!({ "retry_after_seconds": retry_after_seconds }),
        )
    }

    /// Create a JOB_NOT_FOUND error.
    pub fn job_not_found(job_id: &str) -> Self {
        Self::with_data(
            ErrorCode::JobNotFound,
            format!("job '{}' not found", job_id),
            serde_json::json!({ "job_id": job_id }),
        )
    }

    /// Create a JOB_KEY_MISMATCH error.
    pub fn job_key_mismatch(job_id: &str, expected: &str, actual: &str) -> Self {
        Self::with_data(
            ErrorCode::JobKeyMismatch,
            format!("job '{}' exists with different job_key", job_id),
            serde_json::json!({
                "job_id": job_id,
                "expected_job_key": expected,
                "actual_job_key": actual
            }),
        )
    }

    /// Seconds the backend asked the caller to wait, if any.
    pub fn retry_after_seconds(&self) -> Option<u32> {
        self.data
            .as_ref()
            .and_then(|d| d.get("retry_after_seconds"))
            .and_then(|v| v.as_u64())
            .and_then(|v| u32::try_from(v).ok())
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}
