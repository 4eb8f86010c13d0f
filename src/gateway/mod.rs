//! Submission gateway
//!
//! Hands a [`JobDescriptor`] to a compute [`Backend`] and turns the reply
//! into a [`JobHandle`] or a [`SubmissionError`]. One successful call creates
//! exactly one backend job; the gateway never retries on its own.

mod cancel;
mod transport;

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use docking_protocol::ops::names;
use docking_protocol::{
    ErrorCode, JobState, RpcRequest, RpcResponse, StatusRequest, StatusResponse, SubmitRequest,
    SubmitResponse,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::job::{generate_request_id, JobDescriptor};

pub use cancel::{CancelReason, CancellationToken, SignalAction, EXIT_CODE_CANCELLED};
pub use transport::{Backend, CommandBackend, TransportError};

/// Exit code when the backend could not take the job
pub const EXIT_CODE_UNAVAILABLE: i32 = 20;

/// Exit code when the backend refused the job
pub const EXIT_CODE_REJECTED: i32 = 30;

/// How often an outstanding call checks its cancellation token
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Reference to an accepted job
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobHandle {
    pub job_id: String,
    pub backend_job_id: String,
    pub state: JobState,
    pub accepted_at: DateTime<Utc>,
    /// The backend already had this job; nothing new was created
    pub existing: bool,
}

/// Why a submission did not produce a job
#[derive(Debug, Clone, Error)]
pub enum SubmissionError {
    #[error("backend unavailable: {reason}")]
    BackendUnavailable {
        reason: String,
        retry_after_seconds: Option<u32>,
    },

    #[error("backend rejected the job ({code}): {message}")]
    Rejected { code: ErrorCode, message: String },

    #[error("submission cancelled: {reason}")]
    Cancelled { reason: CancelReason },

    #[error("descriptor could not be encoded: {0}")]
    Encoding(String),

    #[error("malformed backend reply: {0}")]
    Protocol(String),
}

impl SubmissionError {
    /// Whether resubmitting the same descriptor later may succeed
    pub fn retryable(&self) -> bool {
        match self {
            SubmissionError::BackendUnavailable { .. } | SubmissionError::Cancelled { .. } => true,
            SubmissionError::Rejected { .. }
            | SubmissionError::Encoding(_)
            | SubmissionError::Protocol(_) => false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            SubmissionError::BackendUnavailable { .. } | SubmissionError::Protocol(_) => {
                EXIT_CODE_UNAVAILABLE
            }
            SubmissionError::Rejected { .. } | SubmissionError::Encoding(_) => EXIT_CODE_REJECTED,
            SubmissionError::Cancelled { .. } => EXIT_CODE_CANCELLED,
        }
    }
}

impl From<TransportError> for SubmissionError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unreachable(reason) => SubmissionError::BackendUnavailable {
                reason,
                retry_after_seconds: None,
            },
            TransportError::Io(e) => SubmissionError::BackendUnavailable {
                reason: e.to_string(),
                retry_after_seconds: None,
            },
            TransportError::Serialization(e) => SubmissionError::Encoding(e.to_string()),
            TransportError::Protocol(msg) => SubmissionError::Protocol(msg),
        }
    }
}

/// Gateway to one compute backend
#[derive(Clone)]
pub struct SubmissionGateway {
    backend: Arc<dyn Backend>,
    poll_interval: Duration,
}

impl SubmissionGateway {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Submit without a cancellation token
    pub fn submit(&self, descriptor: &JobDescriptor) -> Result<JobHandle, SubmissionError> {
        self.submit_until(descriptor, &CancellationToken::new())
    }

    /// Submit, giving up as soon as `token` fires.
    ///
    /// On cancellation the backend call is abandoned on its helper thread;
    /// the backend may still create the job, and resubmitting the same
    /// descriptor picks it up idempotently.
    pub fn submit_until(
        &self,
        descriptor: &JobDescriptor,
        token: &CancellationToken,
    ) -> Result<JobHandle, SubmissionError> {
        if let Some(reason) = token.reason() {
            return Err(SubmissionError::Cancelled { reason });
        }

        let job_key = descriptor
            .job_key()
            .map_err(|e| SubmissionError::Encoding(e.to_string()))?;
        let payload = SubmitRequest {
            job_id: descriptor.job_id().to_string(),
            job_key,
            descriptor: descriptor
                .to_value()
                .map_err(|e| SubmissionError::Encoding(e.to_string()))?,
        };
        let request = RpcRequest::new(names::SUBMIT, generate_request_id(), &payload)
            .map_err(|e| SubmissionError::Encoding(e.to_string()))?;

        log::info!(
            "submitting job {} (schema '{}') as request {}",
            descriptor.job_id(),
            descriptor.schema_id(),
            request.request_id
        );

        let response = self.call_until(request, token)?;
        let ack: SubmitResponse = decode_payload(response)?;
        if ack.job_id != descriptor.job_id() {
            return Err(SubmissionError::Protocol(format!(
                "backend acknowledged job '{}' for submission of '{}'",
                ack.job_id,
                descriptor.job_id()
            )));
        }

        log::info!(
            "job {} accepted as {} ({}{})",
            ack.job_id,
            ack.backend_job_id,
            ack.state,
            if ack.existing { ", existing" } else { "" }
        );
        Ok(JobHandle {
            job_id: ack.job_id,
            backend_job_id: ack.backend_job_id,
            state: ack.state,
            accepted_at: ack.accepted_at,
            existing: ack.existing,
        })
    }

    /// Current backend state of a submitted job
    pub fn status(&self, handle: &JobHandle) -> Result<StatusResponse, SubmissionError> {
        self.status_of(&handle.job_id)
    }

    pub fn status_of(&self, job_id: &str) -> Result<StatusResponse, SubmissionError> {
        let request = RpcRequest::new(
            names::STATUS,
            generate_request_id(),
            &StatusRequest {
                job_id: job_id.to_string(),
            },
        )
        .map_err(|e| SubmissionError::Encoding(e.to_string()))?;

        let response = self.backend.execute(&request)?;
        if !response.answers(&request.request_id) {
            return Err(SubmissionError::Protocol(format!(
                "status reply for request '{}'",
                response.request_id
            )));
        }
        decode_payload(response)
    }

    /// Run the backend call on a helper thread and poll `token` meanwhile
    fn call_until(
        &self,
        request: RpcRequest,
        token: &CancellationToken,
    ) -> Result<RpcResponse, SubmissionError> {
        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        let request_id = request.request_id.clone();

        thread::Builder::new()
            .name(format!("submit-{request_id}"))
            .spawn(move || {
                // Receiver may be gone after cancellation
                let _ = tx.send(backend.execute(&request));
            })
            .map_err(|e| SubmissionError::BackendUnavailable {
                reason: format!("cannot start backend call: {e}"),
                retry_after_seconds: None,
            })?;

        loop {
            match rx.recv_timeout(self.poll_interval) {
                Ok(result) => {
                    let response = result?;
                    if !response.answers(&request_id) {
                        return Err(SubmissionError::Protocol(format!(
                            "reply for request '{}' while waiting for '{request_id}'",
                            response.request_id
                        )));
                    }
                    return Ok(response);
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(reason) = token.reason() {
                        log::warn!("request {request_id} abandoned: {reason}");
                        return Err(SubmissionError::Cancelled { reason });
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SubmissionError::BackendUnavailable {
                        reason: "backend call ended without a reply".to_string(),
                        retry_after_seconds: None,
                    })
                }
            }
        }
    }
}

/// Map an error reply to a [`SubmissionError`] or decode the success payload
fn decode_payload<T: DeserializeOwned>(response: RpcResponse) -> Result<T, SubmissionError> {
    if !response.ok {
        let Some(error) = response.error else {
            return Err(SubmissionError::Protocol(
                "error reply without error details".to_string(),
            ));
        };
        return Err(if error.code.is_transient() {
            SubmissionError::BackendUnavailable {
                retry_after_seconds: error.retry_after_seconds(),
                reason: error.to_string(),
            }
        } else {
            SubmissionError::Rejected {
                code: error.code,
                message: error.message,
            }
        });
    }

    let payload = response
        .payload
        .ok_or_else(|| SubmissionError::Protocol("success reply without payload".to_string()))?;
    serde_json::from_value(payload).map_err(|e| SubmissionError::Protocol(e.to_string()))
}
