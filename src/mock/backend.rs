//! Mock backend implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use docking_protocol::ops::names;
use docking_protocol::{
    ErrorCode, JobState, RpcError, RpcRequest, RpcResponse, StatusRequest, StatusResponse,
    SubmitRequest, SubmitResponse, PROTOCOL_VERSION,
};
use serde::Serialize;

use super::failure::{FailureConfig, FailureInjector};
use super::state::JobLedger;
use crate::gateway::{Backend, TransportError};
use crate::job::JobDescriptor;

/// Seconds a BUSY reply asks the caller to wait
const BUSY_RETRY_AFTER_SECONDS: u32 = 5;

/// Configurable in-process backend
///
/// Clones share state, so a test can keep one clone for inspection while
/// the gateway owns another.
#[derive(Debug, Clone)]
pub struct MockBackend {
    ledger: Arc<Mutex<JobLedger>>,
    failures: Arc<Mutex<FailureInjector>>,
    reachable: Arc<AtomicBool>,
    /// Max non-terminal jobs before BUSY (None = unlimited)
    capacity: Arc<Mutex<Option<usize>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(Mutex::new(JobLedger::new())),
            failures: Arc::new(Mutex::new(FailureInjector::new())),
            reachable: Arc::new(AtomicBool::new(true)),
            capacity: Arc::new(Mutex::new(None)),
        }
    }

    // === Test configuration ===

    /// Simulate a backend that cannot be reached at all
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Limit concurrent (non-terminal) jobs; further submits get BUSY
    pub fn set_capacity(&self, max_jobs: Option<usize>) {
        *lock(&self.capacity) = max_jobs;
    }

    pub fn inject_error(&self, op: &str, code: ErrorCode, message: &str) {
        self.inject_failure(op, FailureConfig::error(code, message));
    }

    pub fn inject_failure(&self, op: &str, config: FailureConfig) {
        lock(&self.failures).inject(op, config);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    // === Inspection ===

    /// Number of jobs ever created
    pub fn job_count(&self) -> usize {
        lock(&self.ledger).len()
    }

    pub fn get_job_state(&self, job_id: &str) -> Option<JobState> {
        lock(&self.ledger).lookup(job_id).map(|job| job.state())
    }

    /// Move a job to another state, as a scheduler would.
    ///
    /// Returns false for unknown or already finished jobs.
    pub fn set_job_state(&self, job_id: &str, new_state: JobState) -> bool {
        lock(&self.ledger).advance(job_id, new_state)
    }

    /// Descriptor the backend received for a job
    pub fn submitted_descriptor(&self, job_id: &str) -> Option<JobDescriptor> {
        lock(&self.ledger).lookup(job_id).map(|job| job.descriptor.clone())
    }

    // === Request handling ===

    /// Handle a request in-process
    pub fn handle_request(&self, request: &RpcRequest) -> RpcResponse {
        let injected = lock(&self.failures).check(&request.op);
        if let Some(failure) = injected {
            if let Some(delay) = failure.delay {
                thread::sleep(delay);
            }
            if let Some(code) = failure.error_code {
                return self.failure_response(request, code, failure);
            }
        }

        if request.protocol_version != PROTOCOL_VERSION {
            return error(
                request,
                RpcError::unsupported_protocol(request.protocol_version, PROTOCOL_VERSION),
            );
        }

        match request.op.as_str() {
            names::SUBMIT => self.handle_submit(request),
            names::STATUS => self.handle_status(request),
            other => error(request, RpcError::unknown_operation(other)),
        }
    }

    /// Handle a JSON request string
    pub fn handle_json(&self, json_request: &str) -> Result<String, serde_json::Error> {
        let request: RpcRequest = serde_json::from_str(json_request)?;
        let response = self.handle_request(&request);
        serde_json::to_string(&response)
    }

    fn failure_response(
        &self,
        request: &RpcRequest,
        code: ErrorCode,
        failure: FailureConfig,
    ) -> RpcResponse {
        let message = failure
            .error_message
            .unwrap_or_else(|| "injected failure".to_string());
        let err = match failure.retry_after_seconds {
            Some(retry) => RpcError::with_data(
                code,
                message,
                serde_json::json!({ "retry_after_seconds": retry }),
            ),
            None => RpcError::new(code, message),
        };
        error(request, err)
    }

    fn handle_submit(&self, request: &RpcRequest) -> RpcResponse {
        let submit: SubmitRequest = match request.payload_as() {
            Ok(submit) => submit,
            Err(e) => return error(request, e.to_rpc_error()),
        };

        let descriptor = match JobDescriptor::from_value(submit.descriptor) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                return error(
                    request,
                    RpcError::invalid_request(format!("descriptor does not decode: {e}")),
                )
            }
        };
        if descriptor.job_id() != submit.job_id {
            return error(
                request,
                RpcError::invalid_request("descriptor job_id differs from request job_id"),
            );
        }
        match descriptor.job_key() {
            Ok(key) if key == submit.job_key => {}
            _ => {
                return error(
                    request,
                    RpcError::invalid_request("job_key does not match descriptor"),
                )
            }
        }

        let mut ledger = lock(&self.ledger);

        // Same job_id: idempotent when the key matches
        if let Some(existing) = ledger.lookup(&submit.job_id) {
            if existing.job_key != submit.job_key {
                return error(
                    request,
                    RpcError::job_key_mismatch(&submit.job_id, &existing.job_key, &submit.job_key),
                );
            }
            return success(
                request,
                &SubmitResponse {
                    job_id: existing.job_id.clone(),
                    backend_job_id: existing.backend_job_id.clone(),
                    state: existing.state(),
                    accepted_at: existing.accepted_at(),
                    existing: true,
                },
            );
        }

        if let Some(max_jobs) = *lock(&self.capacity) {
            if ledger.active() >= max_jobs {
                return error(request, RpcError::busy(BUSY_RETRY_AFTER_SECONDS));
            }
        }

        let job = ledger.admit(&submit.job_id, &submit.job_key, descriptor);
        log::debug!("mock backend admitted {} as {}", job.job_id, job.backend_job_id);
        let ack = SubmitResponse {
            job_id: job.job_id.clone(),
            backend_job_id: job.backend_job_id.clone(),
            state: job.state(),
            accepted_at: job.accepted_at(),
            existing: false,
        };

        success(request, &ack)
    }

    fn handle_status(&self, request: &RpcRequest) -> RpcResponse {
        let status: StatusRequest = match request.payload_as() {
            Ok(status) => status,
            Err(e) => return error(request, e.to_rpc_error()),
        };

        let ledger = lock(&self.ledger);
        match ledger.lookup(&status.job_id) {
            Some(job) => success(
                request,
                &StatusResponse {
                    job_id: job.job_id.clone(),
                    state: job.state(),
                    job_key: Some(job.job_key.clone()),
                    updated_at: job.updated_at(),
                },
            ),
            None => error(request, RpcError::job_not_found(&status.job_id)),
        }
    }
}

impl Backend for MockBackend {
    fn execute(&self, request: &RpcRequest) -> Result<RpcResponse, TransportError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(TransportError::Unreachable(
                "mock backend is offline".to_string(),
            ));
        }
        Ok(self.handle_request(request))
    }
}

fn success<T: Serialize>(request: &RpcRequest, payload: &T) -> RpcResponse {
    match serde_json::to_value(payload) {
        Ok(value) => RpcResponse::success(request, value),
        Err(e) => error(
            request,
            RpcError::new(ErrorCode::Unavailable, format!("cannot encode reply: {e}")),
        ),
    }
}

fn error(request: &RpcRequest, err: RpcError) -> RpcResponse {
    RpcResponse::error(request, err)
}
