//! Mock compute backend
//!
//! In-process backend speaking the docking envelope protocol, used by tests
//! and by the CLI's `mock` backend kind. Supports failure injection for
//! exercising the gateway's error paths.
//!
//! # Operations
//!
//! - `submit`: Accept a descriptor, verify its job_key, track state
//! - `status`: Return job state

mod backend;
mod failure;
mod state;

pub use backend::MockBackend;
pub use failure::{FailureConfig, FailureInjector};
pub use state::{JobLedger, MockJob, StateChange};
