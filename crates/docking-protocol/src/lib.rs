//! Docking backend protocol types
//!
//! Defines the JSON envelope exchanged between the submission gateway and a
//! compute backend: one JSON request in, one JSON response out.

pub mod error;
pub mod ops;
pub mod request;
pub mod response;

pub use error::{ErrorCode, RpcError};
pub use ops::{JobState, StatusRequest, StatusResponse, SubmitRequest, SubmitResponse};
pub use request::{PayloadError, RpcRequest};
pub use response::RpcResponse;

/// Protocol version spoken by this implementation.
pub const PROTOCOL_VERSION: i32 = 1;
