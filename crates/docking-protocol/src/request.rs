//! Request envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RpcError;

/// Request envelope.
///
/// Every backend operation accepts a single JSON request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    /// Protocol version spoken by the caller.
    pub protocol_version: i32,
    /// Operation name (see [`crate::ops::names`]).
    pub op: String,
    /// Caller-chosen request ID for correlation.
    pub request_id: String,
    /// Operation-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Failure decoding an operation payload.
#[derive(Debug, thiserror::Error)]
#[error("invalid {op} payload: {source}")]
pub struct PayloadError {
    /// Operation whose payload failed to decode.
    pub op: String,
    #[source]
    source: serde_json::Error,
}

impl PayloadError {
    /// Convert to an INVALID_REQUEST wire error.
    pub fn to_rpc_error(&self) -> RpcError {
        RpcError::invalid_request(self.to_string())
    }
}

impl RpcRequest {
    /// Build a request around a typed payload.
    pub fn new<T: Serialize>(
        op: &str,
        request_id: impl Into<String>,
        payload: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            protocol_version: crate::PROTOCOL_VERSION,
            op: op.to_string(),
            request_id: request_id.into(),
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Decode the payload into an operation-specific type.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        serde_json::from_value(self.payload.clone()).map_err(|source| PayloadError {
            op: self.op.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{names, StatusRequest};

    #[test]
    fn test_request_parsing() {
        let json = r#"{
            "protocol_version": 1,
            "op": "status",
            "request_id": "req-001",
            "payload": {"job_id": "job-1"}
        }"#;

        let req: RpcRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.op, names::STATUS);
        let status: StatusRequest = req.payload_as().unwrap();
        assert_eq!(status.job_id, "job-1");
    }

    #[test]
    fn test_payload_defaults_to_null() {
        let json = r#"{"protocol_version": 1, "op": "status", "request_id": "r"}"#;
        let req: RpcRequest = serde_json::from_str(json).unwrap();
        assert!(req.payload.is_null());

        let err = req.payload_as::<StatusRequest>().unwrap_err();
        assert!(err.to_string().starts_with("invalid status payload"));
        assert_eq!(err.to_rpc_error().code, crate::ErrorCode::InvalidRequest);
    }
}
