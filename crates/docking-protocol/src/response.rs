//! Response envelope.

use serde::{Deserialize, Serialize};

use crate::error::RpcError;
use crate::request::RpcRequest;

/// Backend reply to one [`RpcRequest`].
///
/// Exactly one of `payload` and `error` is set, matching `ok`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub protocol_version: i32,
    /// Copied from the request this answers.
    pub request_id: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// Successful reply to `request`.
    pub fn success(request: &RpcRequest, payload: serde_json::Value) -> Self {
        Self {
            protocol_version: request.protocol_version,
            request_id: request.request_id.clone(),
            ok: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// Error reply to `request`.
    pub fn error(request: &RpcRequest, error: RpcError) -> Self {
        Self {
            protocol_version: request.protocol_version,
            request_id: request.request_id.clone(),
            ok: false,
            payload: None,
            error: Some(error),
        }
    }

    /// Whether this reply belongs to the request with `request_id`.
    pub fn answers(&self, request_id: &str) -> bool {
        self.request_id == request_id
    }
}
