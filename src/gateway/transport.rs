//! Backend transport
//!
//! Abstracts the compute backend connection for testability:
//! - [`Backend`] trait: one request in, one response out
//! - [`CommandBackend`]: spawns a backend command per request
//! - `MockBackend` (in [`crate::mock`]): in-process backend for tests

use std::io::{self, Write};
use std::process::{Command, Stdio};

use docking_protocol::{RpcRequest, RpcResponse};

/// A compute backend reachable over the JSON envelope protocol
pub trait Backend: Send + Sync {
    /// Execute a request and return the response
    fn execute(&self, request: &RpcRequest) -> Result<RpcResponse, TransportError>;
}

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Backend reached by running a command.
///
/// Format: single JSON request on stdin, single JSON response on stdout.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    program: String,
    args: Vec<String>,
}

impl CommandBackend {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from an argv list such as `["ssh", "host", "docking-worker", "rpc"]`
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Backend for CommandBackend {
    fn execute(&self, request: &RpcRequest) -> Result<RpcResponse, TransportError> {
        let request_json = serde_json::to_string(request)?;
        log::debug!("-> {} {}: {}", self.program, request.op, request.request_id);

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TransportError::Unreachable(format!("failed to spawn {}: {}", self.program, e))
            })?;

        if let Some(ref mut stdin) = child.stdin {
            writeln!(stdin, "{}", request_json)?;
        }

        let output = child.wait_with_output().map_err(|e| {
            TransportError::Unreachable(format!("{} process error: {}", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TransportError::Unreachable(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let response: RpcResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| TransportError::Protocol(format!("invalid response JSON: {}", e)))?;
        log::debug!("<- {} ok={}", response.request_id, response.ok);

        Ok(response)
    }
}
