//! Failure injection for the mock backend

use std::collections::HashMap;
use std::time::Duration;

use docking_protocol::ErrorCode;

/// What an injected failure does to a call
#[derive(Debug, Clone, Default)]
pub struct FailureConfig {
    /// Reply with this error instead of running the operation
    pub error_code: Option<ErrorCode>,
    pub error_message: Option<String>,
    /// Sleep before replying; the operation still runs unless `error_code` is set
    pub delay: Option<Duration>,
    /// Calls affected before the operation behaves normally again (None = every call)
    pub fail_count: Option<u32>,
    /// Attached to the error as `retry_after_seconds`
    pub retry_after_seconds: Option<u32>,
}

impl FailureConfig {
    /// Fail with `code`
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn busy(retry_after_seconds: u32) -> Self {
        Self {
            error_code: Some(ErrorCode::Busy),
            error_message: Some("no free docking slots".to_string()),
            retry_after_seconds: Some(retry_after_seconds),
            ..Self::default()
        }
    }

    /// Slow backend
    pub fn delay(duration: Duration) -> Self {
        Self {
            delay: Some(duration),
            ..Self::default()
        }
    }

    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    pub fn with_delay(mut self, duration: Duration) -> Self {
        self.delay = Some(duration);
        self
    }
}

/// A failure waiting to fire, with its remaining budget
#[derive(Debug, Clone)]
struct Armed {
    config: FailureConfig,
    /// `None` fires on every call
    remaining: Option<u32>,
}

/// Failures armed per operation name
#[derive(Debug, Default)]
pub struct FailureInjector {
    armed: HashMap<String, Armed>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `config` for `op`, replacing whatever was armed before
    pub fn inject(&mut self, op: &str, config: FailureConfig) {
        let remaining = config.fail_count;
        self.armed.insert(op.to_string(), Armed { config, remaining });
    }

    pub fn clear(&mut self) {
        self.armed.clear();
    }

    /// Failure for this call of `op`, if one is armed and not used up
    pub fn check(&mut self, op: &str) -> Option<FailureConfig> {
        let armed = self.armed.get_mut(op)?;
        match armed.remaining.as_mut() {
            None => Some(armed.config.clone()),
            Some(0) => None,
            Some(left) => {
                *left -= 1;
                Some(armed.config.clone())
            }
        }
    }
}
