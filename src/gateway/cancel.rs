//! Cancellation tokens for in-flight submissions
//!
//! A token is shared between the caller (or a Ctrl-C handler) and the
//! gateway. The gateway polls it while the backend call is outstanding.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Exit code for cancelled submissions
pub const EXIT_CODE_CANCELLED: i32 = 80;

/// Why a submission was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Caller asked for it
    User,
    /// SIGINT/SIGTERM
    Signal,
    /// Deadline passed
    Timeout,
}

impl CancelReason {
    fn code(self) -> u8 {
        match self {
            CancelReason::User => 1,
            CancelReason::Signal => 2,
            CancelReason::Timeout => 3,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(CancelReason::User),
            2 => Some(CancelReason::Signal),
            3 => Some(CancelReason::Timeout),
            _ => None,
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::User => write!(f, "cancelled by caller"),
            CancelReason::Signal => write!(f, "interrupted by signal"),
            CancelReason::Timeout => write!(f, "deadline exceeded"),
        }
    }
}

/// Action to take after a signal arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: cancel the outstanding submission
    Cancel,
    /// Second signal: exit now
    ImmediateExit,
    /// Further signals
    Ignore,
}

/// Cloneable cancellation flag with an optional deadline
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<TokenState>,
    deadline: Option<Instant>,
}

#[derive(Debug, Default)]
struct TokenState {
    reason: AtomicU8,
    signal_count: AtomicU8,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that also fires once `timeout` has elapsed.
    ///
    /// The returned token shares the cancel flag with `self`; the deadline
    /// only applies to the returned copy.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        Self {
            state: Arc::clone(&self.state),
            deadline: Some(self.deadline.map_or(deadline, |d| d.min(deadline))),
        }
    }

    /// Cancel; the first reason recorded wins.
    pub fn cancel(&self, reason: CancelReason) {
        let _ = self.state.reason.compare_exchange(
            0,
            reason.code(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
    }

    /// Why the token fired, if it has
    pub fn reason(&self) -> Option<CancelReason> {
        if let Some(reason) = CancelReason::from_code(self.state.reason.load(Ordering::SeqCst)) {
            return Some(reason);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(CancelReason::Timeout),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Time left before the deadline, if one is set
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Record a SIGINT/SIGTERM and decide what to do about it
    pub fn handle_signal(&self) -> SignalAction {
        // Saturates so a signal storm never re-arms Cancel
        let count = self
            .state
            .signal_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_add(1)))
            .unwrap_or_else(|n| n);
        match count {
            0 => {
                self.cancel(CancelReason::Signal);
                SignalAction::Cancel
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fresh_token_not_cancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        assert_eq!(token.remaining(), None);
    }

    #[test]
    fn test_first_reason_wins() {
        let token = CancellationToken::new();
        token.cancel(CancelReason::User);
        token.cancel(CancelReason::Signal);
        assert_eq!(token.reason(), Some(CancelReason::User));
    }

    #[test]
    fn test_clones_share_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        thread::spawn(move || clone.cancel(CancelReason::User))
            .join()
            .unwrap();
        assert_eq!(token.reason(), Some(CancelReason::User));
    }

    #[test]
    fn test_deadline_fires() {
        let token = CancellationToken::new().with_timeout(Duration::from_millis(0));
        assert_eq!(token.reason(), Some(CancelReason::Timeout));
    }

    #[test]
    fn test_deadline_copy_shares_flag() {
        let token = CancellationToken::new();
        let limited = token.with_timeout(Duration::from_secs(60));
        assert!(!limited.is_cancelled());

        token.cancel(CancelReason::Signal);
        assert_eq!(limited.reason(), Some(CancelReason::Signal));
        assert!(token.remaining().is_none());
    }

    #[test]
    fn test_signal_sequence() {
        let token = CancellationToken::new();
        assert_eq!(token.handle_signal(), SignalAction::Cancel);
        assert_eq!(token.reason(), Some(CancelReason::Signal));
        assert_eq!(token.handle_signal(), SignalAction::ImmediateExit);
        assert_eq!(token.handle_signal(), SignalAction::Ignore);
    }

    #[test]
    fn test_signal_count_does_not_wrap() {
        let token = CancellationToken::new();
        token.handle_signal();
        token.handle_signal();
        for _ in 0..600 {
            assert_eq!(token.handle_signal(), SignalAction::Ignore);
        }
    }
}
