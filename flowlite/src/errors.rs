//! Error taxonomy for pipeline operations.
//!
//! Operational failures are values: a timed-out race, an observed
//! cancellation, or a job that failed inside a worker are all returned (or
//! forwarded downstream) as `FlowError`, never silently dropped. Structural
//! misuse (closing a channel twice, two producers racing to close) is a
//! caller bug and fails fast with a panic at the call site instead of
//! appearing here.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Errors produced by channels, stages, pools, and deadline races.
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    /// Send attempted after the channel was closed.
    ///
    /// The value is dropped; the designated closer has already declared
    /// end-of-stream, so there is nowhere for it to go.
    #[error("send on closed channel")]
    ClosedChannelSend,

    /// A deadline race elapsed before the operation completed.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// A cancellation token was observed `Cancelled` at a blocking point.
    ///
    /// Carries the reason given to [`cancel`](crate::CancellationToken::cancel)
    /// on the token (or an ancestor).
    #[error("cancelled: {0}")]
    Cancelled(Arc<str>),

    /// A job failed while being processed by a pool worker.
    ///
    /// Reported per-result on the pool's result channel; the worker keeps
    /// draining jobs.
    #[error("job failed: {0}")]
    WorkerFault(String),
}

pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            FlowError::ClosedChannelSend.to_string(),
            "send on closed channel"
        );
        assert_eq!(
            FlowError::Cancelled("shutdown".into()).to_string(),
            "cancelled: shutdown"
        );
        assert_eq!(
            FlowError::WorkerFault("bad input".into()).to_string(),
            "job failed: bad input"
        );
    }
}
