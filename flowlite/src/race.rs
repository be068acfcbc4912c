//! Deadline racing: bound a wait by a one-shot timer.

use std::future::Future;
use std::time::Duration;

use crate::errors::{FlowError, FlowResult};

/// Race `operation` against a `deadline` timer.
///
/// Exactly one branch is observed: if the operation completes strictly
/// before the deadline its output is returned and the timer is discarded;
/// otherwise [`FlowError::Timeout`] is returned and the operation is
/// dropped. A result that would have arrived late is discarded with the
/// dropped future, never delivered twice.
///
/// Dropping the loser is best-effort abandonment, not cancellation: side
/// effects already in flight (spawned tasks, queued sends) are not unwound.
/// Thread a [`CancellationToken`](crate::CancellationToken) through the
/// operation when prompt unwinding matters.
///
/// # Errors
///
/// Returns [`FlowError::Timeout`] carrying the elapsed deadline.
pub async fn with_deadline<F>(deadline: Duration, operation: F) -> FlowResult<F::Output>
where
    F: Future,
{
    tokio::select! {
        output = operation => Ok(output),
        () = tokio::time::sleep(deadline) => Err(FlowError::Timeout(deadline)),
    }
}
