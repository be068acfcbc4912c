//! One-shot broadcast cancellation flag.
//!
//! A [`DoneSignal`] is the channel-free way to tell any number of waiting
//! tasks to stop: the owner calls [`DoneSignal::signal`] once, every current
//! and future [`DoneSignal::wait`] completes. The transition is write-once;
//! there is no way back to the unsignaled state.
//!
//! `wait()` is designed to sit inside a `tokio::select!` next to channel
//! operations, so a producer loop stays responsive to shutdown without
//! polling:
//!
//! ```ignore
//! tokio::select! {
//!     _ = done.wait() => break,
//!     sent = out.send(value) => sent?,
//! }
//! ```

use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

/// Write-once broadcast flag observable by any number of waiters.
///
/// Handles are cheap `Arc` clones sharing one flag.
#[derive(Clone)]
pub struct DoneSignal {
    inner: Arc<SignalInner>,
}

struct SignalInner {
    signaled: AtomicBool,
    notify: Notify,
}

impl DoneSignal {
    /// Create a signal in the active (unsignaled) state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                signaled: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Fire the signal, waking all current and future waiters.
    ///
    /// Idempotent: the atomic swap guards the owner against double fire; a
    /// repeat call is traced and otherwise a no-op.
    pub fn signal(&self) {
        if self.inner.signaled.swap(true, Ordering::AcqRel) {
            tracing::trace!("done signal fired more than once");
            return;
        }
        self.inner.notify.notify_waiters();
    }

    /// Non-blocking query of the flag.
    pub fn is_signaled(&self) -> bool {
        self.inner.signaled.load(Ordering::Acquire)
    }

    /// Wait until the signal fires. Completes immediately if it already has.
    ///
    /// Cancel-safe: dropping the future has no effect on the signal or on
    /// other waiters.
    pub async fn wait(&self) {
        let mut notified = pin!(self.inner.notify.notified());
        loop {
            notified.as_mut().enable();
            if self.is_signaled() {
                return;
            }
            notified.as_mut().await;
            notified.set(self.inner.notify.notified());
        }
    }
}

impl Default for DoneSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DoneSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DoneSignal")
            .field("signaled", &self.is_signaled())
            .finish()
    }
}
