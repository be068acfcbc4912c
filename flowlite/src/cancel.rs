//! Hierarchical, reason-carrying cancellation tokens.
//!
//! A [`CancellationToken`] forms a tree: [`CancellationToken::child`]
//! attaches a new node under an existing one, and cancelling any node
//! transitively cancels every live descendant. Parents hold only `Weak`
//! back-references, so a token's lifetime is owned by whoever holds its
//! handle, never by the tree.
//!
//! State is monotonic: `Active → Cancelled(reason)` is the only transition.
//! Cancelling an already-cancelled node is a no-op. When [`cancel`] returns,
//! the entire live subtree observes `Cancelled`; no descendant can report
//! `Active` afterwards.
//!
//! Cancellation is cooperative. Long-running work holding a token checks it
//! at each safe suspension point, before every blocking send or receive,
//! either explicitly via [`observe`] or by folding the wait into a
//! `tokio::select!` with [`cancelled`] (the channel helpers
//! [`receive_or_cancel`](crate::Channel::receive_or_cancel) and
//! [`send_or_cancel`](crate::Channel::send_or_cancel) do this).
//!
//! [`cancel`]: CancellationToken::cancel
//! [`observe`]: CancellationToken::observe
//! [`cancelled`]: CancellationToken::cancelled

use std::pin::pin;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Snapshot of a token's state as seen by [`CancellationToken::observe`].
#[derive(Debug, Clone)]
pub enum CancelState {
    /// Not cancelled (yet).
    Active,
    /// Terminally cancelled, with the reason given to `cancel`.
    Cancelled(Arc<str>),
}

impl CancelState {
    /// True for the `Cancelled` variant.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CancelState::Cancelled(_))
    }
}

struct TokenInner {
    state: Mutex<TokenState>,
    notify: Notify,
}

struct TokenState {
    /// `Some` once cancelled. Monotonic: never cleared.
    reason: Option<Arc<str>>,
    /// Weak back-references; dead slots are pruned when children attach.
    children: Vec<Weak<TokenInner>>,
}

/// A node in a cancellation tree.
///
/// Handles are cheap `Arc` clones sharing one node; clone a token to hand it
/// to a spawned task.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl CancellationToken {
    /// Create a root token in the `Active` state.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                state: Mutex::new(TokenState {
                    reason: None,
                    children: Vec::new(),
                }),
                notify: Notify::new(),
            }),
        }
    }

    /// Attach a new child under this token.
    ///
    /// Cancelling `self` (or any ancestor) cancels the child; cancelling the
    /// child leaves `self` untouched. A child created under an
    /// already-cancelled token is born cancelled with the ancestor's reason.
    pub fn child(&self) -> CancellationToken {
        let child = CancellationToken::new();
        let mut st = self.inner.state.lock();
        match &st.reason {
            Some(reason) => {
                child.inner.state.lock().reason = Some(Arc::clone(reason));
            }
            None => {
                st.children.retain(|w| w.strong_count() > 0);
                st.children.push(Arc::downgrade(&child.inner));
            }
        }
        child
    }

    /// Cancel this token and, transitively, every live descendant.
    ///
    /// Idempotent: cancelling an already-cancelled node is a no-op and the
    /// original reason is kept. By the time this returns, `observe` on any
    /// descendant reports `Cancelled`.
    pub fn cancel(&self, reason: impl Into<Arc<str>>) {
        let reason = reason.into();
        tracing::debug!(reason = %reason, "cancelling token subtree");
        cancel_node(&self.inner, &reason);
    }

    /// Non-blocking state query.
    pub fn observe(&self) -> CancelState {
        match &self.inner.state.lock().reason {
            Some(reason) => CancelState::Cancelled(Arc::clone(reason)),
            None => CancelState::Active,
        }
    }

    /// True once cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner.state.lock().reason.is_some()
    }

    /// Wait until this token is cancelled; resolves to the reason.
    ///
    /// Completes immediately if already cancelled. Cancel-safe, and usable
    /// inside `tokio::select!` alongside channel operations and timers.
    pub async fn cancelled(&self) -> Arc<str> {
        let mut notified = pin!(self.inner.notify.notified());
        loop {
            notified.as_mut().enable();
            if let Some(reason) = &self.inner.state.lock().reason {
                return Arc::clone(reason);
            }
            notified.as_mut().await;
            notified.set(self.inner.notify.notified());
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("state", &self.observe())
            .finish()
    }
}

/// Mark `node` cancelled and recurse into its live children.
fn cancel_node(node: &Arc<TokenInner>, reason: &Arc<str>) {
    let children = {
        let mut st = node.state.lock();
        if st.reason.is_some() {
            return;
        }
        st.reason = Some(Arc::clone(reason));
        std::mem::take(&mut st.children)
    };
    node.notify.notify_waiters();
    for child in children {
        if let Some(child) = child.upgrade() {
            cancel_node(&child, reason);
        }
    }
}
