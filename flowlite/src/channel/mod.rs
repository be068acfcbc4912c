//! Typed async FIFO channels with one-shot close-and-drain semantics.
//!
//! A [`Channel`] is a thread-safe queue shared by any number of producer and
//! consumer tasks. Handles are cheap `Arc` clones; cloning never changes the
//! channel's behavior. Two capacity modes exist:
//!
//! - **Bounded** ([`Channel::bounded`]): `send` blocks while the buffer is at
//!   capacity.
//! - **Rendezvous** ([`Channel::rendezvous`]): zero capacity, `send` blocks
//!   until a receiver is waiting for the value.
//!
//! ## Close protocol
//!
//! Exactly one owner closes a channel, once. After [`Channel::close`]:
//!
//! - every pending and future `send` fails with
//!   [`FlowError::ClosedChannelSend`],
//! - receivers drain whatever is buffered, then observe end-of-stream
//!   (`None`) instead of blocking.
//!
//! Closing twice is a caller bug and panics. Stage constructors in
//! [`pipeline`](crate::pipeline) move the closer role into the spawned task,
//! so assembled pipelines never call `close` from user code.
//!
//! ## Cancel safety
//!
//! [`Channel::receive`] is cancel-safe: if the future is dropped by a
//! `tokio::select!` that chose another branch, no value is lost: a value is
//! either returned or still queued. This is what makes the multiplexed-wait
//! helpers ([`Channel::receive_or_cancel`], [`Channel::send_or_cancel`])
//! sound.

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::cancel::CancellationToken;
use crate::errors::{FlowError, FlowResult};

/// Shared channel state.
struct Inner<T> {
    state: Mutex<State<T>>,
    /// Woken when a value is queued or the channel closes.
    recv_ready: Notify,
    /// Woken when buffer space frees, a receiver starts waiting, or the
    /// channel closes.
    send_ready: Notify,
}

struct State<T> {
    queue: VecDeque<T>,
    /// Zero means rendezvous: a send needs a waiting receiver.
    capacity: usize,
    closed: bool,
    /// Receivers currently parked in `receive`.
    recv_waiting: usize,
}

impl<T> State<T> {
    fn has_room(&self) -> bool {
        if self.capacity == 0 {
            // Rendezvous: one in-flight value per parked receiver.
            self.recv_waiting > self.queue.len()
        } else {
            self.queue.len() < self.capacity
        }
    }
}

/// Outcome of a single non-blocking send attempt.
enum TrySend<T> {
    Sent,
    Full(T),
    Closed,
}

/// A typed, thread-safe FIFO shared by producers and consumers.
///
/// Values are delivered in send order for a single producer; interleaving
/// across producers is unspecified.
pub struct Channel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Channel<T> {
    /// Create a buffered channel holding up to `capacity` values.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; use [`Channel::rendezvous`] for
    /// unbuffered handoff.
    pub fn bounded(capacity: usize) -> Self {
        assert!(capacity > 0, "bounded channel needs capacity >= 1");
        Self::with_capacity(capacity)
    }

    /// Create an unbuffered channel: `send` completes only once a receiver
    /// is waiting for the value.
    pub fn rendezvous() -> Self {
        Self::with_capacity(0)
    }

    fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    capacity,
                    closed: false,
                    recv_waiting: 0,
                }),
                recv_ready: Notify::new(),
                send_ready: Notify::new(),
            }),
        }
    }

    /// Send a value, waiting for buffer space (or a waiting receiver on a
    /// rendezvous channel).
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::ClosedChannelSend`] if the channel is closed; the
    /// value is dropped.
    pub async fn send(&self, value: T) -> FlowResult<()> {
        let mut value = value;
        let mut ready = pin!(self.inner.send_ready.notified());
        loop {
            // Register interest before checking state so a notification
            // between the check and the await is not lost.
            ready.as_mut().enable();
            match self.try_send(value) {
                TrySend::Sent => {
                    self.inner.recv_ready.notify_one();
                    return Ok(());
                }
                TrySend::Closed => return Err(FlowError::ClosedChannelSend),
                TrySend::Full(v) => value = v,
            }
            ready.as_mut().await;
            ready.set(self.inner.send_ready.notified());
        }
    }

    fn try_send(&self, value: T) -> TrySend<T> {
        let mut st = self.inner.state.lock();
        if st.closed {
            return TrySend::Closed;
        }
        if st.has_room() {
            st.queue.push_back(value);
            TrySend::Sent
        } else {
            TrySend::Full(value)
        }
    }

    /// Receive the next value, waiting until one is available.
    ///
    /// Returns `None` once the channel is closed and fully drained; a closed
    /// channel never blocks a receiver.
    pub async fn receive(&self) -> Option<T> {
        let mut ready = pin!(self.inner.recv_ready.notified());
        loop {
            ready.as_mut().enable();
            {
                let mut st = self.inner.state.lock();
                if let Some(value) = st.queue.pop_front() {
                    drop(st);
                    self.inner.send_ready.notify_one();
                    return Some(value);
                }
                if st.closed {
                    return None;
                }
                st.recv_waiting += 1;
            }
            // A parked receiver is exactly what rendezvous senders wait for.
            self.inner.send_ready.notify_one();
            {
                let _parked = ParkedReceiver { inner: &self.inner };
                ready.as_mut().await;
            }
            ready.set(self.inner.recv_ready.notified());
        }
    }

    /// Receive, racing against cancellation of `token`.
    ///
    /// Multiplexed wait: wakes on whichever of {value ready, end-of-stream,
    /// token cancelled} happens first, with no priority among simultaneously
    /// ready sources (uniform-random tie-break, see crate docs).
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Cancelled`] when the token wins the race.
    pub async fn receive_or_cancel(&self, token: &CancellationToken) -> FlowResult<Option<T>> {
        tokio::select! {
            value = self.receive() => Ok(value),
            reason = token.cancelled() => Err(FlowError::Cancelled(reason)),
        }
    }

    /// Send, racing against cancellation of `token`.
    ///
    /// If cancellation wins the value is dropped (abandoned in-flight work).
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::Cancelled`] when the token wins, or
    /// [`FlowError::ClosedChannelSend`] if the channel is closed.
    pub async fn send_or_cancel(&self, value: T, token: &CancellationToken) -> FlowResult<()> {
        tokio::select! {
            sent = self.send(value) => sent,
            reason = token.cancelled() => Err(FlowError::Cancelled(reason)),
        }
    }

    /// Mark the channel closed: no further sends, receivers drain then see
    /// end-of-stream.
    ///
    /// All parked senders and receivers are unblocked immediately.
    ///
    /// # Panics
    ///
    /// Panics if the channel is already closed. Exactly one owner is
    /// designated to close a channel, exactly once.
    pub fn close(&self) {
        {
            let mut st = self.inner.state.lock();
            assert!(
                !st.closed,
                "channel closed twice; a channel has exactly one designated closer"
            );
            st.closed = true;
        }
        self.inner.recv_ready.notify_waiters();
        self.inner.send_ready.notify_waiters();
    }

    /// Whether `close` has been called. Buffered values may still be
    /// pending; receivers drain them before observing end-of-stream.
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Number of values currently buffered.
    pub fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Whether the buffer is currently empty.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().queue.is_empty()
    }

    /// Configured capacity; zero for rendezvous channels.
    pub fn capacity(&self) -> usize {
        self.inner.state.lock().capacity
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let st = self.inner.state.lock();
        f.debug_struct("Channel")
            .field("len", &st.queue.len())
            .field("capacity", &st.capacity)
            .field("closed", &st.closed)
            .field("recv_waiting", &st.recv_waiting)
            .finish()
    }
}

/// Decrements `recv_waiting` when a parked receiver wakes or its future is
/// dropped mid-wait (e.g. by `select!` choosing another branch). Without
/// this, an abandoned receive would leave rendezvous senders believing a
/// receiver is still available.
struct ParkedReceiver<'a, T> {
    inner: &'a Inner<T>,
}

impl<T> Drop for ParkedReceiver<'_, T> {
    fn drop(&mut self) {
        let mut st = self.inner.state.lock();
        st.recv_waiting -= 1;
    }
}
