//! Flowlite: an in-process concurrent pipeline and cancellation framework.
//!
//! Concurrent tasks communicate exclusively through typed channels and
//! cancellation primitives; there is no ad hoc shared mutable state between
//! units of work.
//!
//! ## Architecture
//!
//! ```text
//! generate ──▶ Channel ──▶ transform ──▶ Channel ──▶ consumer
//!
//! source A ──┐                          jobs ──┬──▶ worker 0 ──┐
//! source B ──┼──▶ fan_in ──▶ out               ├──▶ worker 1 ──┼──▶ results
//! source C ──┘                                 └──▶ worker 2 ──┘
//!
//! DoneSignal / CancellationToken: out-of-band control threaded alongside
//! data channels, observed at every blocking point.
//! ```
//!
//! - [`Channel`]: thread-safe FIFO with blocking send/receive and one-shot
//!   close-and-drain semantics (bounded or rendezvous).
//! - [`generate`] / [`transform`]: pipeline stages; a linear chain preserves
//!   order end to end.
//! - [`fan_in`]: N-to-1 merge that closes only after every input drained.
//! - [`WorkerPool`]: fan-out with per-job fault reporting and a
//!   join-then-close shutdown protocol.
//! - [`DoneSignal`]: one-shot broadcast stop flag.
//! - [`CancellationToken`]: hierarchical, monotonic, reason-carrying
//!   cancellation.
//! - [`with_deadline`]: race any future against a timer.
//!
//! ## Multiplexed waits
//!
//! The framework does not ship its own reactor: `tokio` supplies task
//! spawning and readiness wakeups, and `tokio::select!` is the multiplexed
//! wait primitive. Every blocking operation here ([`Channel::receive`],
//! [`Channel::send`], [`DoneSignal::wait`],
//! [`CancellationToken::cancelled`]) is cancel-safe, so composing them in a
//! `select!` loses no values. When several sources are ready at once,
//! `select!` picks a branch uniformly at random; no source has priority.
//!
//! ## Shutdown and failure
//!
//! Every channel has exactly one designated closer (stages and pools take
//! that role for their outputs). Operational failures such as timeouts,
//! cancellation, and per-job faults are [`FlowError`] values; structural
//! misuse such as double close fails fast with a panic. A cancelled
//! pipeline leaves no channel permanently unclosed and no task permanently
//! blocked.
//!
//! ## Example
//!
//! ```ignore
//! use flowlite::{generate, transform, CancellationToken};
//!
//! let token = CancellationToken::new();
//! let numbers = generate(1..=5, 2, &token);
//! let squared = transform(numbers, |n| n * n, 2, &token);
//! let doubled = transform(squared, |n| n * 2, 2, &token);
//!
//! while let Some(v) = doubled.receive().await {
//!     println!("output: {v}");
//! }
//! ```

pub mod cancel;
pub mod channel;
pub mod errors;
pub mod pipeline;
pub mod pool;
pub mod race;
pub mod signal;

pub use cancel::{CancelState, CancellationToken};
pub use channel::Channel;
pub use errors::{FlowError, FlowResult};
pub use pipeline::{fan_in, generate, ticker, transform};
pub use pool::{PoolMetrics, Worker, WorkerPool};
pub use race::with_deadline;
pub use signal::DoneSignal;
