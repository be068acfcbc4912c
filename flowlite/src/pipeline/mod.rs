//! Pipeline stages: generators, transforms, and fan-in merging.
//!
//! Stages are spawned tasks composed by channel hand-off:
//!
//! ```text
//! generate(1..=5) ──▶ transform(square) ──▶ transform(double) ──▶ consumer
//!
//! source A ──┐
//! source B ──┼──▶ fan_in ──▶ consumer
//! source C ──┘
//! ```
//!
//! Every stage exclusively owns its output channel (the spawned task is the
//! single designated closer) and borrows its input. A linear chain of
//! single-input stages preserves arrival order end to end; [`fan_in`] makes
//! no ordering promise across its inputs.
//!
//! Stages observe cancellation at every blocking point: a cancelled token
//! (or a fired [`DoneSignal`](crate::DoneSignal) for [`ticker`]) stops
//! production and still closes the output, so downstream consumers always
//! see end-of-stream rather than a permanently blocked receive.

mod fanin;
mod source;
mod transform;

pub use fanin::fan_in;
pub use source::{generate, ticker};
pub use transform::transform;

use crate::channel::Channel;

/// Stage output channel for a caller-chosen capacity; zero selects a
/// rendezvous channel.
pub(crate) fn stage_channel<T>(capacity: usize) -> Channel<T> {
    if capacity == 0 {
        Channel::rendezvous()
    } else {
        Channel::bounded(capacity)
    }
}
