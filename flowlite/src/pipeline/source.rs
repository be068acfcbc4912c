//! Generator stages: pipelines start here.

use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::channel::Channel;
use crate::errors::FlowError;
use crate::signal::DoneSignal;

use super::stage_channel;

/// Spawn a generator stage emitting each item of `items` in order.
///
/// The stage owns the returned channel and closes it when the source is
/// exhausted or `token` is cancelled, whichever happens first. `capacity`
/// sizes the output buffer; zero selects a rendezvous channel.
pub fn generate<T, I>(items: I, capacity: usize, token: &CancellationToken) -> Channel<T>
where
    T: Send + 'static,
    I: IntoIterator<Item = T> + Send + 'static,
    I::IntoIter: Send + 'static,
{
    let out = stage_channel(capacity);
    let tx = out.clone();
    let token = token.clone();
    tokio::spawn(async move {
        for item in items {
            match tx.send_or_cancel(item, &token).await {
                Ok(()) => {}
                Err(FlowError::Cancelled(reason)) => {
                    tracing::debug!(stage = "generate", reason = %reason, "generator cancelled");
                    break;
                }
                Err(err) => {
                    tracing::warn!(stage = "generate", error = %err, "generator send failed");
                    break;
                }
            }
        }
        tx.close();
    });
    out
}

/// Spawn a periodic producer emitting a tick counter every `period` until
/// `done` fires.
///
/// The output is a rendezvous channel: a tick is only produced when a
/// receiver is ready, and a fired signal wins over an unconsumed tick. If
/// `done` is signaled before the first tick is ever offered, zero values are
/// observed downstream. The output channel is always closed on exit.
pub fn ticker(period: Duration, done: &DoneSignal) -> Channel<u64> {
    let out = Channel::rendezvous();
    let tx = out.clone();
    let done = done.clone();
    tokio::spawn(async move {
        let mut seq = 0u64;
        loop {
            tokio::select! {
                () = done.wait() => break,
                () = tokio::time::sleep(period) => {}
            }
            // select! breaks ties at random; re-check so a signal that
            // raced the timer still means zero further offers.
            if done.is_signaled() {
                break;
            }
            tokio::select! {
                () = done.wait() => break,
                sent = tx.send(seq) => {
                    if sent.is_err() {
                        break;
                    }
                    seq += 1;
                }
            }
        }
        tx.close();
        tracing::trace!(stage = "ticker", ticks = seq, "ticker stage exited");
    });
    out
}
