//! N-to-1 channel merge.

use tokio::task::JoinSet;

use crate::channel::Channel;

use super::stage_channel;

/// Merge `inputs` into a single output channel.
///
/// One forwarding task per input drains it to the shared output; values from
/// different inputs interleave arbitrarily. The output closes if and only if
/// every input has closed and been fully drained; one input finishing early
/// never terminates the merge.
///
/// Close coordination is panic-tolerant: forwarders live in a [`JoinSet`]
/// and the dedicated closer drains `join_next`, so a forwarder that
/// terminates abnormally is logged and counted as finished instead of
/// wedging the close.
pub fn fan_in<T>(inputs: Vec<Channel<T>>, capacity: usize) -> Channel<T>
where
    T: Send + 'static,
{
    let out = stage_channel(capacity);
    let mut forwarders = JoinSet::new();
    for (index, input) in inputs.into_iter().enumerate() {
        let tx = out.clone();
        forwarders.spawn(async move {
            while let Some(value) = input.receive().await {
                if tx.send(value).await.is_err() {
                    break;
                }
            }
            tracing::trace!(input = index, "fan-in input drained");
        });
    }
    let closer = out.clone();
    tokio::spawn(async move {
        while let Some(joined) = forwarders.join_next().await {
            if let Err(err) = joined {
                tracing::warn!(error = %err, "fan-in forwarder terminated abnormally");
            }
        }
        closer.close();
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationToken;
    use crate::pipeline::generate;

    #[tokio::test]
    async fn test_fan_in_merges_all_inputs_exactly_once() {
        let token = CancellationToken::new();
        let a = generate(vec![1, 2, 3], 2, &token);
        let b = generate(vec![10, 20, 30], 2, &token);
        let merged = fan_in(vec![a, b], 4);

        let mut seen = Vec::new();
        while let Some(v) = merged.receive().await {
            seen.push(v);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2, 3, 10, 20, 30]);
        assert!(merged.is_closed());
    }

    #[tokio::test]
    async fn test_fan_in_keeps_going_after_one_input_closes() {
        let slow: Channel<u32> = Channel::bounded(4);
        let fast: Channel<u32> = Channel::bounded(4);
        let merged = fan_in(vec![slow.clone(), fast.clone()], 4);

        fast.send(1).await.unwrap();
        fast.close();
        assert_eq!(merged.receive().await, Some(1));

        // The merge must still be open: the slow input has not closed.
        slow.send(2).await.unwrap();
        assert_eq!(merged.receive().await, Some(2));
        slow.close();
        assert_eq!(merged.receive().await, None);
    }

    #[tokio::test]
    async fn test_fan_in_single_input_passthrough() {
        let token = CancellationToken::new();
        let only = generate(vec![7, 8], 2, &token);
        let merged = fan_in(vec![only], 2);

        assert_eq!(merged.receive().await, Some(7));
        assert_eq!(merged.receive().await, Some(8));
        assert_eq!(merged.receive().await, None);
    }

    #[tokio::test]
    async fn test_fan_in_no_inputs_closes_immediately() {
        let merged: Channel<u32> = fan_in(Vec::new(), 2);
        assert_eq!(merged.receive().await, None);
    }
}
