//! Order-preserving map stage.

use crate::cancel::CancellationToken;
use crate::channel::Channel;
use crate::errors::FlowError;

use super::stage_channel;

/// Spawn a transform stage: apply `map` to each value of `input` and forward
/// the result.
///
/// Single input, single output: arrival order is preserved exactly. The
/// stage owns the returned channel and closes it once `input` reports
/// end-of-stream or `token` is cancelled. The input channel is borrowed;
/// closing it remains its producer's job.
pub fn transform<T, U, F>(
    input: Channel<T>,
    mut map: F,
    capacity: usize,
    token: &CancellationToken,
) -> Channel<U>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    let out = stage_channel(capacity);
    let tx = out.clone();
    let token = token.clone();
    tokio::spawn(async move {
        loop {
            let item = match input.receive_or_cancel(&token).await {
                Ok(Some(item)) => item,
                Ok(None) => break,
                Err(FlowError::Cancelled(reason)) => {
                    tracing::debug!(stage = "transform", reason = %reason, "transform cancelled");
                    break;
                }
                Err(err) => {
                    tracing::warn!(stage = "transform", error = %err, "transform receive failed");
                    break;
                }
            };
            if tx.send_or_cancel(map(item), &token).await.is_err() {
                break;
            }
        }
        tx.close();
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::generate;

    #[tokio::test]
    async fn test_transform_maps_and_preserves_order() {
        let token = CancellationToken::new();
        let numbers = generate(vec![1, 2, 3, 4], 2, &token);
        let squared = transform(numbers, |n: i32| n * n, 2, &token);

        let mut seen = Vec::new();
        while let Some(v) = squared.receive().await {
            seen.push(v);
        }
        assert_eq!(seen, vec![1, 4, 9, 16]);
    }

    #[tokio::test]
    async fn test_transform_closes_after_input_end_of_stream() {
        let token = CancellationToken::new();
        let input: Channel<u32> = Channel::bounded(4);
        let out = transform(input.clone(), |n| n + 1, 4, &token);

        input.send(1).await.unwrap();
        input.close();

        assert_eq!(out.receive().await, Some(2));
        assert_eq!(out.receive().await, None);
        assert!(out.is_closed());
    }

    #[tokio::test]
    async fn test_transform_closes_output_on_cancel() {
        let token = CancellationToken::new();
        let input: Channel<u32> = Channel::bounded(4);
        let out = transform(input.clone(), |n| n, 4, &token);

        token.cancel("abort");
        // Output must close even though the input never did.
        assert_eq!(out.receive().await, None);
    }
}
