//! Fan-out worker pool: M workers draining one shared job channel.
//!
//! ```text
//! producer ──▶ jobs ──┬──▶ worker 0 ──┐
//!                     ├──▶ worker 1 ──┼──▶ results (closed after last
//!                     └──▶ worker 2 ──┘            worker exits)
//! ```
//!
//! Each job yields exactly one tagged result on the result channel: `Ok` for
//! a processed job, `Err` for a per-job fault. A failing job never stops the
//! pool; faults are values forwarded downstream. Result order is
//! unspecified; workers race.
//!
//! Shutdown protocol: the job producer closes the job channel once all jobs
//! are submitted; workers drain until end-of-stream; a join task closes the
//! result channel only after the last worker has exited. Workers live in a
//! [`tokio::task::JoinSet`], so a worker that panics still counts toward the
//! join and the pool cannot deadlock at shutdown.

mod metrics;

pub use metrics::PoolMetrics;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;

use crate::cancel::CancellationToken;
use crate::channel::Channel;
use crate::errors::{FlowError, FlowResult};

use metrics::PoolCounters;

/// A unit of job-processing logic shared by all workers of a pool.
///
/// Return `Err(FlowError::WorkerFault(..))` for a job that cannot be
/// processed; the fault is reported per-result and the worker moves on to
/// the next job.
#[async_trait]
pub trait Worker<J, R>: Send + Sync + 'static {
    /// Process one job into one result.
    async fn process(&self, job: J) -> FlowResult<R>;

    /// Human-readable name for log attribution.
    fn name(&self) -> &str {
        "worker"
    }
}

/// Handle to a running pool of workers.
///
/// The pool borrows its job and result channels from the assembler; it owns
/// only the completion tracking and the closer role for the result channel.
pub struct WorkerPool {
    join: tokio::task::JoinHandle<()>,
    counters: Arc<PoolCounters>,
}

impl WorkerPool {
    /// Spawn `workers` tasks draining `jobs` into `results`.
    ///
    /// Workers observe `token` before each blocking receive and send; on
    /// cancellation they stop promptly, abandoning undrained jobs. The
    /// result channel is closed by the pool once every worker has exited,
    /// and never before.
    pub fn spawn<J, R, W>(
        workers: usize,
        jobs: Channel<J>,
        results: Channel<FlowResult<R>>,
        worker: Arc<W>,
        token: &CancellationToken,
    ) -> Self
    where
        J: Send + 'static,
        R: Send + 'static,
        W: Worker<J, R>,
    {
        let counters = Arc::new(PoolCounters::default());
        let mut set = JoinSet::new();
        for id in 0..workers {
            set.spawn(worker_loop(
                id,
                jobs.clone(),
                results.clone(),
                Arc::clone(&worker),
                token.clone(),
                Arc::clone(&counters),
            ));
        }

        // Closer: the result channel closes only after the last worker
        // exited, panicked workers included.
        let join = tokio::spawn(async move {
            while let Some(joined) = set.join_next().await {
                if let Err(err) = joined {
                    tracing::warn!(error = %err, "pool worker terminated abnormally");
                }
            }
            results.close();
        });

        Self { join, counters }
    }

    /// Wait for the pool to shut down: all workers exited and the result
    /// channel closed.
    pub async fn join(self) {
        if let Err(err) = self.join.await {
            tracing::warn!(error = %err, "pool closer task failed");
        }
    }

    /// Snapshot of the job counters.
    pub fn metrics(&self) -> PoolMetrics {
        self.counters.snapshot()
    }
}

async fn worker_loop<J, R, W>(
    id: usize,
    jobs: Channel<J>,
    results: Channel<FlowResult<R>>,
    worker: Arc<W>,
    token: CancellationToken,
    counters: Arc<PoolCounters>,
) where
    J: Send + 'static,
    R: Send + 'static,
    W: Worker<J, R>,
{
    loop {
        let job = match jobs.receive_or_cancel(&token).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(FlowError::Cancelled(reason)) => {
                tracing::debug!(worker = id, reason = %reason, "worker cancelled");
                break;
            }
            Err(err) => {
                tracing::warn!(worker = id, error = %err, "worker receive failed");
                break;
            }
        };

        let outcome = worker.process(job).await;
        match &outcome {
            Ok(_) => counters.record_success(),
            Err(err) => {
                tracing::debug!(worker = id, name = worker.name(), error = %err, "job failed");
                counters.record_failure();
            }
        }

        if results.send_or_cancel(outcome, &token).await.is_err() {
            break;
        }
    }
    tracing::trace!(worker = id, name = worker.name(), "pool worker exited");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doubler;

    #[async_trait]
    impl Worker<u32, u32> for Doubler {
        async fn process(&self, job: u32) -> FlowResult<u32> {
            if job == 13 {
                return Err(FlowError::WorkerFault(format!("unlucky job {job}")));
            }
            Ok(job * 2)
        }

        fn name(&self) -> &str {
            "doubler"
        }
    }

    #[tokio::test]
    async fn test_pool_produces_one_result_per_job() {
        let jobs = Channel::bounded(8);
        let results = Channel::bounded(8);
        let token = CancellationToken::new();
        let pool = WorkerPool::spawn(3, jobs.clone(), results.clone(), Arc::new(Doubler), &token);

        for j in 1..=5u32 {
            jobs.send(j).await.unwrap();
        }
        jobs.close();

        let mut seen = Vec::new();
        while let Some(result) = results.receive().await {
            seen.push(result.unwrap());
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![2, 4, 6, 8, 10]);

        pool.join().await;
    }

    #[tokio::test]
    async fn test_faulty_job_does_not_stop_the_pool() {
        let jobs = Channel::bounded(8);
        let results = Channel::bounded(8);
        let token = CancellationToken::new();
        let pool = WorkerPool::spawn(2, jobs.clone(), results.clone(), Arc::new(Doubler), &token);

        for j in [12, 13, 14] {
            jobs.send(j).await.unwrap();
        }
        jobs.close();

        let mut ok = Vec::new();
        let mut faults = 0;
        while let Some(result) = results.receive().await {
            match result {
                Ok(v) => ok.push(v),
                Err(FlowError::WorkerFault(msg)) => {
                    assert!(msg.contains("13"));
                    faults += 1;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        ok.sort_unstable();
        assert_eq!(ok, vec![24, 28]);
        assert_eq!(faults, 1);

        pool.join().await;
    }

    #[tokio::test]
    async fn test_result_channel_closes_only_after_workers_exit() {
        let jobs: Channel<u32> = Channel::bounded(4);
        let results: Channel<FlowResult<u32>> = Channel::bounded(4);
        let token = CancellationToken::new();
        let pool = WorkerPool::spawn(2, jobs.clone(), results.clone(), Arc::new(Doubler), &token);

        // Workers idle on an open job channel: results must stay open.
        tokio::task::yield_now().await;
        assert!(!results.is_closed());

        jobs.close();
        pool.join().await;
        assert!(results.is_closed());
        assert!(results.receive().await.is_none());
    }

    #[tokio::test]
    async fn test_cancel_stops_workers_and_closes_results() {
        let jobs: Channel<u32> = Channel::bounded(4);
        let results: Channel<FlowResult<u32>> = Channel::bounded(4);
        let token = CancellationToken::new();
        let pool = WorkerPool::spawn(3, jobs.clone(), results.clone(), Arc::new(Doubler), &token);

        token.cancel("shutdown requested");
        pool.join().await;
        assert!(results.is_closed());
    }

    struct Brittle;

    #[async_trait]
    impl Worker<u32, u32> for Brittle {
        async fn process(&self, job: u32) -> FlowResult<u32> {
            if job == 2 {
                panic!("worker crashed on job {job}");
            }
            Ok(job * 2)
        }

        fn name(&self) -> &str {
            "brittle"
        }
    }

    #[tokio::test]
    async fn test_panicking_worker_does_not_wedge_shutdown() {
        let jobs: Channel<u32> = Channel::bounded(4);
        let results: Channel<FlowResult<u32>> = Channel::bounded(4);
        let token = CancellationToken::new();
        let pool = WorkerPool::spawn(2, jobs.clone(), results.clone(), Arc::new(Brittle), &token);

        for j in [1, 2, 3] {
            jobs.send(j).await.unwrap();
        }
        jobs.close();

        // Job 2 panics its worker mid-stream. The survivor drains the rest
        // and the closer still counts the dead worker toward the join, so
        // the result channel closes instead of wedging.
        let mut seen = Vec::new();
        while let Some(result) = results.receive().await {
            seen.push(result.unwrap());
        }
        assert!(results.is_closed());
        seen.sort_unstable();
        assert_eq!(seen, vec![2, 6]);

        pool.join().await;
    }

    #[tokio::test]
    async fn test_metrics_count_successes_and_faults() {
        let jobs = Channel::bounded(8);
        let results = Channel::bounded(8);
        let token = CancellationToken::new();
        let pool = WorkerPool::spawn(2, jobs.clone(), results.clone(), Arc::new(Doubler), &token);

        for j in [1, 13, 2, 13] {
            jobs.send(j).await.unwrap();
        }
        jobs.close();

        // Draining all four results means all four jobs were counted.
        while results.receive().await.is_some() {}
        let metrics = pool.metrics();
        assert_eq!(metrics.jobs_succeeded, 2);
        assert_eq!(metrics.jobs_failed, 2);
        assert_eq!(metrics.jobs_processed(), 4);
        pool.join().await;
    }
}
