use std::sync::atomic::{AtomicU64, Ordering};

/// Internal pool counters, updated with relaxed atomics on the job path.
#[derive(Default)]
pub(crate) struct PoolCounters {
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn record_success(&self) {
        self.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of a pool's job counters.
///
/// One of the two counters moves per processed job, so after
/// [`WorkerPool::join`](crate::WorkerPool::join) their sum equals the number
/// of jobs submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolMetrics {
    /// Jobs whose worker returned `Ok`.
    pub jobs_succeeded: u64,
    /// Jobs whose worker returned a fault.
    pub jobs_failed: u64,
}

impl PoolMetrics {
    /// Total jobs processed so far.
    pub fn jobs_processed(&self) -> u64 {
        self.jobs_succeeded + self.jobs_failed
    }
}
