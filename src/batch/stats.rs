use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Point-in-time counters for one batched function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatcherStats {
    /// Calls waiting in the ledger.
    pub pending: usize,
    /// Resolver or single-item invocations currently running.
    pub in_flight: usize,
    pub timer_flushes: u64,
    pub threshold_flushes: u64,
    pub manual_flushes: u64,
    pub batch_invocations: u64,
    pub single_invocations: u64,
    /// Calls settled with an error.
    pub failures: u64,
}

/// What caused a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    Timer,
    Threshold,
    Manual,
}

#[derive(Debug, Default)]
pub(crate) struct StatsRecorder {
    in_flight: AtomicUsize,
    timer_flushes: AtomicU64,
    threshold_flushes: AtomicU64,
    manual_flushes: AtomicU64,
    batch_invocations: AtomicU64,
    single_invocations: AtomicU64,
    failures: AtomicU64,
}

impl StatsRecorder {
    pub(crate) fn record_flush(&self, trigger: FlushTrigger) {
        let counter = match trigger {
            FlushTrigger::Timer => &self.timer_flushes,
            FlushTrigger::Threshold => &self.threshold_flushes,
            FlushTrigger::Manual => &self.manual_flushes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_batch_invocation(&self) {
        self.batch_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_single_invocation(&self) {
        self.single_invocations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failures(&self, n: usize) {
        self.failures.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// Count one running invocation until the guard drops.
    pub(crate) fn in_flight_guard(self: &Arc<Self>) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            stats: Arc::clone(self),
        }
    }

    pub(crate) fn snapshot(&self, pending: usize) -> BatcherStats {
        BatcherStats {
            pending,
            in_flight: self.in_flight.load(Ordering::Acquire),
            timer_flushes: self.timer_flushes.load(Ordering::Relaxed),
            threshold_flushes: self.threshold_flushes.load(Ordering::Relaxed),
            manual_flushes: self.manual_flushes.load(Ordering::Relaxed),
            batch_invocations: self.batch_invocations.load(Ordering::Relaxed),
            single_invocations: self.single_invocations.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

pub(crate) struct InFlightGuard {
    stats: Arc<StatsRecorder>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}
