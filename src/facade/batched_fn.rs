use crate::batch::scheduler::Scheduler;
use crate::batch::{BatchConfig, BatcherStats, PendingResult};
use std::fmt;
use std::sync::Arc;

/// The callable produced by [`MicroBatcher::build`](super::MicroBatcher::build).
///
/// `call` enqueues synchronously and hands back a [`PendingResult`]; calls made
/// back-to-back before any of them is awaited can therefore share one group.
/// Clones share the same instance.
pub struct BatchedFn<P, R> {
    scheduler: Arc<Scheduler<P, R>>,
}

impl<P, R> Clone for BatchedFn<P, R> {
    fn clone(&self) -> Self {
        Self {
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<P, R> BatchedFn<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(scheduler: Arc<Scheduler<P, R>>) -> Self {
        Self { scheduler }
    }

    /// Submit one call. Must be invoked from within a Tokio runtime.
    pub fn call(&self, payload: P) -> PendingResult<R> {
        self.scheduler.submit(payload)
    }

    /// Flush every queued call now instead of waiting for the timer.
    pub fn flush_now(&self) -> usize {
        self.scheduler.flush_now()
    }

    /// Calls queued but not yet flushed.
    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    pub fn stats(&self) -> BatcherStats {
        self.scheduler.stats()
    }

    pub fn config(&self) -> &BatchConfig {
        self.scheduler.config()
    }

    pub fn name(&self) -> &str {
        self.scheduler.name()
    }

    /// True when both handles drive the same instance.
    pub fn same_instance(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.scheduler, &other.scheduler)
    }

    /// Turn into a plain closure with the shape of the original operation.
    pub fn into_fn(self) -> impl Fn(P) -> PendingResult<R> + Clone + Send + Sync + 'static {
        move |payload: P| self.call(payload)
    }
}

impl<P, R> fmt::Debug for BatchedFn<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchedFn")
            .field("name", &self.name())
            .field("pending", &self.pending())
            .field("config", self.config())
            .finish()
    }
}
