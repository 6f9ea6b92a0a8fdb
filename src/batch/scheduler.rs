//! Flush scheduler: decides when a group leaves the ledger.
//!
//! States per instance: idle (no timer) and armed (timer pending). The first
//! enqueue into an idle scheduler arms a timer for the flush interval; when it
//! fires the whole ledger is drained. Reaching the size threshold cancels the
//! timer and drains exactly `size_threshold` calls right away; the next enqueue
//! arms a fresh timer. Either flush returns the scheduler to idle without
//! waiting for the group to resolve.

use super::cell::{result_cell, PendingResult};
use super::config::BatchConfig;
use super::dispatcher::Dispatcher;
use super::ledger::{BatchGroup, Ledger};
use super::stats::{BatcherStats, FlushTrigger, StatsRecorder};
use crate::{Error, ErrorContext};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

struct ArmedTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct TimerSlot {
    armed: Option<ArmedTimer>,
    generation: u64,
    // Runtime of the most recent submit; work is spawned here even when a
    // flush is requested from outside any runtime.
    runtime: Option<Handle>,
}

impl TimerSlot {
    fn cancel(&mut self) {
        if let Some(timer) = self.armed.take() {
            timer.handle.abort();
        }
    }
}

pub(crate) struct Scheduler<P, R> {
    ledger: Ledger<P, R>,
    dispatcher: Dispatcher<P, R>,
    config: BatchConfig,
    timer: Mutex<TimerSlot>,
    next_group_id: AtomicU64,
    stats: Arc<StatsRecorder>,
    name: Arc<str>,
}

impl<P, R> Scheduler<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        config: BatchConfig,
        dispatcher: Dispatcher<P, R>,
        stats: Arc<StatsRecorder>,
        name: Arc<str>,
    ) -> Self {
        Self {
            ledger: Ledger::new(),
            dispatcher,
            config,
            timer: Mutex::new(TimerSlot::default()),
            next_group_id: AtomicU64::new(0),
            stats,
            name,
        }
    }

    pub(crate) fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn pending(&self) -> usize {
        self.ledger.size()
    }

    pub(crate) fn stats(&self) -> BatcherStats {
        self.stats.snapshot(self.ledger.size())
    }

    fn lock_timer(&self) -> MutexGuard<'_, TimerSlot> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue one call and apply the flush rules. Never suspends.
    pub(crate) fn submit(self: &Arc<Self>, payload: P) -> PendingResult<R> {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                let (cell, pending) = result_cell();
                cell.settle_with_error(Error::runtime_with_context(
                    "batched function called outside of a Tokio runtime",
                    ErrorContext::new().with_source("scheduler"),
                ));
                return pending;
            }
        };

        let mut timer = self.lock_timer();
        timer.runtime = Some(runtime.clone());
        let (pending, size) = self.ledger.enqueue(payload);
        trace!(batcher = %self.name, size, "call enqueued");

        match self.config.size_threshold {
            // Enqueue and this check share the timer lock, so the ledger
            // never grows past the threshold.
            Some(threshold) if size >= threshold => {
                timer.cancel();
                let group = self.ledger.drain(Some(threshold));
                self.flush(&runtime, group, FlushTrigger::Threshold);
            }
            _ if timer.armed.is_none() => self.arm(&mut timer, runtime),
            _ => {}
        }
        pending
    }

    /// Drain everything now, cancelling any armed timer. Returns the number of calls flushed.
    ///
    /// Safe to call from any thread: the group runs on the runtime the calls
    /// were submitted from.
    pub(crate) fn flush_now(&self) -> usize {
        let mut timer = self.lock_timer();
        let Some(runtime) = Handle::try_current().ok().or_else(|| timer.runtime.clone()) else {
            // Nothing was ever submitted, so the ledger is empty.
            return 0;
        };
        timer.cancel();
        let group = self.ledger.drain(None);
        let n = group.len();
        if n > 0 {
            self.flush(&runtime, group, FlushTrigger::Manual);
        }
        n
    }

    fn arm(self: &Arc<Self>, timer: &mut TimerSlot, runtime: Handle) {
        timer.generation += 1;
        let generation = timer.generation;
        let interval = self.config.flush_interval;
        let this = Arc::clone(self);
        let spawner = runtime.clone();
        let handle = spawner.spawn(async move {
            tokio::time::sleep(interval).await;
            this.on_timer(&runtime, generation);
        });
        debug!(batcher = %self.name, generation, ?interval, "flush timer armed");
        timer.armed = Some(ArmedTimer { generation, handle });
    }

    fn on_timer(&self, runtime: &Handle, generation: u64) {
        let mut timer = self.lock_timer();
        // A threshold or manual flush may have replaced this timer after it woke up.
        match &timer.armed {
            Some(t) if t.generation == generation => timer.armed = None,
            _ => return,
        }
        let group = self.ledger.drain(None);
        if !group.is_empty() {
            self.flush(runtime, group, FlushTrigger::Timer);
        }
    }

    fn flush(&self, runtime: &Handle, group: BatchGroup<P, R>, trigger: FlushTrigger) {
        let group_id = self.next_group_id.fetch_add(1, Ordering::Relaxed);
        let (first_seq, waited) = group
            .first()
            .map(|call| (call.seq, call.queued_for()))
            .unzip();
        debug!(
            batcher = %self.name,
            group_id,
            size = group.len(),
            ?first_seq,
            ?waited,
            ?trigger,
            "flushing group"
        );
        self.stats.record_flush(trigger);
        self.dispatcher.dispatch(runtime, group_id, group);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::config::ErrorMode;
    use crate::batch::operation::{BatchResolver, SingleOperation};
    use std::time::Duration;

    type Calls = Arc<Mutex<Vec<Vec<u32>>>>;

    fn scheduler(config: BatchConfig) -> (Arc<Scheduler<u32, u32>>, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let c = Arc::clone(&calls);
        let resolver: Arc<dyn BatchResolver<u32, u32>> = Arc::new(move |ps: Vec<u32>| {
            c.lock().unwrap().push(ps.clone());
            async move { Ok::<_, String>(ps.into_iter().map(|p| p * 2).collect::<Vec<_>>()) }
        });
        let op: Arc<dyn SingleOperation<u32, u32>> =
            Arc::new(|n: u32| async move { Ok::<_, String>(n * 2) });
        let stats = Arc::new(StatsRecorder::default());
        let name: Arc<str> = Arc::from("scheduler-test");
        let dispatcher = Dispatcher::new(
            op,
            Some(resolver),
            config.force_batch_for_single_call,
            ErrorMode::Preserve,
            Arc::clone(&stats),
            Arc::clone(&name),
        );
        (
            Arc::new(Scheduler::new(config, dispatcher, stats, name)),
            calls,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_flushes_whole_ledger() {
        let (s, calls) = scheduler(BatchConfig::for_resolver());
        let a = s.submit(1);
        let b = s.submit(2);
        assert_eq!(s.pending(), 2);

        assert_eq!(a.await.unwrap(), 2);
        assert_eq!(b.await.unwrap(), 4);
        assert_eq!(*calls.lock().unwrap(), vec![vec![1, 2]]);
        assert_eq!(s.stats().timer_flushes, 1);
        assert!(s.lock_timer().armed.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_flush_drains_exactly_threshold() {
        let config = BatchConfig::for_resolver()
            .with_flush_interval(Duration::from_millis(200))
            .with_size_threshold(2);
        let (s, calls) = scheduler(config);

        let _a = s.submit(1);
        assert!(s.lock_timer().armed.is_some());
        let _b = s.submit(2);
        // Threshold reached: timer cancelled, group handed off synchronously.
        assert!(s.lock_timer().armed.is_none());
        assert_eq!(s.pending(), 0);

        let c = s.submit(3);
        assert!(s.lock_timer().armed.is_some());
        assert_eq!(c.await.unwrap(), 6);

        let stats = s.stats();
        assert_eq!(stats.threshold_flushes, 1);
        assert_eq!(stats.timer_flushes, 1);
        // Lone call after the threshold flush takes the single path.
        assert_eq!(*calls.lock().unwrap(), vec![vec![1, 2]]);
        assert_eq!(stats.single_invocations, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_groups_never_exceed_threshold() {
        let config = BatchConfig::for_resolver()
            .with_flush_interval(Duration::from_millis(200))
            .with_size_threshold(3);
        let (s, calls) = scheduler(config);

        let pending: Vec<_> = (1..=7).map(|n| s.submit(n)).collect();
        // Two full groups left synchronously; the seventh call waits for the timer.
        assert_eq!(s.pending(), 1);
        assert!(s.lock_timer().armed.is_some());

        let mut results = Vec::new();
        for p in pending {
            results.push(p.await.unwrap());
        }
        assert_eq!(results, vec![2, 4, 6, 8, 10, 12, 14]);
        assert_eq!(*calls.lock().unwrap(), vec![vec![1, 2, 3], vec![4, 5, 6]]);

        let stats = s.stats();
        assert_eq!(stats.threshold_flushes, 2);
        assert_eq!(stats.timer_flushes, 1);
        assert_eq!(stats.single_invocations, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_flush_now_from_thread_without_runtime() {
        let config = BatchConfig::for_resolver().with_flush_interval(Duration::from_secs(60));
        let (s, calls) = scheduler(config);
        let a = s.submit(1);
        let b = s.submit(2);

        let remote = Arc::clone(&s);
        let flushed = std::thread::spawn(move || remote.flush_now())
            .join()
            .unwrap();
        assert_eq!(flushed, 2);
        assert!(s.lock_timer().armed.is_none());

        assert_eq!(a.await.unwrap(), 2);
        assert_eq!(b.await.unwrap(), 4);
        assert_eq!(*calls.lock().unwrap(), vec![vec![1, 2]]);
        assert_eq!(s.stats().manual_flushes, 1);
    }

    #[test]
    fn test_flush_now_before_any_submit_outside_runtime() {
        let (s, _) = scheduler(BatchConfig::for_resolver());
        assert_eq!(s.flush_now(), 0);
        assert_eq!(s.stats().manual_flushes, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_timer_is_ignored() {
        let (s, calls) = scheduler(BatchConfig::for_resolver());
        let a = s.submit(5);
        let stale = s.lock_timer().generation;
        assert_eq!(s.flush_now(), 1);

        let b = s.submit(6);
        let c = s.submit(7);
        // The replaced timer must not drain calls owned by the new window.
        s.on_timer(&Handle::current(), stale);
        assert_eq!(s.pending(), 2);

        assert_eq!(a.await.unwrap(), 10);
        assert_eq!(b.await.unwrap(), 12);
        assert_eq!(c.await.unwrap(), 14);
        assert_eq!(*calls.lock().unwrap(), vec![vec![6, 7]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_now_on_empty_ledger() {
        let (s, _) = scheduler(BatchConfig::for_resolver());
        assert_eq!(s.flush_now(), 0);
        assert_eq!(s.stats().manual_flushes, 0);
    }

    #[test]
    fn test_submit_outside_runtime_fails_fast() {
        let (s, _) = scheduler(BatchConfig::for_resolver());
        let pending = s.submit(1);
        assert_eq!(s.pending(), 0);
        let err = futures::executor::block_on(pending).unwrap_err();
        assert!(err.to_string().contains("outside of a Tokio runtime"));
    }
}
