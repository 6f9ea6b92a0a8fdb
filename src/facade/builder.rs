use super::batched_fn::BatchedFn;
use crate::batch::scheduler::Scheduler;
use crate::batch::{
    BatchConfig, BatchOptions, BatchResolver, Dispatcher, ErrorMode, SingleOperation, Spread,
    StatsRecorder, DEFAULT_FLUSH_INTERVAL,
};
use crate::error::BoxError;
use crate::Result;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

static INSTANCE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Builder for a batched function.
///
/// Every [`build`](Self::build) creates a fresh, isolated instance: its own
/// ledger, timer and configuration. Cloning the builder and building twice
/// yields two functions that never share a batch.
pub struct MicroBatcher<P, R> {
    operation: Arc<dyn SingleOperation<P, R>>,
    resolver: Option<Arc<dyn BatchResolver<P, R>>>,
    flush_interval: Option<Duration>,
    size_threshold: Option<usize>,
    force_batch_for_single_call: bool,
    error_mode: ErrorMode,
    name: Option<String>,
}

impl<P, R> Clone for MicroBatcher<P, R> {
    fn clone(&self) -> Self {
        Self {
            operation: Arc::clone(&self.operation),
            resolver: self.resolver.clone(),
            flush_interval: self.flush_interval,
            size_threshold: self.size_threshold,
            force_batch_for_single_call: self.force_batch_for_single_call,
            error_mode: self.error_mode,
            name: self.name.clone(),
        }
    }
}

impl<P, R> MicroBatcher<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    /// Wrap a single-item async operation taking one payload.
    pub fn new<F, Fut, E>(operation: F) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::from_operation(Arc::new(operation))
    }

    /// Wrap an async operation of several positional arguments.
    ///
    /// The payload becomes the argument tuple, e.g. `(UserInfo, RequestOptions)`.
    pub fn spread<F, Fut, E>(operation: F) -> Self
    where
        F: Spread<P, Fut> + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self::new(move |args: P| operation.apply(args))
    }

    /// Wrap an already type-erased operation (e.g. a stateful client).
    pub fn from_operation(operation: Arc<dyn SingleOperation<P, R>>) -> Self {
        Self {
            operation,
            resolver: None,
            flush_interval: None,
            size_threshold: None,
            force_batch_for_single_call: false,
            error_mode: ErrorMode::default(),
            name: None,
        }
    }

    /// Attach a batch resolver.
    ///
    /// It receives the payloads of a group in arrival order and must return one
    /// result per payload in the same order.
    pub fn batch_resolver<F, Fut, E>(self, resolver: F) -> Self
    where
        F: Fn(Vec<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Vec<R>, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.with_resolver(Arc::new(resolver))
    }

    /// Attach a batch resolver together with its batching options.
    pub fn batch_resolver_with_options<F, Fut, E>(self, resolver: F, options: &BatchOptions) -> Self
    where
        F: Fn(Vec<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Vec<R>, E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.batch_resolver(resolver).options(options)
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn BatchResolver<P, R>>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Time window before an automatic flush.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Flush early once this many calls are queued.
    pub fn size_threshold(mut self, n: usize) -> Self {
        self.size_threshold = Some(n);
        self
    }

    /// Send a lone drained call through the batch resolver too.
    pub fn force_batch_for_single_call(mut self, force: bool) -> Self {
        self.force_batch_for_single_call = force;
        self
    }

    pub fn error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Overlay serialized or env-sourced options; unset fields are left alone.
    pub fn options(mut self, options: &BatchOptions) -> Self {
        if let Some(ms) = options.flush_interval_ms {
            self.flush_interval = Some(Duration::from_millis(ms));
        }
        if let Some(n) = options.size_threshold {
            self.size_threshold = Some(n);
        }
        if let Some(f) = options.force_batch_for_single_call {
            self.force_batch_for_single_call = f;
        }
        if let Some(m) = options.error_mode {
            self.error_mode = m;
        }
        self
    }

    /// Name used in log fields.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The configuration `build` will use.
    pub fn config(&self) -> BatchConfig {
        let default_interval = if self.resolver.is_some() {
            DEFAULT_FLUSH_INTERVAL
        } else {
            Duration::ZERO
        };
        BatchConfig {
            flush_interval: self.flush_interval.unwrap_or(default_interval),
            size_threshold: self.size_threshold,
            force_batch_for_single_call: self.force_batch_for_single_call,
            error_mode: self.error_mode,
        }
    }

    /// Build the batched function.
    pub fn build(self) -> Result<BatchedFn<P, R>> {
        let config = self.config();
        config.validate()?;

        let name: Arc<str> = match self.name {
            Some(n) => Arc::from(n),
            None => Arc::from(format!(
                "micro_batcher#{}",
                INSTANCE_SEQ.fetch_add(1, Ordering::Relaxed)
            )),
        };
        let stats = Arc::new(StatsRecorder::default());
        let dispatcher = Dispatcher::new(
            self.operation,
            self.resolver,
            config.force_batch_for_single_call,
            config.error_mode,
            Arc::clone(&stats),
            Arc::clone(&name),
        );
        tracing::debug!(batcher = %name, ?config, "batched function built");
        Ok(BatchedFn::new(Arc::new(Scheduler::new(
            config, dispatcher, stats, name,
        ))))
    }
}
