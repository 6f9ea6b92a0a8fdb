//! Group dispatcher: batch path vs. single path, result demultiplexing.

use super::cell::ResultCell;
use super::config::ErrorMode;
use super::ledger::{BatchGroup, PendingCall};
use super::operation::{BatchResolver, SingleOperation};
use super::stats::StatsRecorder;
use super::{BATCH_RESOLVER_SOURCE, SINGLE_OPERATION_SOURCE};
use crate::error::BoxError;
use crate::{Error, ErrorContext};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// How a drained group gets resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPath {
    /// One batch resolver invocation for the whole group.
    Batch,
    /// One single-item invocation per call.
    Single,
}

pub(crate) struct Dispatcher<P, R> {
    operation: Arc<dyn SingleOperation<P, R>>,
    resolver: Option<Arc<dyn BatchResolver<P, R>>>,
    force_batch_for_single_call: bool,
    error_mode: ErrorMode,
    stats: Arc<StatsRecorder>,
    name: Arc<str>,
}

impl<P, R> Dispatcher<P, R>
where
    P: Send + 'static,
    R: Send + 'static,
{
    pub(crate) fn new(
        operation: Arc<dyn SingleOperation<P, R>>,
        resolver: Option<Arc<dyn BatchResolver<P, R>>>,
        force_batch_for_single_call: bool,
        error_mode: ErrorMode,
        stats: Arc<StatsRecorder>,
        name: Arc<str>,
    ) -> Self {
        Self {
            operation,
            resolver,
            force_batch_for_single_call,
            error_mode,
            stats,
            name,
        }
    }

    pub(crate) fn path_for(&self, group_len: usize) -> DispatchPath {
        let qualifies = group_len > 1 || (group_len == 1 && self.force_batch_for_single_call);
        if self.resolver.is_some() && qualifies {
            DispatchPath::Batch
        } else {
            DispatchPath::Single
        }
    }

    /// Start resolving `group` on `runtime`; returns without waiting for any result.
    pub(crate) fn dispatch(&self, runtime: &Handle, group_id: u64, group: BatchGroup<P, R>) {
        if group.is_empty() {
            return;
        }
        let path = self.path_for(group.len());
        debug!(batcher = %self.name, group_id, size = group.len(), ?path, "dispatching group");

        match (path, &self.resolver) {
            (DispatchPath::Batch, Some(resolver)) => {
                self.stats.record_batch_invocation();
                let guard = self.stats.in_flight_guard();
                runtime.spawn(run_batch(
                    Arc::clone(resolver),
                    group,
                    self.error_mode,
                    Arc::clone(&self.stats),
                    Arc::clone(&self.name),
                    group_id,
                    guard,
                ));
            }
            _ => {
                for call in group {
                    self.stats.record_single_invocation();
                    let guard = self.stats.in_flight_guard();
                    runtime.spawn(run_single(
                        Arc::clone(&self.operation),
                        call,
                        self.error_mode,
                        Arc::clone(&self.stats),
                        guard,
                    ));
                }
            }
        }
    }
}

async fn run_batch<P, R>(
    resolver: Arc<dyn BatchResolver<P, R>>,
    group: BatchGroup<P, R>,
    error_mode: ErrorMode,
    stats: Arc<StatsRecorder>,
    name: Arc<str>,
    group_id: u64,
    _guard: super::stats::InFlightGuard,
) where
    P: Send + 'static,
    R: Send + 'static,
{
    let (payloads, cells): (Vec<P>, Vec<ResultCell<R>>) =
        group.into_iter().map(PendingCall::into_parts).unzip();
    let expected = cells.len();

    let outcome = AssertUnwindSafe(resolver.resolve(payloads))
        .catch_unwind()
        .await;

    let error = match outcome {
        Ok(Ok(results)) if results.len() == expected => {
            for (cell, value) in cells.into_iter().zip(results) {
                cell.settle(value);
            }
            return;
        }
        Ok(Ok(results)) => {
            warn!(batcher = %name, group_id, expected, actual = results.len(), "batch resolver broke the one-result-per-payload contract");
            Error::ResolverContract {
                expected,
                actual: results.len(),
            }
        }
        Ok(Err(e)) => {
            warn!(batcher = %name, group_id, size = expected, error = %e, "batch resolver failed");
            batch_error(error_mode, expected, e)
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(batcher = %name, group_id, size = expected, %message, "batch resolver panicked");
            Error::Panicked {
                origin: BATCH_RESOLVER_SOURCE,
                message,
            }
        }
    };

    stats.record_failures(expected);
    for cell in cells {
        cell.settle_with_error(error.clone());
    }
}

async fn run_single<P, R>(
    operation: Arc<dyn SingleOperation<P, R>>,
    call: PendingCall<P, R>,
    error_mode: ErrorMode,
    stats: Arc<StatsRecorder>,
    _guard: super::stats::InFlightGuard,
) where
    P: Send + 'static,
    R: Send + 'static,
{
    let (payload, cell) = call.into_parts();
    let outcome = AssertUnwindSafe(operation.call(payload))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(value)) => cell.settle(value),
        Ok(Err(e)) => {
            stats.record_failures(1);
            cell.settle_with_error(item_error(error_mode, e));
        }
        Err(panic) => {
            stats.record_failures(1);
            cell.settle_with_error(Error::Panicked {
                origin: SINGLE_OPERATION_SOURCE,
                message: panic_message(panic.as_ref()),
            });
        }
    }
}

pub(crate) fn item_error(mode: ErrorMode, e: BoxError) -> Error {
    match mode {
        ErrorMode::Preserve => Error::Operation(Arc::from(e)),
        ErrorMode::Wrap => Error::runtime_with_context(
            e.to_string(),
            ErrorContext::new().with_source(SINGLE_OPERATION_SOURCE),
        ),
    }
}

pub(crate) fn batch_error(mode: ErrorMode, group_size: usize, e: BoxError) -> Error {
    match mode {
        ErrorMode::Preserve => Error::Batch {
            group_size,
            source: Arc::from(e),
        },
        ErrorMode::Wrap => Error::runtime_with_context(
            e.to_string(),
            ErrorContext::new()
                .with_source(BATCH_RESOLVER_SOURCE)
                .with_details(format!("group of {} calls", group_size)),
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
