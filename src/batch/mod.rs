//! # Batching Engine
//!
//! Coalesces individual calls into groups and resolves each group either through
//! a batch resolver or one single-item call per payload.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Ledger`] | FIFO of pending calls with atomic bounded drains |
//! | [`ResultCell`] / [`PendingResult`] | Single-assignment settlement slot and its awaitable side |
//! | [`BatchConfig`] | Flush interval, size threshold, single-call forcing, error mode |
//! | [`BatchOptions`] | Serializable/env-sourced overlay for [`BatchConfig`] |
//! | [`SingleOperation`] / [`BatchResolver`] | The two wrapped operations |
//! | [`BatcherStats`] | Flush and invocation counters |
//!
//! The scheduler and dispatcher are internal; they are driven through
//! [`crate::facade::BatchedFn`].
//!
//! ## Flush rules
//!
//! - The first call into an idle instance arms a timer for `flush_interval`;
//!   when it fires, the whole ledger becomes one group.
//! - With a `size_threshold` of `K`, the call that brings the ledger to `K`
//!   cancels the timer and flushes exactly `K` calls at once.
//! - A group of more than one call (or exactly one, when forced) goes to the
//!   batch resolver if one is configured; otherwise every call runs through
//!   the single-item operation independently.
//!
//! ```rust
//! use micro_batcher::batch::{BatchConfig, Ledger};
//! use std::time::Duration;
//!
//! let config = BatchConfig::for_resolver().with_size_threshold(3);
//! assert_eq!(config.flush_interval, Duration::from_millis(50));
//!
//! let ledger: Ledger<u32, u32> = Ledger::new();
//! let (_pending, size) = ledger.enqueue(7);
//! assert_eq!(size, 1);
//! assert_eq!(ledger.drain(None).len(), 1);
//! ```

mod cell;
mod config;
mod dispatcher;
mod ledger;
mod operation;
pub(crate) mod scheduler;
mod stats;

pub use cell::{result_cell, PendingResult, ResultCell};
pub use config::{
    BatchConfig, BatchOptions, ErrorMode, DEFAULT_FLUSH_INTERVAL, ENV_FLUSH_INTERVAL_MS,
    ENV_FORCE_BATCH, ENV_SIZE_THRESHOLD,
};
pub use dispatcher::DispatchPath;
pub use ledger::{BatchGroup, Ledger, PendingCall};
pub use operation::{BatchResolver, SingleOperation, Spread};
pub use stats::{BatcherStats, FlushTrigger};

pub(crate) use dispatcher::Dispatcher;
pub(crate) use stats::StatsRecorder;

/// Error context source for failures raised by the single-item operation.
pub const SINGLE_OPERATION_SOURCE: &str = "single_operation";
/// Error context source for failures raised by the batch resolver.
pub const BATCH_RESOLVER_SOURCE: &str = "batch_resolver";
