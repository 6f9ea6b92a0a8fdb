//! # micro-batcher
//!
//! Transparent micro-batching for async functions.
//!
//! ## Overview
//!
//! Wrap an existing single-item async operation so that concurrent calls made
//! within a short window (or up to a configured count) are coalesced into one
//! group, resolved together by a batch resolver, and demultiplexed back to each
//! caller's own result. Callers keep calling a function of the original shape
//! and never see that batching happened.
//!
//! ## Core Behaviour
//!
//! - **Arrival order**: groups are drained strictly FIFO, and the batch resolver's
//!   results are routed back by position.
//! - **Failure isolation**: a failing single-item call only fails its own caller;
//!   a failing batch resolver fails every caller of that group and no one else.
//! - **Per-instance state**: every `build()` produces an isolated instance with
//!   its own queue and timer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use micro_batcher::prelude::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> micro_batcher::Result<()> {
//!     let double = MicroBatcher::new(|n: u64| async move { Ok::<_, String>(n * 2) })
//!         .batch_resolver(|ns: Vec<u64>| async move {
//!             Ok::<_, String>(ns.into_iter().map(|n| n * 2).collect::<Vec<_>>())
//!         })
//!         .flush_interval(Duration::from_millis(200))
//!         .size_threshold(3)
//!         .build()?;
//!
//!     let pending: Vec<_> = (1..=5).map(|n| double.call(n)).collect();
//!     for p in pending {
//!         println!("{}", p.await?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Ledger, result cells, configuration, operation traits, stats |
//! | [`facade`] | `MicroBatcher` builder and the `BatchedFn` callable |
//! | [`error`] | Unified error type |

pub mod batch;
pub mod facade;

pub use facade::prelude;

// Re-export main types for convenience
pub use batch::{BatchConfig, BatchOptions, BatcherStats, ErrorMode, PendingResult};
pub use facade::{BatchedFn, MicroBatcher};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{BoxError, Error, ErrorContext, SharedError};
