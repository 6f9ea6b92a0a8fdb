//! Minimal prelude for application code.
//!
//! Goal: reduce import noise without hiding important concepts.

pub use crate::batch::{BatchOptions, BatchResolver, BatcherStats, ErrorMode, PendingResult, SingleOperation};
pub use crate::facade::{BatchedFn, MicroBatcher};
pub use crate::{Error, Result};
