//! Developer-facing facade.
//!
//! [`MicroBatcher`] binds a single-item operation, an optional batch resolver and
//! a configuration into one isolated instance; [`BatchedFn`] is the callable it
//! returns.

mod batched_fn;
mod builder;
pub mod prelude;

pub use batched_fn::BatchedFn;
pub use builder::MicroBatcher;
