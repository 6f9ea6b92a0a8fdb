//! Batch configuration.

use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Flush window applied when a batch resolver is configured without an explicit interval.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(50);

pub const ENV_FLUSH_INTERVAL_MS: &str = "MICRO_BATCHER_FLUSH_INTERVAL_MS";
pub const ENV_SIZE_THRESHOLD: &str = "MICRO_BATCHER_SIZE_THRESHOLD";
pub const ENV_FORCE_BATCH: &str = "MICRO_BATCHER_FORCE_BATCH";

/// How collaborator failures are surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Keep the original error reachable via [`Error::downcast_ref`].
    #[default]
    Preserve,
    /// Flatten the failure into [`Error::Runtime`], keeping only its message.
    Wrap,
}

/// Immutable per-instance configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub flush_interval: Duration,
    pub size_threshold: Option<usize>,
    pub force_batch_for_single_call: bool,
    pub error_mode: ErrorMode,
}

impl Default for BatchConfig {
    /// Configuration for an operation without a batch resolver: flush on the next tick.
    fn default() -> Self {
        Self {
            flush_interval: Duration::ZERO,
            size_threshold: None,
            force_batch_for_single_call: false,
            error_mode: ErrorMode::Preserve,
        }
    }
}

impl BatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults used once a batch resolver is attached.
    pub fn for_resolver() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            ..Self::default()
        }
    }

    pub fn with_flush_interval(mut self, d: Duration) -> Self {
        self.flush_interval = d;
        self
    }
    pub fn with_size_threshold(mut self, n: usize) -> Self {
        self.size_threshold = Some(n);
        self
    }
    pub fn with_force_batch_for_single_call(mut self, f: bool) -> Self {
        self.force_batch_for_single_call = f;
        self
    }
    pub fn with_error_mode(mut self, m: ErrorMode) -> Self {
        self.error_mode = m;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.size_threshold == Some(0) {
            return Err(Error::configuration_with_context(
                "size threshold must be a positive integer",
                ErrorContext::new()
                    .with_field_path("size_threshold")
                    .with_details("got 0"),
            ));
        }
        Ok(())
    }
}

/// Serializable batching options, every field optional.
///
/// ```rust
/// use micro_batcher::batch::BatchOptions;
///
/// let opts: BatchOptions =
///     serde_json::from_str(r#"{"flush_interval_ms": 200, "size_threshold": 3}"#).unwrap();
/// assert_eq!(opts.size_threshold, Some(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    pub flush_interval_ms: Option<u64>,
    pub size_threshold: Option<usize>,
    pub force_batch_for_single_call: Option<bool>,
    pub error_mode: Option<ErrorMode>,
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from the environment:
    /// - `MICRO_BATCHER_FLUSH_INTERVAL_MS`
    /// - `MICRO_BATCHER_SIZE_THRESHOLD`
    /// - `MICRO_BATCHER_FORCE_BATCH` (`true`/`false`)
    ///
    /// Unset or unparsable variables are left as `None`.
    pub fn from_env() -> Self {
        Self {
            flush_interval_ms: std::env::var(ENV_FLUSH_INTERVAL_MS)
                .ok()
                .and_then(|s| s.trim().parse::<u64>().ok()),
            size_threshold: std::env::var(ENV_SIZE_THRESHOLD)
                .ok()
                .and_then(|s| s.trim().parse::<usize>().ok()),
            force_batch_for_single_call: std::env::var(ENV_FORCE_BATCH)
                .ok()
                .and_then(|s| s.trim().parse::<bool>().ok()),
            error_mode: None,
        }
    }

    pub fn with_flush_interval_ms(mut self, ms: u64) -> Self {
        self.flush_interval_ms = Some(ms);
        self
    }
    pub fn with_size_threshold(mut self, n: usize) -> Self {
        self.size_threshold = Some(n);
        self
    }
    pub fn with_force_batch_for_single_call(mut self, f: bool) -> Self {
        self.force_batch_for_single_call = Some(f);
        self
    }
    pub fn with_error_mode(mut self, m: ErrorMode) -> Self {
        self.error_mode = Some(m);
        self
    }
}
