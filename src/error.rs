use std::sync::Arc;
use thiserror::Error;

/// Boxed error accepted from the wrapped operations.
///
/// Anything convertible into this (concrete `std` errors, `String`, `&str`,
/// `anyhow::Error`) can be returned by a single-item operation or a batch resolver.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Reference-counted error so one batch failure can be handed to every caller in the group.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Configuration key that caused the error (e.g., "size_threshold")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected value, group size)
    pub details: Option<String>,
    /// Source of the error (e.g., "single_operation", "batch_resolver")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type delivered to callers of a batched function.
///
/// Cloneable: a failing batch settles every member of its group with the same error.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Operation failed: {0}")]
    Operation(#[source] SharedError),

    #[error("Batch resolver failed for a group of {group_size} calls: {source}")]
    Batch {
        group_size: usize,
        #[source]
        source: SharedError,
    },

    #[error(
        "Batch resolver returned {actual} results for {expected} payloads; results must map one-to-one"
    )]
    ResolverContract { expected: usize, actual: usize },

    #[error("{origin} panicked: {message}")]
    Panicked { origin: &'static str, message: String },

    #[error("Result cell dropped before it was settled")]
    Abandoned,

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The collaborator's original error, when it was preserved.
    pub fn original(&self) -> Option<&SharedError> {
        match self {
            Error::Operation(source) | Error::Batch { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Downcast the preserved collaborator error to its concrete type.
    pub fn downcast_ref<T: std::error::Error + 'static>(&self) -> Option<&T> {
        self.original().and_then(|e| e.downcast_ref::<T>())
    }

    /// True when the whole group failed together (resolver error, contract violation).
    pub fn is_group_failure(&self) -> bool {
        match self {
            Error::Batch { .. } | Error::ResolverContract { .. } => true,
            Error::Runtime { context, .. } => {
                context.source.as_deref() == Some(crate::batch::BATCH_RESOLVER_SOURCE)
            }
            _ => false,
        }
    }
}
