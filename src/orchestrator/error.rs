//! Error taxonomy of the orchestrator.
//!
//! Expected outcomes are ordinary values the caller must handle;
//! unexpected faults abort the operation as `Upstream`. Nothing here is
//! ever signalled by panicking. The one deliberate absence: a
//! desynchronized workflow after a committed advance is *not* an error
//! variant, because the caller-visible state is already correct. It is
//! recorded through the anomaly sink instead.

use thiserror::Error;

/// Everything an orchestrator operation can fail with.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Malformed or missing input, detected before any write. Never
    /// worth retrying unchanged.
    #[error("validation failed for `{field}`: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Unknown order. Distinct from every token-related failure.
    #[error("order not found: {0}")]
    NotFound(String),

    /// The caller's identity lacks the role or tenant for this
    /// operation. The message never contains credential material.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The operation does not apply to the order's current lifecycle
    /// position, typically an advance with no outstanding token.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Another caller advanced the order first. Retryable: refresh the
    /// order and decide again.
    #[error("order was advanced concurrently; refresh and retry")]
    Conflict,

    /// The store or the workflow engine failed mid-operation.
    #[error("upstream failure during {operation}: {source}")]
    Upstream {
        operation: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl OrchestratorError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn upstream(
        operation: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Upstream {
            operation,
            source: Box::new(source),
        }
    }
}
