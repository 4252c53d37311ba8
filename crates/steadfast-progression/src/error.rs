//! Error types for progression operations.

use thiserror::Error;

/// Errors returned by the progression engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Caller supplied an argument the engine refuses (negative delta, malformed action)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Catalog or per-user lookup failed
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What kind of entry was looked up
        kind: &'static str,
        /// The id that was not found
        id: String,
    },

    /// Reference data violates a structural invariant
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    /// Creates a `NotFound` error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Creates an `InvalidArgument` error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Creates an `InvariantViolation` error.
    #[must_use]
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation(message.into())
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
