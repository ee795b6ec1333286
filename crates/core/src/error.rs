//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only. Transport and storage problems have
/// their own error types in the infrastructure crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An order, stock record, entry or counterparty does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A required field is missing or blank, an amount is out of range, an
    /// enum label is unrecognized, or a date range is inverted.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The aggregate is in a state that does not allow the operation
    /// (e.g. mutating an order that is no longer PENDING).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A concurrent write won the race (stale aggregate version).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

/// Reject blank strings for required text fields.
pub fn require_non_blank(value: &str, field: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::invalid_argument(format!("{field} must not be blank")));
    }
    Ok(())
}
