//! Domain error model.

use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic business failure.
///
/// Network and storage failures are not domain errors; collaborator crates
/// wrap this type in their own error enums next to their transient variants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input rejected (blank name, empty bundle, out-of-range policy value).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A rule that must always hold would be broken (duplicate product lines).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found")]
    NotFound,

    /// The requested change already happened (second fulfill, reused id).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        assert_eq!(
            DomainError::conflict("exchange already fulfilled").to_string(),
            "conflict: exchange already fulfilled"
        );
        assert_eq!(DomainError::not_found().to_string(), "not found");
        assert!(DomainError::conflict("x").is_conflict());
        assert!(!DomainError::validation("x").is_conflict());
    }
}
