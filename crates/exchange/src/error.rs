use thiserror::Error;

use fieldrep_core::DomainError;

/// Failure of a bundle recommendation run.
///
/// Empty results (no removals, no eligible products, nothing within tolerance)
/// are not errors; they are reported through `RecommendationOutcome`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecommendError {
    #[error("invalid target policy: {0}")]
    InvalidPolicy(DomainError),

    #[error("calculation aborted")]
    Aborted,
}
