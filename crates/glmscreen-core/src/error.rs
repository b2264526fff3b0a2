// =============================================================================
// Error Types
// =============================================================================
//
// One error enum for the whole library. Every fallible function returns
// `Result<T>` and propagates with `?`.
//
// Two families of failures matter to the screening loop:
//
//   - FIT ERRORS: the estimator could not produce coefficients at all
//     (shape problems, empty input, singular systems). These abort a run.
//   - STRUCTURAL ERRORS: malformed candidate batches, duplicate column
//     labels, a failing batch source. These abort a run too.
//
// Non-convergence is NOT an error. It is reported through `converged` flags
// on fit results and through the screening result status.
//
// =============================================================================

use thiserror::Error;

/// Errors produced by glmscreen.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GlmScreenError {
    /// Array shapes don't line up (e.g. X has 10 rows but y has 12 values).
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// An input that must have data has none.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// A value is outside its valid domain (negative weight, NaN, ...).
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// A linear system could not be solved.
    #[error("linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// A candidate batch does not match the response or its own labels.
    #[error("malformed candidate batch: {0}")]
    MalformedBatch(String),

    /// The same column label was presented twice.
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// The batch source failed while producing a batch.
    #[error("batch source failed: {0}")]
    Source(String),
}

impl GlmScreenError {
    /// True if this error came out of the estimator rather than from the
    /// screening inputs.
    pub fn is_fit_error(&self) -> bool {
        matches!(
            self,
            GlmScreenError::DimensionMismatch(_)
                | GlmScreenError::EmptyInput(_)
                | GlmScreenError::InvalidValue(_)
                | GlmScreenError::LinearAlgebraError(_)
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GlmScreenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_detail() {
        let err = GlmScreenError::MalformedBatch("batch 3 has 99 rows, expected 100".to_string());
        assert_eq!(
            err.to_string(),
            "malformed candidate batch: batch 3 has 99 rows, expected 100"
        );
    }

    #[test]
    fn test_fit_error_classification() {
        assert!(GlmScreenError::LinearAlgebraError("singular".into()).is_fit_error());
        assert!(GlmScreenError::EmptyInput("y".into()).is_fit_error());
        assert!(!GlmScreenError::DuplicateColumn("var1".into()).is_fit_error());
        assert!(!GlmScreenError::Source("io".into()).is_fit_error());
    }
}
