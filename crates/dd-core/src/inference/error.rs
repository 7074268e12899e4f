//! Errors raised by the inference engine.

use dd_math::ConvergenceError;
use thiserror::Error;

/// Errors from p-value, scaling, and interval computations.
///
/// Degenerate but valid inputs never produce an error; they take closed-form
/// branches and return sentinel values (`0`, `+inf`, `[0, 0]`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("{routine} did not converge within {iterations} iterations")]
    NonConvergence {
        routine: &'static str,
        iterations: usize,
    },

    #[error("invalid input for {field}: {message}")]
    InvalidInput {
        field: &'static str,
        message: String,
    },
}

impl StatsError {
    pub(crate) fn non_convergence(routine: &'static str, iterations: usize) -> Self {
        StatsError::NonConvergence {
            routine,
            iterations,
        }
    }

    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        StatsError::InvalidInput {
            field,
            message: message.into(),
        }
    }

    /// True for iteration-cap failures, as opposed to rejected input.
    pub fn is_non_convergence(&self) -> bool {
        matches!(self, StatsError::NonConvergence { .. })
    }
}

impl From<ConvergenceError> for StatsError {
    fn from(err: ConvergenceError) -> Self {
        StatsError::NonConvergence {
            routine: err.routine,
            iterations: err.iterations,
        }
    }
}

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, StatsError>;
