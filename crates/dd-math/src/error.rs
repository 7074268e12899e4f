//! Error types shared by the iterative routines.

use thiserror::Error;

/// An iterative routine hit its iteration cap before reaching its
/// precision target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{routine} did not converge within {iterations} iterations")]
pub struct ConvergenceError {
    /// Name of the routine that gave up.
    pub routine: &'static str,
    /// Iterations performed before giving up.
    pub iterations: usize,
}
