//! Errors surfaced by the solver's programmatic API.
use thiserror::Error;

/// Errors returned by [`crate::solver::Solver`].
///
/// Propagation conflicts, tautologies, duplicate literals and reason-clause flushing are handled
/// internally and never surface here; see the crate documentation for which failures are
/// recoverable by the caller versus fatal for the call that produced them.
#[derive(Debug, Error)]
pub enum SolverError {
    /// A literal was zero, or its variable exceeded the solver's variable count.
    #[error("invalid literal {lit} (variable count is {var_count})")]
    InvalidLiteral { lit: isize, var_count: usize },

    /// An API call was made in a state that does not allow it.
    #[error("invalid solver state: {0}")]
    InvalidState(&'static str),

    /// An allocation failed, e.g. a clause reference or variable index would overflow its backing
    /// integer type.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(&'static str),

    /// Malformed DIMACS input.
    #[error(transparent)]
    Parse(#[from] cdclsat_dimacs::ParserError),

    /// An I/O error occurred while reading a formula.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
