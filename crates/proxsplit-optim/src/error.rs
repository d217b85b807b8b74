//! Solver-level errors.

use proxsplit_core::ProxError;
use thiserror::Error;

/// Errors raised while configuring or running the splitting solver.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    /// An option is outside its admissible range.
    ///
    /// Raised by `SolverOptions::validate` before any iteration runs.
    #[error("Invalid configuration: {reason} (parameter: {parameter}, value: {value})")]
    InvalidConfiguration {
        /// Why the value is rejected
        reason: String,
        /// Option name
        parameter: String,
        /// Offending value, formatted
        value: String,
    },

    /// The envelope line search ran out of trials.
    ///
    /// Not fatal: the solver answers it with a plain forward-backward step.
    #[error("Line search exhausted after {trials} trials (last step size {last_step_size})")]
    LineSearchExhausted {
        /// Number of trial points evaluated
        trials: usize,
        /// Last step size tried
        last_step_size: f64,
    },

    /// Failure reported by the problem data: operators, functions or prox.
    #[error(transparent)]
    Problem(#[from] ProxError),
}

impl SolverError {
    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, V>(reason: S1, parameter: S2, value: V) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        V: std::fmt::Display,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    /// Create a LineSearchExhausted error.
    pub fn line_search_exhausted(trials: usize, last_step_size: f64) -> Self {
        Self::LineSearchExhausted {
            trials,
            last_step_size,
        }
    }

    /// True when the underlying cause is a non-finite computation.
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::Problem(e) if e.is_numerical())
    }
}

/// Result type alias for solver operations.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Alias kept for call sites that already import the core `Result`.
pub type SolverResultOf<T> = std::result::Result<T, SolverError>;
