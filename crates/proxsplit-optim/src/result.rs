//! Solver states and the result of a run.

use crate::error::SolverError;
use nalgebra::DVector;
use proxsplit_core::core::types::Scalar;
use std::{fmt, time::Duration};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminationStatus {
    /// Fixed-point residual below tolerance
    Converged,
    /// Iteration cap hit; the point is the best one seen
    MaxIterationsReached,
    /// Wall-clock budget spent; the point is the best one seen
    MaxTimeReached,
    /// A callback asked to stop
    Stopped,
    /// Numerical failure after the first iterate; the point is the last good one
    Failed,
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Converged => "converged",
            Self::MaxIterationsReached => "maximum iterations reached",
            Self::MaxTimeReached => "maximum time reached",
            Self::Stopped => "stopped by callback",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Lifecycle of a [`SplittingSolver`](crate::SplittingSolver).
///
/// `Initialized → Iterating → {Converged, MaxIterationsReached,
/// MaxTimeReached, Stopped, Failed}`; a restart returns to `Initialized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SolverState {
    #[default]
    Initialized,
    Iterating,
    Converged,
    MaxIterationsReached,
    MaxTimeReached,
    Stopped,
    Failed,
}

impl SolverState {
    /// True for the states a run ends in.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Initialized | Self::Iterating)
    }
}

impl From<TerminationStatus> for SolverState {
    fn from(status: TerminationStatus) -> Self {
        match status {
            TerminationStatus::Converged => Self::Converged,
            TerminationStatus::MaxIterationsReached => Self::MaxIterationsReached,
            TerminationStatus::MaxTimeReached => Self::MaxTimeReached,
            TerminationStatus::Stopped => Self::Stopped,
            TerminationStatus::Failed => Self::Failed,
        }
    }
}

/// Outcome of [`SplittingSolver::solve`](crate::SplittingSolver::solve).
#[derive(Debug, Clone, PartialEq)]
pub struct SolverResult<T: Scalar> {
    /// Returned iterate
    pub point: DVector<T>,

    /// Completed iterations
    pub iterations: usize,

    pub termination: TerminationStatus,

    /// `‖x − z‖` at `point`
    pub residual_norm: T,

    /// `φ_γ(point)` at the final step size
    pub envelope_value: T,

    /// Final proximal step size γ
    pub step_size: T,

    /// Iterations that fell back to the plain forward-backward step
    pub fallback_steps: usize,

    /// Line-search trials over the whole run
    pub line_search_trials: usize,

    pub duration: Duration,

    /// Cause of a `Failed` termination
    pub error: Option<SolverError>,
}

impl<T: Scalar> SolverResult<T> {
    pub fn converged(&self) -> bool {
        self.termination == TerminationStatus::Converged
    }
}
