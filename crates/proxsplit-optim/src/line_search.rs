//! Backtracking line search on the forward-backward envelope.
//!
//! ## Armijo Condition
//!
//! A step `τ` along a descent direction `d` is accepted when
//!
//! ```text
//! φ_γ(x + τ d) ≤ φ_γ(x) + c₁ τ ⟨∇φ_γ(x), d⟩
//! ```
//!
//! Trials start at `τ = 1`, which is the full quasi-Newton step, and shrink
//! geometrically by `ρ`. The envelope is evaluated through an
//! [`EvaluationCache`], so the accepted trial point arrives at the caller
//! with its prox, residual and envelope value already computed.

use crate::{
    cache::EvaluationCache,
    error::{Result, SolverError},
};
use nalgebra::DVector;
use proxsplit_core::{
    core::{
        error::ProxError,
        function::{ProximalFunction, SmoothFunction},
        types::Scalar,
    },
};

/// Accepted trial.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSearchOutcome<T: Scalar> {
    /// `x + τ d`
    pub point: DVector<T>,
    /// Accepted `τ`
    pub step: T,
    /// Envelope value at `point`
    pub envelope_value: T,
    /// Trials evaluated, the accepted one included
    pub trials: usize,
}

/// Armijo backtracking with a bounded number of trials.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeLineSearch<T: Scalar> {
    /// Maximum number of trial points
    pub max_trials: usize,
    /// Shrink factor `ρ ∈ (0, 1)`
    pub backtrack_factor: T,
    /// Armijo constant `c₁ ∈ (0, 1)`
    pub sufficient_decrease: T,
}

impl<T: Scalar> Default for EnvelopeLineSearch<T> {
    fn default() -> Self {
        Self {
            max_trials: 20,
            backtrack_factor: <T as Scalar>::from_f64(0.5),
            sufficient_decrease: <T as Scalar>::from_f64(1e-4),
        }
    }
}

impl<T: Scalar> EnvelopeLineSearch<T> {
    pub fn new(max_trials: usize, backtrack_factor: T, sufficient_decrease: T) -> Self {
        Self {
            max_trials,
            backtrack_factor,
            sufficient_decrease,
        }
    }

    /// Searches along `direction` from `point`.
    ///
    /// `envelope_value` and `slope` are `φ_γ(x)` and `⟨∇φ_γ(x), d⟩`. The
    /// candidate cache is left holding the last trial point.
    ///
    /// # Errors
    ///
    /// * `LineSearchExhausted` after `max_trials` rejected trials.
    /// * `InvalidParameter` when `slope` is not negative.
    /// * Any failure evaluating the envelope at a trial point.
    pub fn search<F, G>(
        &self,
        candidate: &mut EvaluationCache<'_, T, F, G>,
        point: &DVector<T>,
        direction: &DVector<T>,
        envelope_value: T,
        slope: T,
        gamma: T,
    ) -> Result<LineSearchOutcome<T>>
    where
        F: SmoothFunction<T> + ?Sized,
        G: ProximalFunction<T> + ?Sized,
    {
        if !(slope < T::zero()) {
            return Err(ProxError::invalid_parameter(format!(
                "line search needs a descent direction (slope {})",
                slope
            ))
            .into());
        }

        let mut step = T::one();
        for trial in 1..=self.max_trials {
            let trial_point = point + direction * step;
            let value = candidate.envelope_value(&trial_point, gamma)?;
            if value <= envelope_value + self.sufficient_decrease * step * slope {
                return Ok(LineSearchOutcome {
                    point: trial_point,
                    step,
                    envelope_value: value,
                    trials: trial,
                });
            }
            step *= self.backtrack_factor;
        }

        let last = step / self.backtrack_factor;
        Err(SolverError::line_search_exhausted(
            self.max_trials,
            <T as Scalar>::to_f64(last),
        ))
    }
}
