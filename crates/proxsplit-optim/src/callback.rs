//! Per-iteration callbacks.
//!
//! After every completed iteration the solver hands an [`IterationInfo`] to
//! its callback, which answers with a [`CallbackAction`]. Closures
//! `FnMut(&IterationInfo<T>) -> CallbackAction` are callbacks too.

use crate::result::SolverResult;
use nalgebra::DVector;
use proxsplit_core::core::types::Scalar;
use std::time::Duration;

/// Snapshot of the solver after an iteration.
#[derive(Debug, Clone, Copy)]
pub struct IterationInfo<'a, T: Scalar> {
    /// Iterations completed so far
    pub iteration: usize,
    /// New iterate
    pub point: &'a DVector<T>,
    /// Residual at the previous iterate
    pub residual_norm: T,
    /// Envelope value at the new iterate, when the line search computed it
    pub envelope_value: Option<T>,
    pub step_size: T,
    /// Accepted line-search step, `None` after a fallback step
    pub line_search_step: Option<T>,
    pub elapsed: Duration,
}

/// What the solver does after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallbackAction {
    #[default]
    Continue,
    /// Forget the quasi-Newton history and the best iterate, keep the point
    Restart,
    /// End the run with `TerminationStatus::Stopped`
    Stop,
}

/// Observer of a solver run.
pub trait SolverCallback<T: Scalar> {
    /// Called once before the first iteration.
    fn on_solve_start(&mut self, initial_point: &DVector<T>) {
        let _ = initial_point;
    }

    /// Called after each completed iteration.
    fn on_iteration_end(&mut self, info: &IterationInfo<'_, T>) -> CallbackAction;

    /// Called once with the final result.
    fn on_solve_end(&mut self, result: &SolverResult<T>) {
        let _ = result;
    }
}

impl<T, C> SolverCallback<T> for C
where
    T: Scalar,
    C: FnMut(&IterationInfo<'_, T>) -> CallbackAction,
{
    fn on_iteration_end(&mut self, info: &IterationInfo<'_, T>) -> CallbackAction {
        self(info)
    }
}

/// Callback that never intervenes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl<T: Scalar> SolverCallback<T> for NoOpCallback {
    fn on_iteration_end(&mut self, _info: &IterationInfo<'_, T>) -> CallbackAction {
        CallbackAction::Continue
    }
}

/// Records `(iteration, residual_norm)` after every iteration.
#[derive(Debug, Clone, Default)]
pub struct ResidualRecorder<T: Scalar> {
    pub residuals: Vec<(usize, T)>,
}

impl<T: Scalar> ResidualRecorder<T> {
    pub fn new() -> Self {
        Self { residuals: Vec::new() }
    }
}

impl<T: Scalar> SolverCallback<T> for ResidualRecorder<T> {
    fn on_iteration_end(&mut self, info: &IterationInfo<'_, T>) -> CallbackAction {
        self.residuals.push((info.iteration, info.residual_norm));
        CallbackAction::Continue
    }
}
