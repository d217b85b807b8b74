//! Forward-backward envelope solver with limited-memory quasi-Newton steps.
//!
//! # Algorithm Overview
//!
//! For `min f(A x + b) + g(x)` with step size γ, every iterate `x` defines
//!
//! ```text
//! z = prox_{γg}(x − γ ∇(f∘A)(x))       forward-backward step
//! r = x − z                             fixed-point residual
//! φ_γ(x) = f + g(z) − ⟨∇f, r⟩ + ‖r‖²/(2γ) forward-backward envelope
//! ```
//!
//! `φ_γ` is continuously differentiable and shares its minimisers with the
//! composite objective whenever `γ < 1/L`, so the solver minimises it with
//! L-BFGS directions and an Armijo line search. One iteration:
//!
//! 1. Halve γ while `f(z)` violates the quadratic upper bound at `x`.
//! 2. Stop when `‖r‖ ≤ max(tolerance, relative_tolerance · ‖r₀‖)`.
//! 3. Remember the iterate with the lowest envelope value.
//! 4. Take `d = −H ∇φ_γ(x)` from the history, or `−∇φ_γ(x)` if that is not
//!    a descent direction.
//! 5. Backtrack along `d`; if the search is exhausted take `x⁺ = z`.
//! 6. Store `(x⁺ − x, ∇φ_γ(x⁺) − ∇φ_γ(x))` and move to `x⁺`.
//!
//! Apart from failures, every run returns the forward-backward step `z` of
//! the selected iterate rather than the iterate itself, so the returned
//! point is always in the domain of `g`.
//!
//! Two [`EvaluationCache`]s alternate between the current iterate and the
//! line-search candidate, so the accepted trial point is never evaluated
//! twice.

use crate::{
    cache::EvaluationCache,
    callback::{CallbackAction, IterationInfo, NoOpCallback, SolverCallback},
    error::{Result, SolverError},
    history::HistoryBuffer,
    options::SolverOptions,
    problem::Problem,
    result::{SolverResult, SolverState, TerminationStatus},
};
use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::{
    core::{
        error::ProxError,
        function::{ProximalFunction, SmoothFunction},
        types::Scalar,
    },
    numerical::ensure_finite_vector,
};
use std::time::Instant;

/// Upper bound on consecutive step-size halvings at one iterate.
const MAX_STEP_HALVINGS: usize = 100;

/// Iterate together with the quantities reported for it.
#[derive(Debug, Clone)]
struct Evaluated<T: Scalar> {
    point: DVector<T>,
    residual_norm: T,
    envelope_value: T,
}

#[derive(Debug)]
struct RunCounters {
    iterations: usize,
    fallback_steps: usize,
    line_search_trials: usize,
}

/// How the main loop ended, before the result is assembled.
#[derive(Debug)]
struct Exit<T: Scalar> {
    status: TerminationStatus,
    returned: Evaluated<T>,
    error: Option<SolverError>,
}

/// Proximal splitting solver.
///
/// # Example
///
/// ```rust
/// use nalgebra::DVector;
/// use proxsplit_core::prelude::*;
/// use proxsplit_optim::{Problem, SolverOptions, SplittingSolver};
///
/// #[derive(Debug)]
/// struct HalfSquared;
///
/// impl SmoothFunction<f64> for HalfSquared {
///     fn value_and_gradient(&self, x: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
///         Ok((0.5 * x.norm_squared(), x.clone()))
///     }
/// }
///
/// #[derive(Debug)]
/// struct NoPenalty;
///
/// impl ProximalFunction<f64> for NoPenalty {
///     fn value(&self, _x: &DVector<f64>) -> Result<f64> { Ok(0.0) }
///     fn prox(&self, x: &DVector<f64>, _gamma: f64) -> Result<DVector<f64>> { Ok(x.clone()) }
/// }
///
/// let problem = Problem::new(&HalfSquared, &NoPenalty);
/// let mut solver = SplittingSolver::new(SolverOptions::default()).unwrap();
/// let result = solver.solve(&problem, &DVector::from_vec(vec![3.0, -4.0])).unwrap();
///
/// assert!(result.converged());
/// assert!(result.point.norm() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct SplittingSolver<T: Scalar> {
    options: SolverOptions<T>,
    history: HistoryBuffer<T>,
    state: SolverState,
    step_size: Option<T>,
}

impl<T: Scalar> SplittingSolver<T> {
    /// Creates a solver after validating `options`.
    pub fn new(options: SolverOptions<T>) -> Result<Self> {
        options.validate()?;
        let history = HistoryBuffer::new(options.memory_size)?;
        Ok(Self {
            options,
            history,
            state: SolverState::Initialized,
            step_size: None,
        })
    }

    pub fn options(&self) -> &SolverOptions<T> {
        &self.options
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Step size γ in use, or at the end of the last run.
    pub fn step_size(&self) -> Option<T> {
        self.step_size
    }

    /// Quasi-Newton history as left by the last run.
    pub fn history(&self) -> &HistoryBuffer<T> {
        &self.history
    }

    /// Clears the history and returns to `Initialized`.
    pub fn restart(&mut self) {
        self.history.reset();
        self.state = SolverState::Initialized;
        self.step_size = None;
    }

    /// Minimises `problem` from `initial_point`.
    pub fn solve<F, G>(
        &mut self,
        problem: &Problem<'_, T, F, G>,
        initial_point: &DVector<T>,
    ) -> Result<SolverResult<T>>
    where
        F: SmoothFunction<T> + ?Sized,
        G: ProximalFunction<T> + ?Sized,
    {
        self.solve_with_callback(problem, initial_point, &mut NoOpCallback)
    }

    /// Minimises `problem` from `initial_point`, reporting every iteration
    /// to `callback`.
    ///
    /// # Errors
    ///
    /// Invalid options, data that does not fit `initial_point`, and any
    /// failure evaluating the problem at `initial_point` are returned as
    /// `Err`. Failures at later iterates end the run with
    /// [`TerminationStatus::Failed`] instead.
    pub fn solve_with_callback<F, G, C>(
        &mut self,
        problem: &Problem<'_, T, F, G>,
        initial_point: &DVector<T>,
        callback: &mut C,
    ) -> Result<SolverResult<T>>
    where
        F: SmoothFunction<T> + ?Sized,
        G: ProximalFunction<T> + ?Sized,
        C: SolverCallback<T> + ?Sized,
    {
        let start = Instant::now();
        self.options.validate()?;
        if initial_point.is_empty() {
            return Err(ProxError::invalid_parameter("initial point is empty").into());
        }
        ensure_finite_vector("initial point", initial_point)?;
        problem.validate(initial_point.len())?;
        let lipschitz_bound = problem.lipschitz_bound();

        self.restart();
        let mut current = EvaluationCache::new(problem);
        let mut candidate = EvaluationCache::new(problem);

        let mut gamma = match self.options.initial_step_size {
            Some(gamma) => gamma,
            None => estimate_step_size(problem, &mut current, initial_point)?,
        };
        self.adjust_step_size(lipschitz_bound, &mut current, initial_point, &mut gamma)?;
        let initial = Evaluated {
            point: initial_point.clone(),
            residual_norm: current.residual_norm(initial_point, gamma)?,
            envelope_value: current.envelope_value(initial_point, gamma)?,
        };
        current.envelope_gradient(initial_point, gamma)?;

        let threshold = Float::max(
            self.options.tolerance,
            self.options.relative_tolerance * initial.residual_norm,
        );
        log::debug!(
            "splitting solver start: dim = {}, gamma = {}, residual = {}",
            initial_point.len(),
            gamma,
            initial.residual_norm
        );

        self.state = SolverState::Iterating;
        self.step_size = Some(gamma);
        callback.on_solve_start(initial_point);

        let mut counters = RunCounters {
            iterations: 0,
            fallback_steps: 0,
            line_search_trials: 0,
        };
        let exit = self.iterate(
            lipschitz_bound,
            &mut current,
            &mut candidate,
            initial,
            &mut gamma,
            threshold,
            &mut counters,
            start,
            callback,
        );

        if let Some(error) = &exit.error {
            log::warn!(
                "splitting solver failed after {} iterations: {}",
                counters.iterations,
                error
            );
        } else if exit.status != TerminationStatus::Converged {
            log::warn!(
                "splitting solver did not converge ({}) after {} iterations, residual {}",
                exit.status,
                counters.iterations,
                exit.returned.residual_norm
            );
        } else {
            log::debug!(
                "splitting solver converged after {} iterations, residual {}",
                counters.iterations,
                exit.returned.residual_norm
            );
        }

        self.state = exit.status.into();
        self.step_size = Some(gamma);
        let result = SolverResult {
            point: exit.returned.point,
            iterations: counters.iterations,
            termination: exit.status,
            residual_norm: exit.returned.residual_norm,
            envelope_value: exit.returned.envelope_value,
            step_size: gamma,
            fallback_steps: counters.fallback_steps,
            line_search_trials: counters.line_search_trials,
            duration: start.elapsed(),
            error: exit.error,
        };
        callback.on_solve_end(&result);
        Ok(result)
    }

    /// Main loop. Every failure here turns into a `Failed` exit carrying the
    /// last fully evaluated iterate.
    #[allow(clippy::too_many_arguments, clippy::redundant_closure_call)]
    fn iterate<'c, F, G, C>(
        &mut self,
        lipschitz_bound: Option<T>,
        current: &mut EvaluationCache<'c, T, F, G>,
        candidate: &mut EvaluationCache<'c, T, F, G>,
        initial: Evaluated<T>,
        gamma: &mut T,
        threshold: T,
        counters: &mut RunCounters,
        start: Instant,
        callback: &mut C,
    ) -> Exit<T>
    where
        F: SmoothFunction<T> + ?Sized,
        G: ProximalFunction<T> + ?Sized,
        C: SolverCallback<T> + ?Sized,
    {
        let line_search = self.options.line_search();
        let mut x = initial.point.clone();
        let mut last_good = initial;
        let mut best: Option<Evaluated<T>> = None;

        loop {
            let step = (|| -> Result<Option<Exit<T>>> {
                if self.adjust_step_size(lipschitz_bound, current, &x, gamma)? {
                    self.history.reset();
                    best = None;
                }
                self.step_size = Some(*gamma);

                let residual_norm = current.residual_norm(&x, *gamma)?;
                let envelope_value = current.envelope_value(&x, *gamma)?;
                let evaluated = Evaluated {
                    point: x.clone(),
                    residual_norm,
                    envelope_value,
                };
                last_good = evaluated.clone();

                if residual_norm <= threshold {
                    return Ok(Some(Exit {
                        status: TerminationStatus::Converged,
                        returned: evaluated,
                        error: None,
                    }));
                }

                if best
                    .as_ref()
                    .map_or(true, |b| envelope_value < b.envelope_value)
                {
                    best = Some(evaluated.clone());
                }

                let budget_spent = if counters.iterations >= self.options.max_iterations {
                    Some(TerminationStatus::MaxIterationsReached)
                } else if self
                    .options
                    .max_time
                    .is_some_and(|max_time| start.elapsed() >= max_time)
                {
                    Some(TerminationStatus::MaxTimeReached)
                } else {
                    None
                };
                if let Some(status) = budget_spent {
                    return Ok(Some(Exit {
                        status,
                        returned: best.clone().unwrap_or(evaluated),
                        error: None,
                    }));
                }

                let grad = current.envelope_gradient(&x, *gamma)?;
                let mut direction = self.history.compute_direction(&grad)?;
                let mut slope = grad.dot(&direction);
                if !(slope < T::zero()) {
                    log::debug!(
                        "iteration {}: quasi-Newton direction is not a descent direction, history reset",
                        counters.iterations
                    );
                    self.history.reset();
                    direction = -&grad;
                    slope = -grad.norm_squared();
                }

                let searched = if slope < T::zero() {
                    match line_search.search(candidate, &x, &direction, envelope_value, slope, *gamma)
                    {
                        Ok(outcome) => {
                            counters.line_search_trials += outcome.trials;
                            Some(outcome)
                        }
                        Err(SolverError::LineSearchExhausted { trials, .. }) => {
                            counters.line_search_trials += trials;
                            None
                        }
                        Err(err) => return Err(err),
                    }
                } else {
                    None
                };

                let (next, line_search_step, next_envelope) = match searched {
                    Some(outcome) => (outcome.point, Some(outcome.step), Some(outcome.envelope_value)),
                    None => {
                        counters.fallback_steps += 1;
                        log::debug!(
                            "iteration {}: line search failed, forward-backward step taken",
                            counters.iterations
                        );
                        (current.forward_backward_step(&x, *gamma)?, None, None)
                    }
                };

                let next_grad = candidate.envelope_gradient(&next, *gamma)?;
                self.history.push(&next - &x, next_grad - &grad);
                std::mem::swap(current, candidate);
                x = next;
                counters.iterations += 1;

                log::debug!(
                    "iteration {}: residual = {}, envelope = {}, gamma = {}, tau = {:?}",
                    counters.iterations,
                    residual_norm,
                    envelope_value,
                    *gamma,
                    line_search_step
                );

                let info = IterationInfo {
                    iteration: counters.iterations,
                    point: &x,
                    residual_norm,
                    envelope_value: next_envelope,
                    step_size: *gamma,
                    line_search_step,
                    elapsed: start.elapsed(),
                };
                match callback.on_iteration_end(&info) {
                    CallbackAction::Continue => Ok(None),
                    CallbackAction::Restart => {
                        log::debug!("iteration {}: restart requested", counters.iterations);
                        self.history.reset();
                        best = None;
                        Ok(None)
                    }
                    CallbackAction::Stop => {
                        let residual_norm = current.residual_norm(&x, *gamma)?;
                        let envelope_value = current.envelope_value(&x, *gamma)?;
                        Ok(Some(Exit {
                            status: TerminationStatus::Stopped,
                            returned: Evaluated {
                                point: x.clone(),
                                residual_norm,
                                envelope_value,
                            },
                            error: None,
                        }))
                    }
                }
            })();

            match step {
                Ok(None) => continue,
                Ok(Some(mut exit)) => {
                    match forward_backward_point(current, &exit.returned.point, *gamma) {
                        Ok(projected) => exit.returned = projected,
                        Err(err) => log::debug!(
                            "forward-backward step of the returned point failed: {}",
                            err
                        ),
                    }
                    return exit;
                }
                Err(error) => {
                    return Exit {
                        status: TerminationStatus::Failed,
                        returned: last_good,
                        error: Some(error),
                    }
                }
            }
        }
    }

    /// Halves `gamma` until `f(z) ≤ f(x) − ⟨∇f(x), r⟩ + ‖r‖²/(2γ)` holds up
    /// to a relative slack. Returns whether `gamma` changed.
    ///
    /// `lipschitz_bound` bounds the Lipschitz constant of `∇(f∘A)`; the test
    /// is skipped once `γ` is below its inverse.
    fn adjust_step_size<F, G>(
        &self,
        lipschitz_bound: Option<T>,
        cache: &mut EvaluationCache<'_, T, F, G>,
        x: &DVector<T>,
        gamma: &mut T,
    ) -> Result<bool>
    where
        F: SmoothFunction<T> + ?Sized,
        G: ProximalFunction<T> + ?Sized,
    {
        if !self.options.adaptive_step_size {
            return Ok(false);
        }
        let two = <T as Scalar>::from_f64(2.0);

        for halvings in 0..=MAX_STEP_HALVINGS {
            if lipschitz_bound.is_some_and(|l| *gamma * l <= T::one()) {
                return Ok(halvings > 0);
            }
            let (f, grad) = cache.value_and_gradient_of_smooth(x)?;
            let r = cache.fixed_point_residual(x, *gamma)?;
            let f_at_z = cache.smooth_value_at_prox(x, *gamma)?;
            let upper = f - grad.dot(&r)
                + r.norm_squared() / (two * *gamma)
                + T::LIPSCHITZ_SLACK * (T::one() + Float::abs(f));
            if f_at_z <= upper {
                return Ok(halvings > 0);
            }
            if *gamma / two < T::MIN_STEP_SIZE {
                break;
            }
            *gamma = *gamma / two;
            log::debug!("step size reduced to {}", *gamma);
        }

        Err(ProxError::numerical_failure(format!(
            "step size collapsed to {} without satisfying the smooth upper bound",
            *gamma
        ))
        .into())
    }
}

/// Forward-backward step of `point`, with the residual and envelope value
/// evaluated there. Unlike `point` it always lies in `dom g`.
fn forward_backward_point<T, F, G>(
    cache: &mut EvaluationCache<'_, T, F, G>,
    point: &DVector<T>,
    gamma: T,
) -> Result<Evaluated<T>>
where
    T: Scalar,
    F: SmoothFunction<T> + ?Sized,
    G: ProximalFunction<T> + ?Sized,
{
    let z = cache.forward_backward_step(point, gamma)?;
    let residual_norm = cache.residual_norm(&z, gamma)?;
    let envelope_value = cache.envelope_value(&z, gamma)?;
    Ok(Evaluated {
        point: z,
        residual_norm,
        envelope_value,
    })
}

/// Step size `0.95 / L̂` from a gradient difference along `δ 1`.
fn estimate_step_size<T, F, G>(
    problem: &Problem<'_, T, F, G>,
    cache: &mut EvaluationCache<'_, T, F, G>,
    x0: &DVector<T>,
) -> Result<T>
where
    T: Scalar,
    F: SmoothFunction<T> + ?Sized,
    G: ProximalFunction<T> + ?Sized,
{
    let (_, g0) = cache.value_and_gradient_of_smooth(x0)?;
    let scale = x0.iter().fold(T::one(), |acc, v| Float::max(acc, Float::abs(*v)));
    let delta = <T as Scalar>::from_f64(1e-6) * scale;
    let shifted = x0.add_scalar(delta);
    let (_, g1, _) = problem.smooth_value_and_gradient(&shifted)?;
    ensure_finite_vector("smooth gradient", &g1)?;

    let step_norm = delta * Float::sqrt(<T as Scalar>::from_usize(x0.len()));
    let lipschitz = (g1 - g0).norm() / step_norm;
    let gamma = if lipschitz > T::EPSILON {
        <T as Scalar>::from_f64(0.95) / lipschitz
    } else {
        T::one()
    };
    log::debug!("estimated Lipschitz constant {}, initial step size {}", lipschitz, gamma);
    Ok(gamma)
}
