//! Proximal operator of a smooth function by inner gradient iterations.
//!
//! For a smooth `h` the prox subproblem
//!
//! ```text
//! minimize  h(z) + ‖z − x‖² / (2γ)
//! ```
//!
//! is strongly convex with modulus `1/γ`, so plain gradient descent
//! converges linearly. With a declared Lipschitz constant `L` the step is
//! fixed to `1 / (L + 1/γ)`; otherwise it is found by backtracking.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::{
    core::{
        capability::{CapabilityKind, CapabilitySet},
        error::{ProxError, Result},
        function::{ProximalFunction, SmoothFunction},
        types::Scalar,
    },
    numerical::ensure_finite_vector,
};

/// Adapter exposing a [`SmoothFunction`] as a [`ProximalFunction`].
#[derive(Debug, Clone)]
pub struct IterativeProx<F, T: Scalar> {
    inner: F,
    tolerance: T,
    max_iterations: usize,
}

impl<F: SmoothFunction<T>, T: Scalar> IterativeProx<F, T> {
    /// Wraps `inner` with default tolerance and iteration cap.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            tolerance: <T as Scalar>::from_f64(1e-10),
            max_iterations: 10_000,
        }
    }

    /// Sets the stopping tolerance on the subproblem gradient norm.
    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the maximum number of inner iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    fn subproblem(&self, z: &DVector<T>, x: &DVector<T>, gamma: T) -> Result<(T, DVector<T>)> {
        let (h, grad) = self.inner.value_and_gradient(z)?;
        let diff = z - x;
        let two = <T as Scalar>::from_f64(2.0);
        Ok((h + diff.norm_squared() / (two * gamma), grad + diff / gamma))
    }
}

impl<F: SmoothFunction<T>, T: Scalar> ProximalFunction<T> for IterativeProx<F, T> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        self.inner.value(x)
    }

    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        if !(gamma > T::zero()) {
            return Err(ProxError::invalid_parameter(format!(
                "step size must be positive, got {}",
                gamma
            )));
        }
        let fixed_step = self
            .inner
            .capabilities()
            .lipschitz_constant()
            .map(|l| T::one() / (l + T::one() / gamma));
        let half = <T as Scalar>::from_f64(0.5);

        let mut z = x.clone();
        let (mut value, mut grad) = self.subproblem(&z, x, gamma)?;
        let mut step = fixed_step.unwrap_or(gamma);

        for _ in 0..self.max_iterations {
            let grad_norm = grad.norm();
            if grad_norm <= self.tolerance * <T as Float>::max(T::one(), z.norm()) {
                return Ok(z);
            }

            let (candidate, next) = loop {
                let candidate = &z - &grad * step;
                let next = self.subproblem(&candidate, x, gamma)?;
                let decrease = half * step * grad_norm * grad_norm;
                if fixed_step.is_some() || next.0 <= value - decrease || step <= T::MIN_STEP_SIZE {
                    break (candidate, next);
                }
                step *= half;
            };
            ensure_finite_vector("iterative prox iterate", &candidate)?;

            z = candidate;
            value = next.0;
            grad = next.1;
            if fixed_step.is_none() {
                // let the backtracking step grow again
                step = <T as Float>::min(step + step, gamma);
            }
        }

        log::warn!(
            "iterative prox stopped after {} iterations with gradient norm {}",
            self.max_iterations,
            grad.norm()
        );
        Ok(z)
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        // fast paths keyed on the inner function's shape do not apply to its prox
        let mut caps = CapabilitySet::new();
        for capability in self.inner.capabilities().iter() {
            if !matches!(
                capability.kind(),
                CapabilityKind::Quadratic | CapabilityKind::LipschitzGradient
            ) {
                caps.insert(*capability);
            }
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smooth::{LogLogisticLoss, Quadratic};
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    #[test]
    fn test_matches_closed_form_quadratic_prox() {
        let q = Quadratic::new(
            DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.0, 1.0, 3.0, 0.5, 0.0, 0.5, 2.0]),
            DVector::from_vec(vec![1.0, -2.0, 3.0]),
        )
        .unwrap();
        let x = DVector::from_vec(vec![0.5, 1.0, -1.0]);
        let exact = ProximalFunction::prox(&q, &x, 0.7).unwrap();
        let iterative = IterativeProx::new(q).prox(&x, 0.7).unwrap();
        assert_relative_eq!(iterative, exact, epsilon = 1e-8);
    }

    #[test]
    fn test_backtracking_path_for_undeclared_constant() {
        #[derive(Debug)]
        struct Plain(Quadratic<f64>);

        impl SmoothFunction<f64> for Plain {
            fn value_and_gradient(&self, x: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
                self.0.value_and_gradient(x)
            }
        }

        let q = Quadratic::from_matrix(DMatrix::from_diagonal(&DVector::from_vec(vec![
            10.0, 1.0,
        ])))
        .unwrap();
        let x = DVector::from_vec(vec![1.0, 1.0]);
        let z = IterativeProx::new(Plain(q)).prox(&x, 1.0).unwrap();
        assert_relative_eq!(z[0], 1.0 / 11.0, epsilon = 1e-8);
        assert_relative_eq!(z[1], 0.5, epsilon = 1e-8);
    }

    #[test]
    fn test_logistic_prox_optimality() {
        let f = LogLogisticLoss::new(1.0).unwrap();
        let g = IterativeProx::new(f);
        let x = DVector::from_vec(vec![-2.0, 0.0, 3.0]);
        let z = g.prox(&x, 0.5).unwrap();
        let optimality = f.gradient(&z).unwrap() + (&z - &x) / 0.5;
        assert!(optimality.norm() < 1e-8);
        assert!(!g.capabilities().contains_kind(CapabilityKind::LipschitzGradient));
        assert!(g.prox(&x, 0.0).is_err());
    }
}
