//! Function interfaces for composite problems.
//!
//! A composite problem `f(A x + b) + g(x)` is assembled from a
//! [`SmoothFunction`] `f`, evaluated through its value and gradient, and a
//! [`ProximalFunction`] `g`, accessed through its proximal operator
//!
//! ```text
//! prox_{γ g}(x) = argmin_z  g(z) + ‖z − x‖² / (2γ).
//! ```
//!
//! Both traits expose an optional [`CapabilitySet`] used by the solver for
//! fast paths (closed-form prox kernels, skipping step-size checks when a
//! Lipschitz constant is known).

use crate::core::{
    capability::CapabilitySet,
    error::{ProxError, Result},
    types::Scalar,
};
use nalgebra::DVector;
use num_traits::Float;
use std::cell::Cell;
use std::fmt::Debug;

/// A differentiable function `f : R^n -> R`.
pub trait SmoothFunction<T: Scalar>: Debug {
    /// Evaluates `f(x)` and `∇f(x)` together.
    fn value_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>)>;

    /// Evaluates `f(x)`.
    ///
    /// # Default Implementation
    ///
    /// Calls `value_and_gradient` and discards the gradient.
    fn value(&self, x: &DVector<T>) -> Result<T> {
        self.value_and_gradient(x).map(|(v, _)| v)
    }

    /// Evaluates `∇f(x)`.
    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        self.value_and_gradient(x).map(|(_, g)| g)
    }

    /// Computes `∇²f(x) v`.
    ///
    /// # Default Implementation
    ///
    /// Forward differences on the gradient with a step scaled to the
    /// magnitude of `x` and `v`.
    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> Result<DVector<T>> {
        if x.len() != v.len() {
            return Err(ProxError::dimension_mismatch(x.len(), v.len()));
        }
        let norm = v.norm();
        if norm <= T::EPSILON {
            return Ok(DVector::zeros(x.len()));
        }

        let scale = <T as Float>::max(T::one(), x.norm());
        let t = T::FINITE_DIFFERENCE_STEP * scale / norm;
        let perturbed = x + v * t;

        let grad = self.gradient(x)?;
        let grad_perturbed = self.gradient(&perturbed)?;
        Ok((grad_perturbed - grad) / t)
    }

    /// Structural properties of the function.
    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
    }

    /// Expected input dimension, when the function has one.
    fn dimension_hint(&self) -> Option<usize> {
        None
    }
}

/// A function with a computable proximal operator.
pub trait ProximalFunction<T: Scalar>: Debug {
    /// Evaluates `g(x)`; indicator functions return `+∞` outside their set.
    fn value(&self, x: &DVector<T>) -> Result<T>;

    /// Computes `prox_{γ g}(x)`.
    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>>;

    /// Computes `prox_{γ g}(x)` and `g` at the result.
    ///
    /// # Default Implementation
    ///
    /// Calls `prox` then `value`. Override when the value falls out of the
    /// prox computation for free.
    fn prox_with_value(&self, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)> {
        let z = self.prox(x, gamma)?;
        let value = self.value(&z)?;
        Ok((z, value))
    }

    /// Structural properties of the function.
    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
    }
}

impl<T: Scalar, F: SmoothFunction<T> + ?Sized> SmoothFunction<T> for &F {
    fn value_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>)> {
        (**self).value_and_gradient(x)
    }

    fn value(&self, x: &DVector<T>) -> Result<T> {
        (**self).value(x)
    }

    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        (**self).gradient(x)
    }

    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> Result<DVector<T>> {
        (**self).hessian_vector_product(x, v)
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        (**self).capabilities()
    }

    fn dimension_hint(&self) -> Option<usize> {
        (**self).dimension_hint()
    }
}

impl<T: Scalar, G: ProximalFunction<T> + ?Sized> ProximalFunction<T> for &G {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        (**self).value(x)
    }

    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        (**self).prox(x, gamma)
    }

    fn prox_with_value(&self, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)> {
        (**self).prox_with_value(x, gamma)
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        (**self).capabilities()
    }
}

/// Wrapper counting evaluations of a smooth function.
#[derive(Debug)]
pub struct CountingSmoothFunction<F> {
    /// The underlying function
    pub inner: F,
    value_count: Cell<usize>,
    gradient_count: Cell<usize>,
    hvp_count: Cell<usize>,
}

impl<F> CountingSmoothFunction<F> {
    /// Creates a new counting wrapper.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            value_count: Cell::new(0),
            gradient_count: Cell::new(0),
            hvp_count: Cell::new(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_counts(&self) {
        self.value_count.set(0);
        self.gradient_count.set(0);
        self.hvp_count.set(0);
    }

    /// Returns `(values, gradients, hessian-vector products)`.
    ///
    /// A joint value-and-gradient call counts once in each of the first two.
    pub fn counts(&self) -> (usize, usize, usize) {
        (
            self.value_count.get(),
            self.gradient_count.get(),
            self.hvp_count.get(),
        )
    }
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

impl<T: Scalar, F: SmoothFunction<T>> SmoothFunction<T> for CountingSmoothFunction<F> {
    fn value_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>)> {
        bump(&self.value_count);
        bump(&self.gradient_count);
        self.inner.value_and_gradient(x)
    }

    fn value(&self, x: &DVector<T>) -> Result<T> {
        bump(&self.value_count);
        self.inner.value(x)
    }

    fn gradient(&self, x: &DVector<T>) -> Result<DVector<T>> {
        bump(&self.gradient_count);
        self.inner.gradient(x)
    }

    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> Result<DVector<T>> {
        // gradients used by a finite-difference product are not counted
        bump(&self.hvp_count);
        self.inner.hessian_vector_product(x, v)
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        self.inner.capabilities()
    }

    fn dimension_hint(&self) -> Option<usize> {
        self.inner.dimension_hint()
    }
}

/// Wrapper counting evaluations of a proximable function.
#[derive(Debug)]
pub struct CountingProximalFunction<G> {
    /// The underlying function
    pub inner: G,
    value_count: Cell<usize>,
    prox_count: Cell<usize>,
}

impl<G> CountingProximalFunction<G> {
    /// Creates a new counting wrapper.
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            value_count: Cell::new(0),
            prox_count: Cell::new(0),
        }
    }

    /// Resets all counters to zero.
    pub fn reset_counts(&self) {
        self.value_count.set(0);
        self.prox_count.set(0);
    }

    /// Returns `(values, proxes)`.
    pub fn counts(&self) -> (usize, usize) {
        (self.value_count.get(), self.prox_count.get())
    }
}

impl<T: Scalar, G: ProximalFunction<T>> ProximalFunction<T> for CountingProximalFunction<G> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        bump(&self.value_count);
        self.inner.value(x)
    }

    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        bump(&self.prox_count);
        self.inner.prox(x, gamma)
    }

    fn prox_with_value(&self, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)> {
        bump(&self.prox_count);
        bump(&self.value_count);
        self.inner.prox_with_value(x, gamma)
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        self.inner.capabilities()
    }
}
