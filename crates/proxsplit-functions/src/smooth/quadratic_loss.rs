//! Weighted least-squares loss `½ Σ wᵢ (xᵢ − pᵢ)²`.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ensure_len, ProxError, Result},
    function::{ProximalFunction, SmoothFunction},
    types::Scalar,
};

/// Separable weighted squared distance to a target `p`.
///
/// With unit weights and a zero target this is `½‖x‖²`, the loss used for
/// least squares and LASSO once the data enter through `A x + b`.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadraticLoss<T: Scalar> {
    weights: DVector<T>,
    target: DVector<T>,
}

impl<T: Scalar> QuadraticLoss<T> {
    /// Creates the loss; weights must be nonnegative and finite.
    pub fn new(weights: DVector<T>, target: DVector<T>) -> Result<Self> {
        ensure_len(weights.len(), target.len())?;
        if weights
            .iter()
            .any(|w| *w < T::zero() || !Float::is_finite(*w))
        {
            return Err(ProxError::invalid_parameter(
                "quadratic loss weights must be finite and nonnegative",
            ));
        }
        Ok(Self { weights, target })
    }

    /// Unit weights, distance to `target`.
    pub fn unweighted(target: DVector<T>) -> Self {
        Self {
            weights: DVector::from_element(target.len(), T::one()),
            target,
        }
    }

    /// `½‖x‖²` on `R^dim`.
    pub fn squared_norm(dim: usize) -> Self {
        Self::unweighted(DVector::zeros(dim))
    }

    pub fn weights(&self) -> &DVector<T> {
        &self.weights
    }

    pub fn target(&self) -> &DVector<T> {
        &self.target
    }

    fn extreme_weight(&self, pick: fn(T, T) -> T, start: T) -> T {
        self.weights.iter().fold(start, |acc, w| pick(acc, *w))
    }
}

impl<T: Scalar> SmoothFunction<T> for QuadraticLoss<T> {
    fn value_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>)> {
        ensure_len(self.target.len(), x.len())?;
        let diff = x - &self.target;
        let grad = self.weights.component_mul(&diff);
        let value = <T as Scalar>::from_f64(0.5) * diff.dot(&grad);
        Ok((value, grad))
    }

    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> Result<DVector<T>> {
        ensure_len(self.target.len(), x.len())?;
        ensure_len(self.target.len(), v.len())?;
        Ok(self.weights.component_mul(v))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        let mut caps = CapabilitySet::new()
            .with(Capability::Quadratic)
            .with(Capability::Loss)
            .with(Capability::Separable { block_len: 1 })
            .with(Capability::LipschitzGradient {
                constant: self.extreme_weight(<T as Float>::max, T::zero()),
            });
        let modulus = self.extreme_weight(<T as Float>::min, <T as Float>::infinity());
        if !self.weights.is_empty() && modulus > T::zero() {
            caps.insert(Capability::StronglyConvex { modulus });
        }
        caps
    }

    fn dimension_hint(&self) -> Option<usize> {
        Some(self.target.len())
    }
}

impl<T: Scalar> ProximalFunction<T> for QuadraticLoss<T> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        SmoothFunction::value(self, x)
    }

    /// Componentwise `(xᵢ + γ wᵢ pᵢ) / (1 + γ wᵢ)`.
    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        ensure_len(self.target.len(), x.len())?;
        Ok(DVector::from_fn(x.len(), |i, _| {
            let gw = gamma * self.weights[i];
            (x[i] + gw * self.target[i]) / (T::one() + gw)
        }))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        SmoothFunction::capabilities(self)
    }
}
