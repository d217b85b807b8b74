//! Logistic loss `μ Σ log(1 + e^{−xᵢ})`.
//!
//! Used for sparse logistic regression with `x = diag(labels) · features · w`.
//! All evaluations avoid overflow of `e^{−xᵢ}` for large negative inputs.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ensure_len, ProxError, Result},
    function::SmoothFunction,
    types::Scalar,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogLogisticLoss<T: Scalar> {
    mu: T,
}

impl<T: Scalar> LogLogisticLoss<T> {
    /// Creates the loss with scale `mu > 0`.
    pub fn new(mu: T) -> Result<Self> {
        if !(mu > T::zero()) || !Float::is_finite(mu) {
            return Err(ProxError::invalid_parameter(format!(
                "logistic loss scale must be positive, got {}",
                mu
            )));
        }
        Ok(Self { mu })
    }

    pub fn mu(&self) -> T {
        self.mu
    }
}

/// `log(1 + e^{−t})` without overflow.
fn softplus_neg<T: Scalar>(t: T) -> T {
    if t >= T::zero() {
        <T as Float>::ln_1p(<T as Float>::exp(-t))
    } else {
        -t + <T as Float>::ln_1p(<T as Float>::exp(t))
    }
}

/// `σ(t) = 1 / (1 + e^{−t})` without overflow.
fn sigmoid<T: Scalar>(t: T) -> T {
    if t >= T::zero() {
        T::one() / (T::one() + <T as Float>::exp(-t))
    } else {
        let e = <T as Float>::exp(t);
        e / (T::one() + e)
    }
}

impl<T: Scalar> SmoothFunction<T> for LogLogisticLoss<T> {
    fn value_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>)> {
        let value = x.iter().fold(T::zero(), |acc, &t| acc + softplus_neg(t)) * self.mu;
        // d/dt log(1 + e^{−t}) = −σ(−t)
        let grad = x.map(|t| -self.mu * sigmoid(-t));
        Ok((value, grad))
    }

    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> Result<DVector<T>> {
        ensure_len(x.len(), v.len())?;
        Ok(DVector::from_fn(x.len(), |i, _| {
            let s = sigmoid(x[i]);
            self.mu * s * (T::one() - s) * v[i]
        }))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
            .with(Capability::Loss)
            .with(Capability::Separable { block_len: 1 })
            .with(Capability::LipschitzGradient {
                constant: self.mu * <T as Scalar>::from_f64(0.25),
            })
    }
}
