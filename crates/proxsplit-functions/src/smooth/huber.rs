//! Huber loss, quadratic near zero and linear in the tails.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ensure_len, ProxError, Result},
    function::SmoothFunction,
    types::Scalar,
};

/// `Σ hᵢ` with `h(t) = t² / (2δ)` for `|t| ≤ δ` and `|t| − δ/2` otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuberLoss<T: Scalar> {
    delta: T,
}

impl<T: Scalar> HuberLoss<T> {
    pub fn new(delta: T) -> Result<Self> {
        if !(delta > T::zero()) || !Float::is_finite(delta) {
            return Err(ProxError::invalid_parameter(format!(
                "Huber threshold must be positive, got {}",
                delta
            )));
        }
        Ok(Self { delta })
    }

    pub fn delta(&self) -> T {
        self.delta
    }
}

impl<T: Scalar> SmoothFunction<T> for HuberLoss<T> {
    fn value_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>)> {
        let half = <T as Scalar>::from_f64(0.5);
        let d = self.delta;
        let mut value = T::zero();
        let grad = x.map(|t| {
            let a = <T as Float>::abs(t);
            if a <= d {
                value += half * t * t / d;
                t / d
            } else {
                value += a - half * d;
                <T as Float>::signum(t)
            }
        });
        Ok((value, grad))
    }

    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> Result<DVector<T>> {
        ensure_len(x.len(), v.len())?;
        Ok(DVector::from_fn(x.len(), |i, _| {
            if <T as Float>::abs(x[i]) <= self.delta {
                v[i] / self.delta
            } else {
                T::zero()
            }
        }))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
            .with(Capability::Loss)
            .with(Capability::Separable { block_len: 1 })
            .with(Capability::LipschitzGradient {
                constant: T::one() / self.delta,
            })
    }
}
