//! Weighted ℓ₁ norm.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ProxError, Result},
    function::ProximalFunction,
    kernels,
    types::Scalar,
};

/// `μ ‖x‖₁`, the LASSO penalty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Norm1<T: Scalar> {
    mu: T,
}

impl<T: Scalar> Norm1<T> {
    /// Creates `mu · ‖x‖₁` with `mu ≥ 0`.
    pub fn new(mu: T) -> Result<Self> {
        if !(mu >= T::zero()) || !Float::is_finite(mu) {
            return Err(ProxError::invalid_parameter(format!(
                "l1 weight must be nonnegative, got {}",
                mu
            )));
        }
        Ok(Self { mu })
    }

    pub fn mu(&self) -> T {
        self.mu
    }
}

impl<T: Scalar> ProximalFunction<T> for Norm1<T> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        Ok(self.mu * x.iter().fold(T::zero(), |acc, v| acc + <T as Float>::abs(*v)))
    }

    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        Ok(kernels::soft_threshold(x, gamma * self.mu))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
            .with(Capability::Norm)
            .with(Capability::Separable { block_len: 1 })
            .with(Capability::L1Norm { weight: self.mu })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_value_and_prox() {
        let g = Norm1::new(2.0).unwrap();
        let x = DVector::from_vec(vec![1.0, -3.0, 0.5]);
        assert_relative_eq!(g.value(&x).unwrap(), 9.0);
        let (z, value) = g.prox_with_value(&x, 0.5).unwrap();
        assert_eq!(z, DVector::from_vec(vec![0.0, -2.0, 0.0]));
        assert_relative_eq!(value, 4.0);
        assert!(Norm1::new(-1.0).is_err());
    }
}
