//! Euclidean norm.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ProxError, Result},
    function::ProximalFunction,
    kernels,
    types::Scalar,
};

/// `μ ‖x‖₂`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Norm2<T: Scalar> {
    mu: T,
}

impl<T: Scalar> Norm2<T> {
    pub fn new(mu: T) -> Result<Self> {
        if !(mu >= T::zero()) || !Float::is_finite(mu) {
            return Err(ProxError::invalid_parameter(format!(
                "norm weight must be nonnegative, got {}",
                mu
            )));
        }
        Ok(Self { mu })
    }

    pub fn mu(&self) -> T {
        self.mu
    }
}

impl<T: Scalar> ProximalFunction<T> for Norm2<T> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        Ok(self.mu * x.norm())
    }

    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        Ok(kernels::norm2_shrink(x, gamma * self.mu))
    }

    fn prox_with_value(&self, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)> {
        let norm = x.norm();
        let threshold = gamma * self.mu;
        if norm <= threshold {
            return Ok((DVector::zeros(x.len()), T::zero()));
        }
        let z = x * (T::one() - threshold / norm);
        Ok((z, self.mu * (norm - threshold)))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new().with(Capability::Norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prox_with_value_matches_value() {
        let g = Norm2::new(1.5).unwrap();
        let x = DVector::from_vec(vec![3.0, 4.0]);
        let (z, value) = g.prox_with_value(&x, 1.0).unwrap();
        assert_relative_eq!(z.norm(), 3.5, epsilon = 1e-14);
        assert_relative_eq!(value, g.value(&z).unwrap(), epsilon = 1e-14);
        assert_relative_eq!(z, g.prox(&x, 1.0).unwrap(), epsilon = 1e-14);

        let (small, v) = g.prox_with_value(&x, 10.0).unwrap();
        assert_eq!(small, DVector::zeros(2));
        assert_eq!(v, 0.0);
    }
}
