//! Indicator of the second-order cone.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ProxError, Result},
    function::ProximalFunction,
    kernels,
    types::Scalar,
};

/// Indicator of `{(v, t) : ‖v‖₂ ≤ t}` where `t` is the last entry.
///
/// Membership is tested with a relative slack of `√ε` so that projected
/// points, which sit on the boundary up to rounding, evaluate to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndSoc;

impl IndSoc {
    pub fn contains<T: Scalar>(x: &DVector<T>) -> bool {
        let n = x.len();
        if n == 0 {
            return false;
        }
        let norm = x.rows(0, n - 1).norm();
        let slack = <T as Float>::sqrt(T::EPSILON) * <T as Float>::max(T::one(), norm);
        x[n - 1] + slack >= norm
    }
}

impl<T: Scalar> ProximalFunction<T> for IndSoc {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        if x.is_empty() {
            return Err(ProxError::dimension_mismatch("nonempty vector", 0));
        }
        Ok(if Self::contains(x) {
            T::zero()
        } else {
            <T as Float>::infinity()
        })
    }

    fn prox(&self, x: &DVector<T>, _gamma: T) -> Result<DVector<T>> {
        kernels::soc_projection(x)
    }

    fn prox_with_value(&self, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)> {
        Ok((self.prox(x, gamma)?, T::zero()))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
            .with(Capability::Indicator)
            .with(Capability::SecondOrderCone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_lands_in_cone() {
        let x = DVector::from_vec(vec![3.0, -4.0, 1.0]);
        assert_eq!(IndSoc.value(&x).unwrap(), f64::INFINITY);
        let z = IndSoc.prox(&x, 1.0).unwrap();
        assert_eq!(IndSoc.value(&z).unwrap(), 0.0);
        assert!(ProximalFunction::<f64>::value(&IndSoc, &DVector::zeros(0)).is_err());
    }
}
