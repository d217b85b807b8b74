//! Elastic-net penalty.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ProxError, Result},
    function::ProximalFunction,
    kernels,
    types::Scalar,
};

/// `l1 ‖x‖₁ + (l2 / 2) ‖x‖²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElasticNet<T: Scalar> {
    l1: T,
    l2: T,
}

impl<T: Scalar> ElasticNet<T> {
    pub fn new(l1: T, l2: T) -> Result<Self> {
        let valid = |w: T| w >= T::zero() && Float::is_finite(w);
        if !valid(l1) || !valid(l2) {
            return Err(ProxError::invalid_parameter(format!(
                "elastic-net weights must be nonnegative, got l1 = {}, l2 = {}",
                l1, l2
            )));
        }
        Ok(Self { l1, l2 })
    }

    pub fn l1(&self) -> T {
        self.l1
    }

    pub fn l2(&self) -> T {
        self.l2
    }
}

impl<T: Scalar> ProximalFunction<T> for ElasticNet<T> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        let l1_part = x.iter().fold(T::zero(), |acc, v| acc + <T as Float>::abs(*v));
        Ok(self.l1 * l1_part + <T as Scalar>::from_f64(0.5) * self.l2 * x.norm_squared())
    }

    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        Ok(kernels::elastic_net_shrink(x, gamma * self.l1, gamma * self.l2))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        let mut caps = CapabilitySet::new()
            .with(Capability::Separable { block_len: 1 })
            .with(Capability::ElasticNet {
                l1: self.l1,
                l2: self.l2,
            });
        if self.l2 > T::zero() {
            caps.insert(Capability::StronglyConvex { modulus: self.l2 });
        }
        caps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_prox_optimality() {
        let g = ElasticNet::new(1.0, 2.0).unwrap();
        let x = DVector::from_vec(vec![4.0, -0.5]);
        let z = g.prox(&x, 0.5).unwrap();
        // z = (x − γ l1 sign) / (1 + γ l2) on the active entry
        assert_relative_eq!(z[0], 3.5 / 2.0);
        assert_eq!(z[1], 0.0);
        assert_relative_eq!(g.value(&z).unwrap(), 1.75 + 1.75 * 1.75);
    }
}
