//! The zero function.

use nalgebra::DVector;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::Result,
    function::ProximalFunction,
    types::Scalar,
};

/// `g(x) = 0`; its prox is the identity, which turns the splitting solver
/// into a quasi-Newton method for the smooth term alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zero;

impl<T: Scalar> ProximalFunction<T> for Zero {
    fn value(&self, _x: &DVector<T>) -> Result<T> {
        Ok(T::zero())
    }

    fn prox(&self, x: &DVector<T>, _gamma: T) -> Result<DVector<T>> {
        Ok(x.clone())
    }

    fn prox_with_value(&self, x: &DVector<T>, _gamma: T) -> Result<(DVector<T>, T)> {
        Ok((x.clone(), T::zero()))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
            .with(Capability::Zero)
            .with(Capability::Separable { block_len: 1 })
    }
}
