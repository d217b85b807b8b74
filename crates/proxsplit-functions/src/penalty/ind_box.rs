//! Indicator of a box with scalar bounds.

use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ProxError, Result},
    function::ProximalFunction,
    kernels,
    types::Scalar,
};

/// Indicator of `[lower, upper]^n`: zero inside, `+∞` outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndBox<T: Scalar> {
    lower: T,
    upper: T,
}

impl<T: Scalar> IndBox<T> {
    /// Creates the box; infinite bounds are allowed, NaN and `lower > upper` are not.
    pub fn new(lower: T, upper: T) -> Result<Self> {
        if Float::is_nan(lower) || Float::is_nan(upper) || lower > upper {
            return Err(ProxError::invalid_parameter(format!(
                "invalid box [{}, {}]",
                lower, upper
            )));
        }
        Ok(Self { lower, upper })
    }

    pub fn lower(&self) -> T {
        self.lower
    }

    pub fn upper(&self) -> T {
        self.upper
    }

    pub fn contains(&self, x: &DVector<T>) -> bool {
        x.iter().all(|v| *v >= self.lower && *v <= self.upper)
    }
}

impl<T: Scalar> ProximalFunction<T> for IndBox<T> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        Ok(if self.contains(x) {
            T::zero()
        } else {
            <T as Float>::infinity()
        })
    }

    fn prox(&self, x: &DVector<T>, _gamma: T) -> Result<DVector<T>> {
        kernels::box_clamp(x, self.lower, self.upper)
    }

    fn prox_with_value(&self, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)> {
        Ok((self.prox(x, gamma)?, T::zero()))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
            .with(Capability::Indicator)
            .with(Capability::Separable { block_len: 1 })
            .with(Capability::Box {
                lower: self.lower,
                upper: self.upper,
            })
    }
}
