//! Group-lasso penalty `μ Σ_b ‖x_b‖₂` over consecutive blocks.

use crate::penalty::norm2::Norm2;
use nalgebra::DVector;
use num_traits::Float;
use proxsplit_core::core::{
    capability::{Capability, CapabilitySet},
    error::{ProxError, Result},
    function::ProximalFunction,
    types::Scalar,
};

/// Bisection steps allowed per block; the bracket shrinks to machine
/// precision well before this.
const MAX_BISECTIONS: usize = 200;

/// Sum of Euclidean norms of consecutive blocks of `block_len` entries.
///
/// The prox of one block keeps its direction and only changes its length
/// `s`, which minimises `μ s + (s − ‖x_b‖)²/(2γ)` on `[0, ‖x_b‖]`. The own
/// `prox` finds `s` by bisection on that derivative; the dispatcher replaces
/// it with a single block soft-threshold pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SumOfNorm2<T: Scalar> {
    block_norm: Norm2<T>,
    block_len: usize,
}

impl<T: Scalar> SumOfNorm2<T> {
    pub fn new(mu: T, block_len: usize) -> Result<Self> {
        if block_len == 0 {
            return Err(ProxError::invalid_parameter("block length must be positive"));
        }
        Ok(Self {
            block_norm: Norm2::new(mu)?,
            block_len,
        })
    }

    pub fn mu(&self) -> T {
        self.block_norm.mu()
    }

    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Length of the prox of a block of norm `norm`.
    fn shrunk_length(&self, norm: T, gamma: T) -> Result<T> {
        let slope = |s: T| self.mu() + (s - norm) / gamma;
        if slope(T::zero()) >= T::zero() {
            return Ok(T::zero());
        }

        let (mut lo, mut hi) = (T::zero(), norm);
        let width = T::EPSILON * Float::max(T::one(), norm);
        let two = <T as Scalar>::from_f64(2.0);
        for _ in 0..MAX_BISECTIONS {
            if hi - lo <= width {
                return Ok((lo + hi) / two);
            }
            let mid = (lo + hi) / two;
            if slope(mid) < T::zero() {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Err(ProxError::numerical_failure(format!(
            "block prox bisection did not settle in {} steps, bracket [{}, {}]",
            MAX_BISECTIONS, lo, hi
        )))
    }

    fn check_blocks(&self, x: &DVector<T>) -> Result<()> {
        if x.len() % self.block_len != 0 {
            return Err(ProxError::dimension_mismatch(
                format!("length divisible by block size {}", self.block_len),
                x.len(),
            ));
        }
        Ok(())
    }
}

impl<T: Scalar> ProximalFunction<T> for SumOfNorm2<T> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        self.check_blocks(x)?;
        let mut total = T::zero();
        for start in (0..x.len()).step_by(self.block_len) {
            total += self.block_norm.value(&x.rows(start, self.block_len).into_owned())?;
        }
        Ok(total)
    }

    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        self.prox_with_value(x, gamma).map(|(z, _)| z)
    }

    fn prox_with_value(&self, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)> {
        self.check_blocks(x)?;
        let mut z = DVector::zeros(x.len());
        let mut total = T::zero();
        for start in (0..x.len()).step_by(self.block_len) {
            let block = x.rows(start, self.block_len);
            let norm = block.norm();
            let length = self.shrunk_length(norm, gamma)?;
            if length > T::zero() {
                z.rows_mut(start, self.block_len)
                    .copy_from(&(block * (length / norm)));
                total += self.mu() * length;
            }
        }
        Ok((z, total))
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        CapabilitySet::new()
            .with(Capability::Norm)
            .with(Capability::Separable {
                block_len: self.block_len,
            })
            .with(Capability::GroupL2Norm {
                weight: self.mu(),
                block_len: self.block_len,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proxsplit_core::core::kernels;

    #[test]
    fn test_value_sums_block_norms() {
        let g = SumOfNorm2::new(2.0, 2).unwrap();
        let x = DVector::from_vec(vec![3.0, 4.0, 0.0, 1.0]);
        assert_relative_eq!(g.value(&x).unwrap(), 2.0 * (5.0 + 1.0));
        assert!(g.value(&DVector::zeros(3)).is_err());
        assert!(SumOfNorm2::new(1.0, 0).is_err());
    }

    #[test]
    fn test_prox_zeroes_small_blocks() {
        let g = SumOfNorm2::new(1.0, 2).unwrap();
        let x = DVector::from_vec(vec![3.0, 4.0, 0.3, 0.4]);
        let (z, value) = g.prox_with_value(&x, 1.0).unwrap();
        assert_relative_eq!(z[0], 2.4, epsilon = 1e-14);
        assert_relative_eq!(z[1], 3.2, epsilon = 1e-14);
        assert_eq!(z[2], 0.0);
        assert_eq!(z[3], 0.0);
        assert_relative_eq!(value, 4.0, epsilon = 1e-14);
    }

    #[test]
    fn test_bisection_matches_block_soft_threshold() {
        let g = SumOfNorm2::new(0.7, 3).unwrap();
        let x = DVector::from_vec(vec![
            1.0, -2.0, 0.5, // shrunk
            0.1, 0.2, -0.1, // zeroed
            0.7, 0.0, 0.0, // exactly at the threshold
            -9.0, 4.0, 3.0,
        ]);
        for gamma in [0.1, 1.0, 2.5] {
            let (z, value) = g.prox_with_value(&x, gamma).unwrap();
            let expected = kernels::group_soft_threshold(&x, gamma * 0.7, 3).unwrap();
            assert_relative_eq!(z, expected, epsilon = 1e-13);
            assert_relative_eq!(value, g.value(&expected).unwrap(), epsilon = 1e-12);
        }
    }
}
