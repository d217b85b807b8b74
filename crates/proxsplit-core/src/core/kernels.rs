//! Closed-form proximal kernels.
//!
//! Each kernel computes `prox_{γ h}(x)` for a simple `h`; the caller folds
//! the step size into the threshold arguments.

use crate::core::{
    error::{ProxError, Result},
    types::Scalar,
};
use nalgebra::DVector;
use num_traits::Float;

/// Componentwise soft thresholding, the prox of `threshold · ‖·‖₁`.
pub fn soft_threshold<T: Scalar>(x: &DVector<T>, threshold: T) -> DVector<T> {
    x.map(|xi| {
        let shrunk = <T as Float>::abs(xi) - threshold;
        if shrunk > T::zero() {
            <T as Float>::signum(xi) * shrunk
        } else {
            T::zero()
        }
    })
}

/// Block soft thresholding, the prox of `threshold · Σ_b ‖x_b‖₂`.
///
/// `x` is split into consecutive blocks of `block_len` entries.
pub fn group_soft_threshold<T: Scalar>(
    x: &DVector<T>,
    threshold: T,
    block_len: usize,
) -> Result<DVector<T>> {
    if block_len == 0 || x.len() % block_len != 0 {
        return Err(ProxError::dimension_mismatch(
            format!("length divisible by block size {}", block_len),
            x.len(),
        ));
    }
    let mut z = x.clone();
    for start in (0..x.len()).step_by(block_len) {
        let mut block = z.rows_mut(start, block_len);
        let norm = block.norm();
        let scale = if norm > threshold {
            T::one() - threshold / norm
        } else {
            T::zero()
        };
        block *= scale;
    }
    Ok(z)
}

/// Euclidean norm shrinkage, the prox of `threshold · ‖·‖₂`.
pub fn norm2_shrink<T: Scalar>(x: &DVector<T>, threshold: T) -> DVector<T> {
    let norm = x.norm();
    if norm > threshold {
        x * (T::one() - threshold / norm)
    } else {
        DVector::zeros(x.len())
    }
}

/// Projection onto the box `[lower, upper]^n`.
pub fn box_clamp<T: Scalar>(x: &DVector<T>, lower: T, upper: T) -> Result<DVector<T>> {
    if lower > upper {
        return Err(ProxError::invalid_parameter(format!(
            "empty box: lower {} > upper {}",
            lower, upper
        )));
    }
    Ok(x.map(|xi| <T as Float>::min(<T as Float>::max(xi, lower), upper)))
}

/// Projection onto the second-order cone `{(v, t) : ‖v‖ ≤ t}`.
///
/// The last entry of `x` is the cone variable `t`.
pub fn soc_projection<T: Scalar>(x: &DVector<T>) -> Result<DVector<T>> {
    let n = x.len();
    if n == 0 {
        return Err(ProxError::dimension_mismatch("nonempty vector", 0));
    }
    let t = x[n - 1];
    let norm = x.rows(0, n - 1).norm();

    if t >= norm {
        return Ok(x.clone());
    }
    if t <= -norm {
        return Ok(DVector::zeros(n));
    }
    let two = <T as Scalar>::from_f64(2.0);
    let scale = (T::one() + t / norm) / two;
    let mut z = x * scale;
    z[n - 1] = (norm + t) / two;
    Ok(z)
}

/// Prox of `l1 · ‖·‖₁ + (l2 / 2) · ‖·‖²`, with both weights already scaled by γ.
pub fn elastic_net_shrink<T: Scalar>(x: &DVector<T>, l1: T, l2: T) -> DVector<T> {
    soft_threshold(x, l1) / (T::one() + l2)
}
