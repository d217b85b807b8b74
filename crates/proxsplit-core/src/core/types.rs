//! Scalar trait and numerical constants.
//!
//! Every generic type in the workspace is parameterised by a [`Scalar`]
//! (`f32` or `f64`). The trait bundles the `nalgebra` and `num-traits`
//! bounds the solver needs, together with per-precision tolerances.

use nalgebra::{RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

pub use nalgebra::{DMatrix, DVector};

/// Trait for scalar types used by the solver (f32 or f64).
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default absolute tolerance on the fixed-point residual norm.
    const DEFAULT_TOLERANCE: Self;

    /// Relative threshold below which a curvature pair is considered degenerate.
    const CURVATURE_TOLERANCE: Self;

    /// Relative slack allowed in the Lipschitz consistency check.
    const LIPSCHITZ_SLACK: Self;

    /// Smallest admissible step size before the solver gives up halving.
    const MIN_STEP_SIZE: Self;

    /// Relative perturbation used by finite-difference approximations.
    const FINITE_DIFFERENCE_STEP: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails. Use `try_from_f64` for a non-panicking version.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Try to convert from f64.
    fn try_from_f64(v: f64) -> Option<Self> {
        <Self as FromPrimitive>::from_f64(v)
    }

    /// Convert to f64 (for logging and error payloads).
    fn to_f64(self) -> f64 {
        num_traits::cast(self).unwrap_or(f64::NAN)
    }

    /// Convert from usize (for counts and dimensions).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-5;
    const CURVATURE_TOLERANCE: Self = 1e-6;
    const LIPSCHITZ_SLACK: Self = 1e-6;
    const MIN_STEP_SIZE: Self = 1e-20;
    const FINITE_DIFFERENCE_STEP: Self = 1e-3;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-8;
    const CURVATURE_TOLERANCE: Self = 1e-12;
    const LIPSCHITZ_SLACK: Self = 1e-12;
    const MIN_STEP_SIZE: Self = 1e-30;
    const FINITE_DIFFERENCE_STEP: Self = 1e-7;
}

/// Returns true when every entry of `v` is finite.
pub fn all_finite<T: Scalar>(v: &DVector<T>) -> bool {
    v.iter().all(|x| Float::is_finite(*x))
}

/// Maximum absolute entry of `v` (zero for an empty vector).
pub fn max_abs<T: Scalar>(v: &DVector<T>) -> T {
    v.iter()
        .fold(T::zero(), |acc, x| <T as Float>::max(acc, <T as Float>::abs(*x)))
}
