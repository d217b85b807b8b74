//! Numerical utilities.

pub mod validation;

pub use validation::{
    ensure_finite, ensure_finite_vector, GradientCheckResult, NumericalValidationConfig,
    NumericalValidator,
};
