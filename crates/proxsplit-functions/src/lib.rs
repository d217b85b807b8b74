//! Concrete functions for proximal splitting.
//!
//! Smooth terms implement [`SmoothFunction`](proxsplit_core::core::SmoothFunction):
//!
//! - [`Quadratic`]: `½ xᵀQx + qᵀx` (also proximable)
//! - [`QuadraticLoss`]: weighted least squares (also proximable)
//! - [`LogLogisticLoss`]: logistic regression loss
//! - [`HuberLoss`]: robust regression loss
//!
//! Nonsmooth terms implement [`ProximalFunction`](proxsplit_core::core::ProximalFunction)
//! and declare capabilities so the solver can pick a closed-form prox:
//!
//! - [`Zero`], [`Norm1`], [`Norm2`], [`SumOfNorm2`], [`ElasticNet`]
//! - [`IndBox`], [`IndSoc`]
//!
//! [`IterativeProx`] computes the prox of any smooth function numerically.

pub mod iterative_prox;
pub mod penalty;
pub mod smooth;

pub use iterative_prox::IterativeProx;
pub use penalty::{ElasticNet, IndBox, IndSoc, Norm1, Norm2, SumOfNorm2, Zero};
pub use smooth::{HuberLoss, LogLogisticLoss, Quadratic, QuadraticLoss};
