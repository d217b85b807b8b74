//! Core traits and types for proximal splitting solvers.
//!
//! This crate provides the building blocks shared by the function library
//! and the solver: scalar types, errors, linear operators, the smooth and
//! proximable function interfaces, and capability-based prox dispatch.
//!
//! # Key Concepts
//!
//! - **Composite problems**: `minimize f(A x + b) + g(x)` with `f` smooth
//!   and `g` proximable
//! - **Proximal operator**: `prox_{γ g}(x) = argmin_z g(z) + ‖z − x‖² / (2γ)`
//! - **Capabilities**: declared function properties that unlock
//!   closed-form prox kernels
//!
//! # Modules
//!
//! - [`core`]: scalar trait, errors, function traits, capabilities and kernels
//! - [`linalg`]: linear operators, CSR storage and Cholesky factorisations
//! - [`numerical`]: finite-value guards, gradient and prox checks

pub mod core;
pub mod linalg;
pub mod numerical;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export commonly used items at the crate root
pub use crate::core::error::{ProxError, Result};

/// Prelude module for convenient imports.
///
/// # Example
/// ```
/// use proxsplit_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::capability::{
        Capability, CapabilityKind, CapabilitySet, ProxDispatcher, ProxRoutine,
    };
    pub use crate::core::error::{ProxError, Result};
    pub use crate::core::function::{
        CountingProximalFunction, CountingSmoothFunction, ProximalFunction, SmoothFunction,
    };
    pub use crate::core::types::{DMatrix, DVector, Scalar};
    pub use crate::linalg::{CsrMatrix, FactoredMatrix, LinearOperator, OperatorKind};
    pub use crate::numerical::{NumericalValidationConfig, NumericalValidator};
}
