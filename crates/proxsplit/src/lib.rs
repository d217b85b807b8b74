//! # proxsplit
//!
//! Minimises composite objectives `f(A x + b) + g(x)` where `f` is smooth
//! and `g` has a computable proximal operator.
//!
//! The solver runs limited-memory quasi-Newton steps on the
//! forward-backward envelope of the problem, with plain forward-backward
//! steps as a safeguard. Nonsmooth terms that declare a known structure
//! (ℓ1 norm, box, second-order cone, ...) get closed-form proximal kernels
//! through capability dispatch.
//!
//! ## Crates
//!
//! - [`proxsplit_core`]: scalars, errors, operators, function traits and
//!   prox dispatch
//! - [`proxsplit_functions`]: losses and penalties
//! - [`proxsplit_optim`]: evaluation cache, history buffer and solver
//!
//! ## Example
//!
//! ```rust
//! use proxsplit::prelude::*;
//!
//! // LASSO: ½‖A x − y‖² + ‖x‖₁
//! let a = LinearOperator::from_column_slice(2, 3, &[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
//! let minus_y = DVector::from_vec(vec![-3.0, -1.0]);
//! let f = QuadraticLoss::squared_norm(2);
//! let g = Norm1::new(1.0).unwrap();
//! let problem = Problem::new(&f, &g).with_operator(&a).with_offset(&minus_y);
//!
//! let mut solver = SplittingSolver::new(SolverOptions::default()).unwrap();
//! let result = solver.solve(&problem, &DVector::zeros(3)).unwrap();
//! assert!(result.converged());
//! ```

pub use proxsplit_core;
pub use proxsplit_functions;
pub use proxsplit_optim;

pub use proxsplit_core::{linalg::LinearOperator, ProxError};
pub use proxsplit_optim::{
    Problem, Result, SolverError, SolverOptions, SolverResult, SplittingSolver, TerminationStatus,
};

use nalgebra::DVector;
use proxsplit_core::core::{
    function::{ProximalFunction, SmoothFunction},
    types::Scalar,
};

/// Minimises `smooth(A x) + nonsmooth(x)` from `initial_point`.
///
/// `operator` defaults to the identity. For an offset `b` inside the smooth
/// term, build a [`Problem`] with [`Problem::with_offset`] and call
/// [`SplittingSolver::solve`] directly.
///
/// # Errors
///
/// Invalid options, mismatched dimensions and failures at the initial point.
/// Later numerical failures are reported through
/// [`TerminationStatus::Failed`].
pub fn solve<T, F, G>(
    initial_point: &DVector<T>,
    smooth: &F,
    nonsmooth: &G,
    operator: Option<&LinearOperator<T>>,
    options: SolverOptions<T>,
) -> Result<SolverResult<T>>
where
    T: Scalar,
    F: SmoothFunction<T> + ?Sized,
    G: ProximalFunction<T> + ?Sized,
{
    let mut problem = Problem::new(smooth, nonsmooth);
    if let Some(op) = operator {
        problem = problem.with_operator(op);
    }
    SplittingSolver::new(options)?.solve(&problem, initial_point)
}

/// Everything needed to set up and solve a problem.
pub mod prelude {
    pub use crate::solve;
    pub use proxsplit_core::prelude::*;
    pub use proxsplit_functions::{
        ElasticNet, HuberLoss, IndBox, IndSoc, IterativeProx, LogLogisticLoss, Norm1, Norm2,
        Quadratic, QuadraticLoss, SumOfNorm2, Zero,
    };
    pub use proxsplit_optim::prelude::*;
}
