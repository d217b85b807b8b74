//! Proximal splitting solver for composite problems.
//!
//! This crate minimises `f(A x + b) + g(x)` with `f` smooth and `g`
//! proximable by running limited-memory quasi-Newton steps on the
//! forward-backward envelope, falling back to plain forward-backward steps
//! whenever the line search cannot make progress.
//!
//! # Components
//!
//! - [`Problem`]: borrowed problem data with an optional linear operator
//! - [`EvaluationCache`]: memoised envelope quantities at one point
//! - [`HistoryBuffer`]: curvature pairs and the two-loop recursion
//! - [`EnvelopeLineSearch`]: Armijo backtracking on the envelope
//! - [`SplittingSolver`]: the iteration itself
//!
//! # Examples
//!
//! ```rust
//! use proxsplit_optim::{SolverOptions, SplittingSolver};
//!
//! let options = SolverOptions::<f64>::new()
//!     .with_tolerance(1e-10)
//!     .with_memory_size(5)
//!     .with_initial_step_size(0.1);
//! let solver = SplittingSolver::new(options).unwrap();
//! assert_eq!(solver.history().capacity(), 5);
//!
//! // let result = solver.solve(&problem, &x0)?;
//! ```

pub mod cache;
pub mod callback;
pub mod error;
pub mod history;
pub mod line_search;
pub mod options;
pub mod problem;
pub mod result;
pub mod solver;

pub use cache::{CacheStats, EvaluationCache};
pub use callback::{CallbackAction, IterationInfo, NoOpCallback, ResidualRecorder, SolverCallback};
pub use error::{Result, SolverError, SolverResultOf};
pub use history::{CurvaturePair, HistoryBuffer};
pub use line_search::{EnvelopeLineSearch, LineSearchOutcome};
pub use options::SolverOptions;
pub use problem::Problem;
pub use result::{SolverResult, SolverState, TerminationStatus};
pub use solver::SplittingSolver;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        CallbackAction, IterationInfo, Problem, SolverCallback, SolverError, SolverOptions,
        SolverResult, SolverState, SplittingSolver, TerminationStatus,
    };
}
