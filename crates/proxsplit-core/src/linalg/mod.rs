//! Linear algebra: operators, sparse storage and factorisations.

pub mod factored;
pub mod operator;
pub mod sparse;

pub use factored::FactoredMatrix;
pub use operator::{LinearOperator, OperatorKind};
pub use sparse::CsrMatrix;
