//! Smooth functions.

pub mod huber;
pub mod logistic;
pub mod quadratic;
pub mod quadratic_loss;

pub use huber::HuberLoss;
pub use logistic::LogLogisticLoss;
pub use quadratic::Quadratic;
pub use quadratic_loss::QuadraticLoss;
