//! Core traits and types for proximal splitting.

pub mod capability;
pub mod error;
pub mod function;
pub mod kernels;
pub mod types;

// Re-export core types
pub use capability::*;
pub use error::*;
pub use function::*;
pub use types::*;
