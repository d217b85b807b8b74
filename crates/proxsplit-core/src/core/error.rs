//! Error types for operators, functions and proximal maps.
//!
//! Every fallible operation in the core crate returns [`ProxError`]. Solver
//! level failures (configuration, line search) live in the optimizer crate
//! and wrap this type.

use thiserror::Error;

/// Errors raised by linear operators, function evaluations and prox kernels.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProxError {
    /// Element access outside the operator shape.
    #[error("Index {index} out of bounds for shape {shape}")]
    IndexOutOfBounds {
        /// Requested index, formatted
        index: String,
        /// Shape of the accessed object, formatted
        shape: String,
    },

    /// Dimension mismatch between vectors or operators.
    ///
    /// This error occurs when an operand length disagrees with the declared
    /// shape of an operator or with the block structure of a function.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// A function or prox produced a non-finite value, or a factorisation failed.
    #[error("Numerical failure: {reason}")]
    NumericalFailure {
        /// Description of the numerical issue
        reason: String,
    },

    /// A function or operator was constructed with an invalid parameter.
    #[error("Invalid parameter: {reason}")]
    InvalidParameter {
        /// Description of the invalid parameter
        reason: String,
    },

    /// Method or feature not implemented.
    #[error("Feature not implemented: {feature}")]
    NotImplemented {
        /// Name of the unimplemented feature
        feature: String,
    },
}

impl ProxError {
    /// Create an IndexOutOfBounds error.
    pub fn index_out_of_bounds<S1, S2>(index: S1, shape: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::IndexOutOfBounds {
            index: index.to_string(),
            shape: shape.to_string(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a NumericalFailure with a custom reason.
    pub fn numerical_failure<S: Into<String>>(reason: S) -> Self {
        Self::NumericalFailure {
            reason: reason.into(),
        }
    }

    /// Create an InvalidParameter error with a custom reason.
    pub fn invalid_parameter<S: Into<String>>(reason: S) -> Self {
        Self::InvalidParameter {
            reason: reason.into(),
        }
    }

    /// Create a NotImplemented error for a specific feature.
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Returns true for errors caused by non-finite arithmetic.
    pub fn is_numerical(&self) -> bool {
        matches!(self, Self::NumericalFailure { .. })
    }
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, ProxError>;

/// Checks that a vector length matches the expected dimension.
pub fn ensure_len(expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(ProxError::dimension_mismatch(expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prox_error_display() {
        let err = ProxError::index_out_of_bounds("(3, 0)", "2x2");
        assert_eq!(err.to_string(), "Index (3, 0) out of bounds for shape 2x2");

        let err = ProxError::dimension_mismatch("3", "4");
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");

        let err = ProxError::numerical_failure("NaN in gradient");
        assert_eq!(err.to_string(), "Numerical failure: NaN in gradient");

        let err = ProxError::not_implemented("hessian");
        assert!(err.to_string().contains("hessian"));
    }

    #[test]
    fn test_error_kinds() {
        let err = ProxError::invalid_parameter("mu must be nonnegative");
        assert!(matches!(err, ProxError::InvalidParameter { .. }));
        assert!(!err.is_numerical());
        assert!(ProxError::numerical_failure("inf").is_numerical());
    }

    #[test]
    fn test_ensure_len() {
        assert!(ensure_len(3, 3).is_ok());
        match ensure_len(3, 2) {
            Err(ProxError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, "3");
                assert_eq!(actual, "2");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
