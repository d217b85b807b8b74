//! Cached Cholesky factorisations for repeated linear solves.

use crate::core::{
    error::{ProxError, Result},
    types::Scalar,
};
use nalgebra::{Cholesky, DMatrix, DVector, Dyn};

/// Cholesky factor of a symmetric positive definite matrix.
#[derive(Debug, Clone)]
pub struct FactoredMatrix<T: Scalar> {
    factor: Cholesky<T, Dyn>,
}

impl<T: Scalar> FactoredMatrix<T> {
    /// Factors `matrix`, failing when it is not square or not positive definite.
    pub fn new(matrix: DMatrix<T>) -> Result<Self> {
        if !matrix.is_square() {
            return Err(ProxError::dimension_mismatch(
                "square matrix",
                format!("{}x{}", matrix.nrows(), matrix.ncols()),
            ));
        }
        Cholesky::new(matrix)
            .map(|factor| Self { factor })
            .ok_or_else(|| ProxError::numerical_failure("matrix is not positive definite"))
    }

    /// Factors `shift · I + scale · matrix`.
    pub fn shifted(matrix: &DMatrix<T>, shift: T, scale: T) -> Result<Self> {
        let n = matrix.nrows();
        let mut shifted = matrix * scale;
        for i in 0..n.min(matrix.ncols()) {
            shifted[(i, i)] += shift;
        }
        Self::new(shifted)
    }

    /// Dimension of the factored matrix.
    pub fn dim(&self) -> usize {
        self.factor.l_dirty().nrows()
    }

    /// Solves `M x = rhs`.
    pub fn solve(&self, rhs: &DVector<T>) -> Result<DVector<T>> {
        if rhs.len() != self.dim() {
            return Err(ProxError::dimension_mismatch(self.dim(), rhs.len()));
        }
        Ok(self.factor.solve(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_solve_spd() {
        let m = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
        let f = FactoredMatrix::new(m.clone()).unwrap();
        let b = DVector::from_vec(vec![1.0, 2.0]);
        let x = f.solve(&b).unwrap();
        assert_relative_eq!(&m * &x, b, epsilon = 1e-12);
        assert!(f.solve(&DVector::zeros(3)).is_err());
    }

    #[test]
    fn test_rejects_indefinite() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(matches!(
            FactoredMatrix::new(m),
            Err(ProxError::NumericalFailure { .. })
        ));
        assert!(FactoredMatrix::<f64>::new(DMatrix::zeros(2, 3)).is_err());
    }

    #[test]
    fn test_shifted_factorisation() {
        let q = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 4.0]);
        let f = FactoredMatrix::shifted(&q, 1.0, 0.5).unwrap();
        let x = f.solve(&DVector::from_vec(vec![2.0, 3.0])).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-14);
    }
}
