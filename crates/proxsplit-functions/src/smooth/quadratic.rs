//! Quadratic function `½ xᵀQx + qᵀx`.
//!
//! Appears as the smooth term of box-constrained QPs and, with a linear
//! operator, of least-squares problems. Besides the smooth interface it
//! implements [`ProximalFunction`] through the linear system
//! `(I + γQ) z = x − γq`, factored once per step size.

use nalgebra::{DMatrix, DVector};
use num_traits::Float;
use proxsplit_core::{
    core::{
        capability::{Capability, CapabilitySet},
        error::{ensure_len, ProxError, Result},
        function::{ProximalFunction, SmoothFunction},
        types::Scalar,
    },
    linalg::FactoredMatrix,
};
use std::cell::RefCell;

/// Quadratic `½ xᵀQx + qᵀx` with symmetric `Q`.
#[derive(Debug, Clone)]
pub struct Quadratic<T: Scalar> {
    q_matrix: DMatrix<T>,
    q: DVector<T>,
    /// Largest and smallest eigenvalue of `Q`
    spectrum: (T, T),
    /// Factorisation of `I + γQ` for the last step size used by `prox`
    factor: RefCell<Option<(T, FactoredMatrix<T>)>>,
}

impl<T: Scalar> Quadratic<T> {
    /// Creates `½ xᵀQx + qᵀx`.
    ///
    /// # Errors
    ///
    /// Returns `DimensionMismatch` when `Q` is not square or `q` has the
    /// wrong length, and `InvalidParameter` when `Q` is not symmetric.
    pub fn new(q_matrix: DMatrix<T>, q: DVector<T>) -> Result<Self> {
        let n = q_matrix.nrows();
        if q_matrix.ncols() != n {
            return Err(ProxError::dimension_mismatch(
                "square matrix",
                format!("{}x{}", n, q_matrix.ncols()),
            ));
        }
        ensure_len(n, q.len())?;

        let scale = <T as Float>::max(T::one(), abs_max(&q_matrix));
        let tol = <T as Float>::sqrt(T::EPSILON) * scale;
        let asymmetry = abs_max(&(&q_matrix - q_matrix.transpose()));
        if asymmetry > tol {
            return Err(ProxError::invalid_parameter(format!(
                "Q must be symmetric (max asymmetry {})",
                asymmetry
            )));
        }

        let eigenvalues = q_matrix.clone().symmetric_eigenvalues();
        let spectrum = eigenvalues.iter().fold(
            (<T as Float>::neg_infinity(), <T as Float>::infinity()),
            |(hi, lo), &l| (<T as Float>::max(hi, l), <T as Float>::min(lo, l)),
        );
        let spectrum = if n == 0 { (T::zero(), T::zero()) } else { spectrum };

        Ok(Self {
            q_matrix,
            q,
            spectrum,
            factor: RefCell::new(None),
        })
    }

    /// Pure quadratic form `½ xᵀQx`.
    pub fn from_matrix(q_matrix: DMatrix<T>) -> Result<Self> {
        let n = q_matrix.nrows();
        Self::new(q_matrix, DVector::zeros(n))
    }

    /// Dimension of the domain.
    pub fn dim(&self) -> usize {
        self.q.len()
    }

    /// The matrix `Q`.
    pub fn matrix(&self) -> &DMatrix<T> {
        &self.q_matrix
    }

    /// The linear term `q`.
    pub fn linear_term(&self) -> &DVector<T> {
        &self.q
    }

    /// Largest absolute eigenvalue of `Q`, the Lipschitz constant of the gradient.
    pub fn lipschitz_constant(&self) -> T {
        <T as Float>::max(
            <T as Float>::abs(self.spectrum.0),
            <T as Float>::abs(self.spectrum.1),
        )
    }

    fn solve_shifted(&self, rhs: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        let mut slot = self.factor.borrow_mut();
        let stale = !matches!(slot.as_ref(), Some((g, _)) if *g == gamma);
        if stale {
            let factor = FactoredMatrix::shifted(&self.q_matrix, T::one(), gamma)?;
            *slot = Some((gamma, factor));
        }
        match slot.as_ref() {
            Some((_, factor)) => factor.solve(rhs),
            None => Err(ProxError::numerical_failure("missing factorisation")),
        }
    }
}

fn abs_max<T: Scalar>(m: &DMatrix<T>) -> T {
    m.iter()
        .fold(T::zero(), |acc, v| <T as Float>::max(acc, <T as Float>::abs(*v)))
}

impl<T: Scalar> SmoothFunction<T> for Quadratic<T> {
    fn value_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>)> {
        ensure_len(self.dim(), x.len())?;
        let qx = &self.q_matrix * x;
        let half = <T as Scalar>::from_f64(0.5);
        let value = half * x.dot(&qx) + self.q.dot(x);
        Ok((value, qx + &self.q))
    }

    fn hessian_vector_product(&self, x: &DVector<T>, v: &DVector<T>) -> Result<DVector<T>> {
        ensure_len(self.dim(), x.len())?;
        ensure_len(self.dim(), v.len())?;
        Ok(&self.q_matrix * v)
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        let mut caps = CapabilitySet::new()
            .with(Capability::Quadratic)
            .with(Capability::LipschitzGradient {
                constant: self.lipschitz_constant(),
            });
        if self.spectrum.1 > T::zero() {
            caps.insert(Capability::StronglyConvex {
                modulus: self.spectrum.1,
            });
        }
        caps
    }

    fn dimension_hint(&self) -> Option<usize> {
        Some(self.dim())
    }
}

impl<T: Scalar> ProximalFunction<T> for Quadratic<T> {
    fn value(&self, x: &DVector<T>) -> Result<T> {
        SmoothFunction::value(self, x)
    }

    /// Solves `(I + γQ) z = x − γq`; requires `I + γQ` positive definite.
    fn prox(&self, x: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        ensure_len(self.dim(), x.len())?;
        let rhs = x - &self.q * gamma;
        self.solve_shifted(&rhs, gamma)
    }

    fn capabilities(&self) -> CapabilitySet<T> {
        SmoothFunction::capabilities(self)
    }
}
