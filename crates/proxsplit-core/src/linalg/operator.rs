//! Linear operators acting on the argument of the smooth term.
//!
//! The composite problem `f(A x + b) + g(x)` needs `A x` for evaluation and
//! `Aᵀ y` to pull gradients back. [`LinearOperator`] is a closed enum over
//! the supported storage kinds so the evaluation path matches exhaustively
//! instead of going through dynamic dispatch.
//!
//! # Element access
//!
//! Elements are addressed either by `(row, col)` or by a flat column-major
//! index `k = row + col * rows`, matching the layout of `nalgebra::DMatrix`.

use crate::core::{
    error::{ProxError, Result},
    types::Scalar,
};
use crate::linalg::sparse::CsrMatrix;
use nalgebra::{DMatrix, DVector, RealField};
use num_traits::Float;
use std::fmt;

/// Storage kind of a [`LinearOperator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OperatorKind {
    Identity,
    Dense,
    Sparse,
    Diagonal,
    Dct2,
    Composed,
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Identity => "identity",
            Self::Dense => "dense",
            Self::Sparse => "sparse",
            Self::Diagonal => "diagonal",
            Self::Dct2 => "dct2",
            Self::Composed => "composed",
        };
        f.write_str(name)
    }
}

/// A linear map `R^cols -> R^rows`.
#[derive(Debug, Clone, PartialEq)]
pub enum LinearOperator<T: Scalar> {
    /// Identity on `R^dim`; application is a copy.
    Identity { dim: usize },
    /// Dense column-major matrix.
    Dense(DMatrix<T>),
    /// Compressed sparse row matrix.
    Sparse(CsrMatrix<T>),
    /// Square diagonal matrix given by its diagonal.
    Diagonal(DVector<T>),
    /// Unnormalised DCT-II on `R^dim`: `y_k = Σ_j x_j cos(π k (2j + 1) / 2n)`.
    Dct2 { dim: usize },
    /// Product `outer · inner`.
    Composed {
        outer: Box<LinearOperator<T>>,
        inner: Box<LinearOperator<T>>,
    },
}

impl<T: Scalar> LinearOperator<T> {
    /// Identity operator on `R^dim`.
    pub fn identity(dim: usize) -> Self {
        Self::Identity { dim }
    }

    /// Dense operator.
    pub fn dense(matrix: DMatrix<T>) -> Self {
        Self::Dense(matrix)
    }

    /// Dense operator from column-major data.
    pub fn from_column_slice(rows: usize, cols: usize, data: &[T]) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ProxError::dimension_mismatch(
                format!("{} entries", rows * cols),
                format!("{} entries", data.len()),
            ));
        }
        Ok(Self::Dense(DMatrix::from_column_slice(rows, cols, data)))
    }

    /// Sparse operator.
    pub fn sparse(matrix: CsrMatrix<T>) -> Self {
        Self::Sparse(matrix)
    }

    /// Diagonal operator.
    pub fn diagonal(diag: DVector<T>) -> Self {
        Self::Diagonal(diag)
    }

    /// DCT-II operator on `R^dim`.
    pub fn dct2(dim: usize) -> Self {
        Self::Dct2 { dim }
    }

    /// Composition `outer · inner`, checking that the inner dimension agrees.
    pub fn compose(outer: LinearOperator<T>, inner: LinearOperator<T>) -> Result<Self> {
        let (_, outer_cols) = outer.shape();
        let (inner_rows, _) = inner.shape();
        if outer_cols != inner_rows {
            return Err(ProxError::dimension_mismatch(
                format!("inner operator with {} rows", outer_cols),
                format!("{} rows", inner_rows),
            ));
        }
        Ok(Self::Composed {
            outer: Box::new(outer),
            inner: Box::new(inner),
        })
    }

    /// Returns `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::Identity { dim } | Self::Dct2 { dim } => (*dim, *dim),
            Self::Dense(m) => m.shape(),
            Self::Sparse(m) => (m.nrows(), m.ncols()),
            Self::Diagonal(d) => (d.len(), d.len()),
            Self::Composed { outer, inner } => (outer.shape().0, inner.shape().1),
        }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.shape().0
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.shape().1
    }

    /// Storage kind.
    pub fn kind(&self) -> OperatorKind {
        match self {
            Self::Identity { .. } => OperatorKind::Identity,
            Self::Dense(_) => OperatorKind::Dense,
            Self::Sparse(_) => OperatorKind::Sparse,
            Self::Diagonal(_) => OperatorKind::Diagonal,
            Self::Dct2 { .. } => OperatorKind::Dct2,
            Self::Composed { .. } => OperatorKind::Composed,
        }
    }

    /// True for the identity kind, which skips multiplication entirely.
    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity { .. })
    }

    fn out_of_bounds(&self, index: impl fmt::Display) -> ProxError {
        let (rows, cols) = self.shape();
        ProxError::index_out_of_bounds(index, format!("{}x{}", rows, cols))
    }

    /// Element at `(i, j)`.
    pub fn get(&self, i: usize, j: usize) -> Result<T> {
        let (rows, cols) = self.shape();
        if i >= rows || j >= cols {
            return Err(self.out_of_bounds(format!("({}, {})", i, j)));
        }
        match self {
            Self::Identity { .. } => Ok(if i == j { T::one() } else { T::zero() }),
            Self::Dense(m) => Ok(m[(i, j)]),
            Self::Sparse(m) => m.get(i, j),
            Self::Diagonal(d) => Ok(if i == j { d[i] } else { T::zero() }),
            Self::Dct2 { dim } => Ok(dct2_coefficient(*dim, i, j)),
            Self::Composed { outer, inner } => {
                let mut sum = T::zero();
                for k in 0..outer.ncols() {
                    sum += outer.get(i, k)? * inner.get(k, j)?;
                }
                Ok(sum)
            }
        }
    }

    /// Element at column-major flat index `k`.
    pub fn get_flat(&self, k: usize) -> Result<T> {
        let (rows, cols) = self.shape();
        if rows == 0 || k >= rows * cols {
            return Err(self.out_of_bounds(k));
        }
        self.get(k % rows, k / rows)
    }

    /// Computes `A x`.
    pub fn apply(&self, x: &DVector<T>) -> Result<DVector<T>> {
        let (_, cols) = self.shape();
        if x.len() != cols {
            return Err(ProxError::dimension_mismatch(
                format!("vector of length {}", cols),
                format!("vector of length {}", x.len()),
            ));
        }
        match self {
            Self::Identity { .. } => Ok(x.clone()),
            Self::Dense(m) => Ok(m * x),
            Self::Sparse(m) => m.spmv(x),
            Self::Diagonal(d) => Ok(d.component_mul(x)),
            Self::Dct2 { dim } => Ok(dct2_forward(*dim, x)),
            Self::Composed { outer, inner } => outer.apply(&inner.apply(x)?),
        }
    }

    /// Computes `Aᵀ y`.
    pub fn apply_adjoint(&self, y: &DVector<T>) -> Result<DVector<T>> {
        let (rows, _) = self.shape();
        if y.len() != rows {
            return Err(ProxError::dimension_mismatch(
                format!("vector of length {}", rows),
                format!("vector of length {}", y.len()),
            ));
        }
        match self {
            Self::Identity { .. } => Ok(y.clone()),
            Self::Dense(m) => Ok(m.tr_mul(y)),
            Self::Sparse(m) => m.spmv_transpose(y),
            Self::Diagonal(d) => Ok(d.component_mul(y)),
            Self::Dct2 { dim } => Ok(dct2_adjoint(*dim, y)),
            Self::Composed { outer, inner } => inner.apply_adjoint(&outer.apply_adjoint(y)?),
        }
    }

    /// Materialises the operator as a dense matrix.
    pub fn to_dense(&self) -> DMatrix<T> {
        match self {
            Self::Identity { dim } => DMatrix::identity(*dim, *dim),
            Self::Dense(m) => m.clone(),
            Self::Sparse(m) => m.to_dense(),
            Self::Diagonal(d) => DMatrix::from_diagonal(d),
            Self::Dct2 { dim } => {
                DMatrix::from_fn(*dim, *dim, |i, j| dct2_coefficient(*dim, i, j))
            }
            Self::Composed { outer, inner } => outer.to_dense() * inner.to_dense(),
        }
    }

    /// Upper bound on the squared spectral norm `‖A‖₂²`.
    ///
    /// Exact for the identity, diagonal and DCT-II kinds. Dense and sparse
    /// matrices use `‖A‖_F²`; compositions multiply the bounds of their
    /// factors. No kind is materialised.
    pub fn squared_norm_bound(&self) -> T {
        match self {
            Self::Identity { dim } => {
                if *dim == 0 {
                    T::zero()
                } else {
                    T::one()
                }
            }
            Self::Diagonal(d) => d
                .iter()
                .fold(T::zero(), |acc, v| <T as Float>::max(acc, *v * *v)),
            Self::Dense(m) => m.norm_squared(),
            Self::Sparse(m) => m.frobenius_norm_squared(),
            // Rows are orthogonal: row 0 has squared norm n, the others n/2.
            Self::Dct2 { dim } => <T as Scalar>::from_usize(*dim),
            Self::Composed { outer, inner } => {
                outer.squared_norm_bound() * inner.squared_norm_bound()
            }
        }
    }
}

impl<T: Scalar> From<DMatrix<T>> for LinearOperator<T> {
    fn from(matrix: DMatrix<T>) -> Self {
        Self::Dense(matrix)
    }
}

impl<T: Scalar> From<CsrMatrix<T>> for LinearOperator<T> {
    fn from(matrix: CsrMatrix<T>) -> Self {
        Self::Sparse(matrix)
    }
}

fn dct2_coefficient<T: Scalar>(n: usize, k: usize, j: usize) -> T {
    let angle = <T as RealField>::pi() * <T as Scalar>::from_usize(k * (2 * j + 1))
        / <T as Scalar>::from_usize(2 * n);
    <T as Float>::cos(angle)
}

fn dct2_forward<T: Scalar>(n: usize, x: &DVector<T>) -> DVector<T> {
    DVector::from_fn(n, |k, _| {
        (0..n).fold(T::zero(), |acc, j| acc + x[j] * dct2_coefficient(n, k, j))
    })
}

fn dct2_adjoint<T: Scalar>(n: usize, y: &DVector<T>) -> DVector<T> {
    DVector::from_fn(n, |j, _| {
        (0..n).fold(T::zero(), |acc, k| acc + y[k] * dct2_coefficient(n, k, j))
    })
}
