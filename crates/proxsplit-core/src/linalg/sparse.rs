//! Compressed sparse row storage.
//!
//! Used by [`LinearOperator::Sparse`](super::LinearOperator) for data
//! matrices where most entries are zero.

use crate::core::{
    error::{ProxError, Result},
    types::Scalar,
};
use nalgebra::{DMatrix, DVector};
use num_traits::Float;

/// Compressed Sparse Row (CSR) format matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix<T: Scalar> {
    /// Number of rows
    nrows: usize,
    /// Number of columns
    ncols: usize,
    /// Row pointers (length nrows + 1)
    row_ptr: Vec<usize>,
    /// Column indices (length nnz)
    col_idx: Vec<usize>,
    /// Non-zero values (length nnz)
    values: Vec<T>,
}

impl<T: Scalar> CsrMatrix<T> {
    /// Creates a new CSR matrix from raw data.
    ///
    /// Row pointers must start at zero and be nondecreasing; column indices
    /// must be strictly increasing within a row and smaller than `ncols`.
    pub fn new(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self> {
        if row_ptr.len() != nrows + 1 {
            return Err(ProxError::dimension_mismatch(
                format!("row_ptr length {}", nrows + 1),
                format!("row_ptr length {}", row_ptr.len()),
            ));
        }
        if row_ptr[0] != 0 || row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(ProxError::invalid_parameter(
                "row_ptr must start at 0 and be nondecreasing",
            ));
        }

        let nnz = row_ptr[nrows];
        if col_idx.len() != nnz {
            return Err(ProxError::dimension_mismatch(
                format!("col_idx length {}", nnz),
                format!("col_idx length {}", col_idx.len()),
            ));
        }
        if values.len() != nnz {
            return Err(ProxError::dimension_mismatch(
                format!("values length {}", nnz),
                format!("values length {}", values.len()),
            ));
        }

        for i in 0..nrows {
            let row = &col_idx[row_ptr[i]..row_ptr[i + 1]];
            if let Some(&j) = row.iter().find(|&&j| j >= ncols) {
                return Err(ProxError::index_out_of_bounds(
                    format!("({}, {})", i, j),
                    format!("{}x{}", nrows, ncols),
                ));
            }
            if row.windows(2).any(|w| w[0] >= w[1]) {
                return Err(ProxError::invalid_parameter(format!(
                    "column indices of row {} are not strictly increasing",
                    i
                )));
            }
        }

        Ok(Self {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// Creates a CSR matrix from a dense matrix, dropping entries with
    /// magnitude at most `tolerance`.
    pub fn from_dense(dense: &DMatrix<T>, tolerance: T) -> Self {
        let mut row_ptr = vec![0];
        let mut col_idx = Vec::new();
        let mut values = Vec::new();

        for i in 0..dense.nrows() {
            for j in 0..dense.ncols() {
                let val = dense[(i, j)];
                if Float::abs(val) > tolerance {
                    col_idx.push(j);
                    values.push(val);
                }
            }
            row_ptr.push(col_idx.len());
        }

        Self {
            nrows: dense.nrows(),
            ncols: dense.ncols(),
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Builds a CSR matrix from `(row, col, value)` triplets.
    ///
    /// Duplicate coordinates are summed. Explicit zeros are kept out.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self> {
        if let Some(&(r, c, _)) = triplets.iter().find(|&&(r, c, _)| r >= nrows || c >= ncols) {
            return Err(ProxError::index_out_of_bounds(
                format!("({}, {})", r, c),
                format!("{}x{}", nrows, ncols),
            ));
        }

        let mut sorted = triplets.to_vec();
        sorted.sort_by_key(|&(r, c, _)| (r, c));

        let mut merged: Vec<(usize, usize, T)> = Vec::with_capacity(sorted.len());
        for (r, c, v) in sorted {
            match merged.last_mut() {
                Some((last_r, last_c, last_v)) if *last_r == r && *last_c == c => {
                    *last_v += v;
                }
                _ => merged.push((r, c, v)),
            }
        }

        let mut row_ptr = vec![0; nrows + 1];
        let mut col_idx = Vec::with_capacity(merged.len());
        let mut values = Vec::with_capacity(merged.len());
        for (r, c, v) in merged.into_iter().filter(|&(_, _, v)| v != T::zero()) {
            row_ptr[r + 1] += 1;
            col_idx.push(c);
            values.push(v);
        }
        for i in 0..nrows {
            row_ptr[i + 1] += row_ptr[i];
        }

        Ok(Self {
            nrows,
            ncols,
            row_ptr,
            col_idx,
            values,
        })
    }

    /// Converts to a dense matrix.
    pub fn to_dense(&self) -> DMatrix<T> {
        let mut dense = DMatrix::zeros(self.nrows, self.ncols);
        for i in 0..self.nrows {
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                dense[(i, self.col_idx[k])] = self.values[k];
            }
        }
        dense
    }

    /// Returns the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Returns the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Squared Frobenius norm, summed over the stored values only.
    pub fn frobenius_norm_squared(&self) -> T {
        self.values.iter().fold(T::zero(), |acc, v| acc + *v * *v)
    }

    /// Returns the number of stored elements.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Returns the sparsity (fraction of zero elements).
    #[inline]
    pub fn sparsity(&self) -> f64 {
        let total_elements = self.nrows * self.ncols;
        if total_elements == 0 {
            0.0
        } else {
            1.0 - (self.nnz() as f64 / total_elements as f64)
        }
    }

    /// Element `(i, j)`, zero when not stored.
    pub fn get(&self, i: usize, j: usize) -> Result<T> {
        if i >= self.nrows || j >= self.ncols {
            return Err(ProxError::index_out_of_bounds(
                format!("({}, {})", i, j),
                format!("{}x{}", self.nrows, self.ncols),
            ));
        }
        let start = self.row_ptr[i];
        let row = &self.col_idx[start..self.row_ptr[i + 1]];
        Ok(row
            .binary_search(&j)
            .map(|pos| self.values[start + pos])
            .unwrap_or_else(|_| T::zero()))
    }

    /// Sparse matrix-vector multiplication: `A x`.
    pub fn spmv(&self, x: &DVector<T>) -> Result<DVector<T>> {
        if x.len() != self.ncols {
            return Err(ProxError::dimension_mismatch(
                format!("vector length {}", self.ncols),
                format!("vector length {}", x.len()),
            ));
        }

        let mut y = DVector::zeros(self.nrows);
        for i in 0..self.nrows {
            let mut sum = T::zero();
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                sum += self.values[k] * x[self.col_idx[k]];
            }
            y[i] = sum;
        }
        Ok(y)
    }

    /// Transposed multiplication `Aᵀ y` without forming the transpose.
    pub fn spmv_transpose(&self, y: &DVector<T>) -> Result<DVector<T>> {
        if y.len() != self.nrows {
            return Err(ProxError::dimension_mismatch(
                format!("vector length {}", self.nrows),
                format!("vector length {}", y.len()),
            ));
        }

        let mut x = DVector::zeros(self.ncols);
        for i in 0..self.nrows {
            let yi = y[i];
            if yi == T::zero() {
                continue;
            }
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                x[self.col_idx[k]] += self.values[k] * yi;
            }
        }
        Ok(x)
    }

    /// Transpose of the sparse matrix.
    pub fn transpose(&self) -> Self {
        let mut t_row_ptr = vec![0; self.ncols + 1];
        for &j in &self.col_idx {
            t_row_ptr[j + 1] += 1;
        }
        for j in 0..self.ncols {
            t_row_ptr[j + 1] += t_row_ptr[j];
        }

        let mut t_col_idx = vec![0; self.nnz()];
        let mut t_values = vec![T::zero(); self.nnz()];
        let mut next = t_row_ptr[..self.ncols].to_vec();

        for i in 0..self.nrows {
            for k in self.row_ptr[i]..self.row_ptr[i + 1] {
                let j = self.col_idx[k];
                let pos = next[j];
                t_col_idx[pos] = i;
                t_values[pos] = self.values[k];
                next[j] += 1;
            }
        }

        Self {
            nrows: self.ncols,
            ncols: self.nrows,
            row_ptr: t_row_ptr,
            col_idx: t_col_idx,
            values: t_values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> DMatrix<f64> {
        DMatrix::from_row_slice(3, 4, &[
            1.0, 0.0, 2.0, 0.0,
            0.0, 0.0, 0.0, 3.0,
            4.0, 5.0, 0.0, 0.0,
        ])
    }

    #[test]
    fn test_csr_creation_validates() {
        let ok = CsrMatrix::new(2, 2, vec![0, 1, 2], vec![0, 1], vec![1.0, 2.0]);
        assert!(ok.is_ok());

        let bad_ptr = CsrMatrix::new(2, 2, vec![0, 1], vec![0], vec![1.0]);
        assert!(matches!(bad_ptr, Err(ProxError::DimensionMismatch { .. })));

        let bad_col = CsrMatrix::new(2, 2, vec![0, 1, 2], vec![0, 2], vec![1.0, 2.0]);
        assert!(matches!(bad_col, Err(ProxError::IndexOutOfBounds { .. })));

        let unsorted = CsrMatrix::new(1, 3, vec![0, 2], vec![2, 0], vec![1.0, 2.0]);
        assert!(matches!(unsorted, Err(ProxError::InvalidParameter { .. })));
    }

    #[test]
    fn test_dense_roundtrip_and_get() {
        let dense = sample();
        let csr = CsrMatrix::from_dense(&dense, 0.0);
        assert_eq!(csr.nnz(), 5);
        assert_eq!(csr.to_dense(), dense);
        assert_eq!(csr.get(2, 1).unwrap(), 5.0);
        assert_eq!(csr.get(1, 1).unwrap(), 0.0);
        assert!(matches!(csr.get(3, 0), Err(ProxError::IndexOutOfBounds { .. })));
        assert_relative_eq!(csr.sparsity(), 7.0 / 12.0);
    }

    #[test]
    fn test_from_triplets_sums_duplicates() {
        let csr = CsrMatrix::from_triplets(
            2,
            3,
            &[(1, 2, 1.0), (0, 0, 2.0), (1, 2, 0.5), (0, 1, 0.0)],
        )
        .unwrap();
        assert_eq!(csr.nnz(), 2);
        assert_eq!(csr.get(1, 2).unwrap(), 1.5);
        assert_eq!(csr.get(0, 0).unwrap(), 2.0);

        assert!(CsrMatrix::<f64>::from_triplets(2, 2, &[(2, 0, 1.0)]).is_err());
    }

    #[test]
    fn test_spmv_matches_dense() {
        let dense = sample();
        let csr = CsrMatrix::from_dense(&dense, 0.0);
        let x = DVector::from_vec(vec![1.0, -1.0, 0.5, 2.0]);
        let y = DVector::from_vec(vec![0.3, -2.0, 1.0]);

        assert_relative_eq!(csr.spmv(&x).unwrap(), &dense * &x, epsilon = 1e-14);
        assert_relative_eq!(
            csr.spmv_transpose(&y).unwrap(),
            dense.tr_mul(&y),
            epsilon = 1e-14
        );
        assert_eq!(csr.transpose().to_dense(), dense.transpose());
        assert!(csr.spmv(&y).is_err());
    }
}
