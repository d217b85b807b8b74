//! Seeded random problem data for tests and benchmarks.

use crate::core::types::Scalar;
use crate::linalg::{CsrMatrix, LinearOperator};
use nalgebra::{DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Small, fast, reproducible RNG.
pub fn rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}

/// Vector with entries uniform in `[-1, 1)`.
pub fn random_vector<T: Scalar>(rng: &mut SmallRng, n: usize) -> DVector<T> {
    DVector::from_fn(n, |_, _| <T as Scalar>::from_f64(rng.gen_range(-1.0..1.0)))
}

/// Dense matrix with entries uniform in `[-1, 1)`.
pub fn random_matrix<T: Scalar>(rng: &mut SmallRng, rows: usize, cols: usize) -> DMatrix<T> {
    DMatrix::from_fn(rows, cols, |_, _| {
        <T as Scalar>::from_f64(rng.gen_range(-1.0..1.0))
    })
}

/// Symmetric positive definite matrix `MᵀM + shift · I`.
pub fn random_spd_matrix<T: Scalar>(rng: &mut SmallRng, n: usize, shift: T) -> DMatrix<T> {
    let m = random_matrix::<T>(rng, n, n);
    let mut spd = m.tr_mul(&m);
    for i in 0..n {
        spd[(i, i)] += shift;
    }
    spd
}

/// Sparse matrix where each entry is kept with probability `density`.
pub fn random_sparse<T: Scalar>(
    rng: &mut SmallRng,
    rows: usize,
    cols: usize,
    density: f64,
) -> CsrMatrix<T> {
    let mut triplets = Vec::new();
    for i in 0..rows {
        for j in 0..cols {
            if rng.gen_bool(density) {
                triplets.push((i, j, <T as Scalar>::from_f64(rng.gen_range(-1.0..1.0))));
            }
        }
    }
    // indices are in range by construction
    CsrMatrix::from_triplets(rows, cols, &triplets)
        .unwrap_or_else(|_| CsrMatrix::from_dense(&DMatrix::zeros(rows, cols), T::zero()))
}

/// One operator of each kind with the given shape, where the kind allows it.
pub fn operator_zoo<T: Scalar>(rng: &mut SmallRng, rows: usize, cols: usize) -> Vec<LinearOperator<T>> {
    let dense = random_matrix::<T>(rng, rows, cols);
    let mut ops = vec![
        LinearOperator::dense(dense.clone()),
        LinearOperator::sparse(random_sparse(rng, rows, cols, 0.4)),
    ];
    if rows == cols {
        ops.push(LinearOperator::identity(rows));
        ops.push(LinearOperator::diagonal(random_vector(rng, rows)));
        ops.push(LinearOperator::dct2(rows));
    }
    let inner = LinearOperator::diagonal(random_vector(rng, cols));
    if let Ok(composed) = LinearOperator::compose(LinearOperator::dense(dense), inner) {
        ops.push(composed);
    }
    ops
}
