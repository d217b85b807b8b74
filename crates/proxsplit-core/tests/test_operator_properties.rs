//! Property tests for linear operators.
//!
//! Every operator kind must satisfy the adjoint identity
//! `⟨A x, y⟩ = ⟨x, Aᵀ y⟩` and agree with its dense materialisation.

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use proxsplit_core::prelude::*;

fn operators(rows: usize, cols: usize, data: &[f64]) -> Vec<LinearOperator<f64>> {
    let dense = DMatrix::from_column_slice(rows, cols, &data[..rows * cols]);
    // zero out every third entry so the sparse copy is actually sparse
    let sparse_source = DMatrix::from_fn(rows, cols, |i, j| {
        if (i + j) % 3 == 0 {
            0.0
        } else {
            dense[(i, j)]
        }
    });
    let mut ops = vec![
        LinearOperator::dense(dense.clone()),
        LinearOperator::sparse(CsrMatrix::from_dense(&sparse_source, 0.0)),
    ];
    if rows == cols {
        ops.push(LinearOperator::identity(rows));
        ops.push(LinearOperator::diagonal(DVector::from_column_slice(&data[..rows])));
        ops.push(LinearOperator::dct2(rows));
    }
    let inner = LinearOperator::diagonal(DVector::from_fn(cols, |i, _| 1.0 + i as f64));
    ops.push(LinearOperator::compose(LinearOperator::dense(dense), inner).unwrap());
    ops
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn adjoint_identity_holds_for_every_kind(
        rows in 1usize..6,
        cols in 1usize..6,
        square in any::<bool>(),
        data in prop::collection::vec(-5.0f64..5.0, 36),
        xs in prop::collection::vec(-5.0f64..5.0, 6),
        ys in prop::collection::vec(-5.0f64..5.0, 6),
    ) {
        let cols = if square { rows } else { cols };
        let x = DVector::from_column_slice(&xs[..cols]);
        let y = DVector::from_column_slice(&ys[..rows]);

        for op in operators(rows, cols, &data) {
            let lhs = op.apply(&x).unwrap().dot(&y);
            let rhs = x.dot(&op.apply_adjoint(&y).unwrap());
            prop_assert!(
                (lhs - rhs).abs() <= 1e-9 * (1.0 + lhs.abs()),
                "{} operator: <Ax, y> = {} but <x, A^T y> = {}", op.kind(), lhs, rhs
            );
        }
    }

    #[test]
    fn element_access_agrees_with_dense(
        rows in 1usize..5,
        cols in 1usize..5,
        data in prop::collection::vec(-5.0f64..5.0, 25),
    ) {
        for op in operators(rows, cols, &data) {
            let (r, c) = op.shape();
            let dense = op.to_dense();
            for k in 0..r * c {
                let expected = dense[(k % r, k / r)];
                prop_assert!((op.get_flat(k).unwrap() - expected).abs() <= 1e-12);
                prop_assert!((op.get(k % r, k / r).unwrap() - expected).abs() <= 1e-12);
            }
            let out_of_range = op.get_flat(r * c);
            prop_assert!(
                matches!(out_of_range, Err(ProxError::IndexOutOfBounds { .. })),
                "expected IndexOutOfBounds"
            );
        }
    }
}

#[test]
fn test_apply_matches_dense_product() {
    let data: Vec<f64> = (0..20).map(|i| (i as f64 * 0.37).sin()).collect();
    let x = DVector::from_fn(5, |i, _| i as f64 - 2.0);
    for op in operators(4, 5, &data) {
        let expected = op.to_dense() * &x;
        assert_relative_eq!(op.apply(&x).unwrap(), expected, epsilon = 1e-12);
    }
}

#[test]
fn test_identity_kind_fast_path() {
    let op = LinearOperator::<f64>::identity(4);
    assert!(op.is_identity());
    assert_eq!(op.kind(), OperatorKind::Identity);
    assert_eq!(op.to_dense(), DMatrix::identity(4, 4));
    assert_eq!(op.squared_norm_bound(), 1.0);
}

#[test]
fn test_sparse_from_triplets_operator() {
    let csr = CsrMatrix::from_triplets(3, 3, &[(0, 0, 2.0), (2, 1, -1.0), (1, 2, 4.0)]).unwrap();
    let op = LinearOperator::from(csr);
    assert_eq!(op.kind(), OperatorKind::Sparse);
    let y = op.apply(&DVector::from_vec(vec![1.0, 2.0, 3.0])).unwrap();
    assert_eq!(y, DVector::from_vec(vec![2.0, 12.0, -2.0]));
}
