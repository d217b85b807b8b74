//! Property tests for the function library.
//!
//! Verifies prox optimality on random inputs and that the dispatcher's
//! closed-form kernels agree with each function's own prox.

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};
use proptest::prelude::*;
use proxsplit_core::prelude::*;
use proxsplit_core::test_utils;
use proxsplit_functions::*;

fn penalties() -> Vec<Box<dyn ProximalFunction<f64>>> {
    vec![
        Box::new(Zero),
        Box::new(Norm1::new(0.8).unwrap()),
        Box::new(Norm2::new(1.3).unwrap()),
        Box::new(SumOfNorm2::new(0.6, 2).unwrap()),
        Box::new(ElasticNet::new(0.4, 1.5).unwrap()),
        Box::new(IndBox::new(-0.5, 1.0).unwrap()),
        Box::new(IndSoc),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prox_is_optimal_on_random_inputs(
        xs in prop::collection::vec(-4.0f64..4.0, 6),
        gamma in 0.05f64..3.0,
    ) {
        let x = DVector::from_vec(xs);
        let config = NumericalValidationConfig::default();
        for g in penalties() {
            let (ok, gap) = NumericalValidator::check_prox(g.as_ref(), &x, gamma, &config).unwrap();
            prop_assert!(ok, "{:?}: prox objective improved by {}", g, gap);
        }
    }

    #[test]
    fn dispatched_prox_matches_own_prox(
        xs in prop::collection::vec(-4.0f64..4.0, 6),
        gamma in 0.05f64..3.0,
    ) {
        let x = DVector::from_vec(xs);
        let dispatcher = ProxDispatcher::default();
        for g in penalties() {
            let fast = dispatcher.prox(g.as_ref(), &x, gamma).unwrap();
            let own = g.prox(&x, gamma).unwrap();
            prop_assert!((fast - own).amax() <= 1e-12, "{:?}", g);
        }
    }
}

#[test]
fn test_dispatch_table_coverage() {
    let dispatcher = ProxDispatcher::default();
    let routines: Vec<ProxRoutine> = penalties()
        .iter()
        .map(|g| dispatcher.select(&g.capabilities()))
        .collect();
    assert_eq!(
        routines,
        vec![
            ProxRoutine::Identity,
            ProxRoutine::SoftThreshold,
            ProxRoutine::Generic,
            ProxRoutine::GroupSoftThreshold,
            ProxRoutine::ElasticNetShrink,
            ProxRoutine::BoxClamp,
            ProxRoutine::SocProjection,
        ]
    );
}

#[test]
fn test_group_lasso_generic_path_bisects_blocks() {
    let g = SumOfNorm2::new(1.0, 3).unwrap();
    let x = DVector::from_vec(vec![1.0, 2.0, 2.0, 0.1, 0.2, 0.2]);
    let generic = ProxDispatcher::generic_only().prox(&g, &x, 0.9).unwrap();
    let fast = ProxDispatcher::default().prox(&g, &x, 0.9).unwrap();
    assert_relative_eq!(generic, fast, epsilon = 1e-14);
    // first block has norm 3 and shrinks by 0.9, second is zeroed
    assert_relative_eq!(generic.rows(0, 3).norm(), 2.1, epsilon = 1e-14);
    assert_eq!(generic.rows(3, 3).norm(), 0.0);
}

#[test]
fn test_smooth_gradients_match_finite_differences() {
    let mut rng = test_utils::rng(7);
    let q = test_utils::random_spd_matrix::<f64>(&mut rng, 4, 0.5);
    let x = test_utils::random_vector::<f64>(&mut rng, 4);
    let config = NumericalValidationConfig::default();

    let smooth: Vec<Box<dyn SmoothFunction<f64>>> = vec![
        Box::new(Quadratic::new(q, test_utils::random_vector(&mut rng, 4)).unwrap()),
        Box::new(
            QuadraticLoss::new(
                DVector::from_vec(vec![1.0, 2.0, 0.5, 3.0]),
                test_utils::random_vector(&mut rng, 4),
            )
            .unwrap(),
        ),
        Box::new(LogLogisticLoss::new(1.0).unwrap()),
        Box::new(HuberLoss::new(0.7).unwrap()),
    ];
    for f in &smooth {
        let check = NumericalValidator::check_gradient(f.as_ref(), &x, &config).unwrap();
        assert!(check.passed, "{:?}: {}", f, check.max_relative_error);
    }
}

#[test]
fn test_quadratic_closed_form_prox_against_iterative() {
    let mut rng = test_utils::rng(11);
    let q_matrix = test_utils::random_spd_matrix::<f64>(&mut rng, 5, 0.1);
    let q = test_utils::random_vector::<f64>(&mut rng, 5);
    let x = test_utils::random_vector::<f64>(&mut rng, 5);

    let closed = Quadratic::new(q_matrix.clone(), q.clone()).unwrap();
    let iterative = IterativeProx::new(Quadratic::new(q_matrix, q).unwrap());
    for gamma in [0.1, 1.0] {
        let a = ProximalFunction::prox(&closed, &x, gamma).unwrap();
        let b = iterative.prox(&x, gamma).unwrap();
        assert_relative_eq!(a, b, epsilon = 1e-7);
    }
}

#[test]
fn test_indefinite_quadratic_prox_fails_cleanly() {
    let q = Quadratic::from_matrix(DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, -4.0])))
        .unwrap();
    let err = ProximalFunction::prox(&q, &DVector::from_vec(vec![1.0, 1.0]), 1.0).unwrap_err();
    assert!(matches!(err, ProxError::NumericalFailure { .. }));
}
