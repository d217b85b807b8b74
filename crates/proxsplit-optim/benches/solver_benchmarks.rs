//! Benchmarks for the splitting solver and its building blocks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::DVector;
use proxsplit_core::{linalg::LinearOperator, test_utils};
use proxsplit_functions::{Norm1, QuadraticLoss};
use proxsplit_optim::{HistoryBuffer, Problem, SolverOptions, SplittingSolver};

fn benchmark_lasso_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("lasso");

    for &(rows, cols) in &[(20, 50), (100, 250), (200, 500)] {
        let mut rng = test_utils::rng(42);
        let a = LinearOperator::dense(test_utils::random_matrix::<f64>(&mut rng, rows, cols));
        let offset = test_utils::random_vector::<f64>(&mut rng, rows);
        let f = QuadraticLoss::squared_norm(rows);
        let g = Norm1::new(0.1).unwrap();
        let problem = Problem::new(&f, &g).with_operator(&a).with_offset(&offset);
        let x0 = DVector::zeros(cols);

        group.bench_with_input(BenchmarkId::new("dense", cols), &cols, |b, _| {
            b.iter(|| {
                let mut solver =
                    SplittingSolver::new(SolverOptions::default().with_tolerance(1e-6)).unwrap();
                black_box(solver.solve(&problem, &x0).unwrap())
            })
        });

        let sparse = LinearOperator::sparse(test_utils::random_sparse::<f64>(&mut rng, rows, cols, 0.1));
        let sparse_problem = Problem::new(&f, &g).with_operator(&sparse).with_offset(&offset);
        group.bench_with_input(BenchmarkId::new("sparse", cols), &cols, |b, _| {
            b.iter(|| {
                let mut solver =
                    SplittingSolver::new(SolverOptions::default().with_tolerance(1e-6)).unwrap();
                black_box(solver.solve(&sparse_problem, &x0).unwrap())
            })
        });
    }

    group.finish();
}

fn benchmark_memory_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_size");
    let mut rng = test_utils::rng(7);
    let a = LinearOperator::dense(test_utils::random_matrix::<f64>(&mut rng, 80, 120));
    let offset = test_utils::random_vector::<f64>(&mut rng, 80);
    let f = QuadraticLoss::squared_norm(80);
    let g = Norm1::new(0.05).unwrap();
    let problem = Problem::new(&f, &g).with_operator(&a).with_offset(&offset);
    let x0 = DVector::zeros(120);

    for &memory in &[1, 5, 10, 20] {
        group.bench_with_input(BenchmarkId::from_parameter(memory), &memory, |b, &memory| {
            b.iter(|| {
                let options = SolverOptions::default()
                    .with_tolerance(1e-6)
                    .with_memory_size(memory);
                let mut solver = SplittingSolver::new(options).unwrap();
                black_box(solver.solve(&problem, &x0).unwrap())
            })
        });
    }

    group.finish();
}

fn benchmark_two_loop_recursion(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_loop");

    for &dim in &[100, 1000, 10000] {
        let mut rng = test_utils::rng(3);
        let mut buffer = HistoryBuffer::<f64>::new(10).unwrap();
        while buffer.len() < 10 {
            let s = test_utils::random_vector::<f64>(&mut rng, dim);
            let y = &s * 2.0 + test_utils::random_vector::<f64>(&mut rng, dim) * 0.1;
            buffer.push(s, y);
        }
        let g = test_utils::random_vector::<f64>(&mut rng, dim);

        group.bench_with_input(BenchmarkId::from_parameter(dim), &dim, |b, _| {
            b.iter(|| black_box(buffer.compute_direction(black_box(&g)).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_lasso_sizes,
    benchmark_memory_sizes,
    benchmark_two_loop_recursion
);
criterion_main!(benches);
