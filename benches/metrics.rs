use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tmetric::{
    combinator::{InverseTranspose, Squared, Sum},
    metric::{InverseMeanRatio, Shape, ShapeSizeOrientBarrier, Size},
    nalgebra::{Matrix2, Matrix3},
    numeric,
    testing::*,
    FixedMatrix, TargetMetric,
};

const PAIRS: usize = 100;

fn evaluate_all<M, T>(metric: &T, pairs: &[(M, M)]) -> f64
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    pairs
        .iter()
        .filter_map(|(a, w)| metric.evaluate_with_hess(a, w).unwrap())
        .map(|(value, _, hess)| value + hess.max_abs())
        .sum()
}

fn shape_2d(c: &mut Criterion) {
    let pairs = random_pairs::<Matrix2<f64>>(PAIRS, 42);
    c.bench_function("shape 2d hessian", |b| {
        b.iter(|| evaluate_all(&Shape, black_box(&pairs)))
    });
}

fn shape_3d(c: &mut Criterion) {
    let pairs = random_pairs::<Matrix3<f64>>(PAIRS, 42);
    c.bench_function("shape 3d hessian", |b| {
        b.iter(|| evaluate_all(&Shape, black_box(&pairs)))
    });
}

fn inverse_mean_ratio_3d(c: &mut Criterion) {
    let pairs = random_pairs::<Matrix3<f64>>(PAIRS, 42);
    c.bench_function("inverse mean ratio 3d hessian", |b| {
        b.iter(|| evaluate_all(&InverseMeanRatio, black_box(&pairs)))
    });
}

fn barrier_3d(c: &mut Criterion) {
    let pairs = random_pairs::<Matrix3<f64>>(PAIRS, 42);
    c.bench_function("shape size orient barrier 3d hessian", |b| {
        b.iter(|| evaluate_all(&ShapeSizeOrientBarrier, black_box(&pairs)))
    });

    let metric = InverseTranspose::new(tmetric::metric::ShapeSizeOrient);
    c.bench_function("inverse transpose 3d hessian", |b| {
        b.iter(|| evaluate_all(&metric, black_box(&pairs)))
    });
}

fn combinator_3d(c: &mut Criterion) {
    let pairs = random_pairs::<Matrix3<f64>>(PAIRS, 42);
    let metric = Squared::new(Sum::new(Shape, Size));
    c.bench_function("sqr(shape + size) 3d hessian", |b| {
        b.iter(|| evaluate_all(&metric, black_box(&pairs)))
    });
}

fn numeric_3d(c: &mut Criterion) {
    let pairs = random_pairs::<Matrix3<f64>>(PAIRS, 42);
    c.bench_function("numeric shape 3d hessian", |b| {
        b.iter(|| {
            black_box(&pairs)
                .iter()
                .filter_map(|(a, w)| numeric::hessian(&Shape, a, w).unwrap())
                .map(|hess| hess.max_abs())
                .sum::<f64>()
        })
    });
}

criterion_group!(
    metrics,
    shape_2d,
    shape_3d,
    inverse_mean_ratio_3d,
    barrier_3d,
    combinator_3d,
    numeric_3d
);
criterion_main!(metrics);
