//! Sample elements and utilities useful for testing, benchmarking and
//! debugging metrics.
//!
//! [`Fixtures`] provides a few hand-picked matrices (a well-shaped element, a
//! small distorted element and an inverted element) and [`random_pairs`]
//! generates reproducible valid `(A, W)` pairs. The `assert_*` functions check
//! closed-form derivatives of a metric against [finite
//! differences](crate::numeric).

#![allow(unused)]

use nalgebra::{Matrix2, Matrix3};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::Uniform;

use crate::core::{FixedMatrix, Hessian, TargetMetric};
use crate::numeric;

/// Relative tolerance used when comparing closed-form derivatives with finite
/// differences.
pub const DERIVATIVE_TOLERANCE: f64 = 1e-4;

/// Hand-picked sample matrices.
pub trait Fixtures: FixedMatrix {
    /// A symmetric positive definite matrix.
    fn sample_a() -> Self;
    /// A small distorted matrix with positive determinant.
    fn sample_b() -> Self;
    /// A matrix with negative determinant.
    fn sample_c() -> Self;
}

impl Fixtures for Matrix2<f64> {
    fn sample_a() -> Self {
        // det = 1
        Matrix2::new(1.0, 2.0, 2.0, 5.0)
    }

    fn sample_b() -> Self {
        // det = 0.0425
        Matrix2::new(-0.1, -0.15, -0.25, -0.8)
    }

    fn sample_c() -> Self {
        Matrix2::new(-1.0, 0.5, 0.0, 1.0)
    }
}

impl Fixtures for Matrix3<f64> {
    fn sample_a() -> Self {
        // det = 4
        Matrix3::new(2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0)
    }

    fn sample_b() -> Self {
        // det = 2.081
        Matrix3::new(1.5, -0.7, -0.8, 0.8, -1.3, -0.7, 0.6, -0.9, -2.0)
    }

    fn sample_c() -> Self {
        // det = -0.75
        Matrix3::new(0.5, 0.0, 0.1, 0.5, 1.0, 0.1, 0.0, 0.0, -1.5)
    }
}

/// Standard `(A, W)` pairs built from the fixtures. The pair with the inverted
/// element is included only if requested, since it is outside of the domain
/// of barrier metrics.
pub fn fixture_pairs<M: Fixtures>(inverted: bool) -> Vec<(M, M)> {
    let i = M::one();
    let a = M::sample_a();
    let b = M::sample_b();

    let mut pairs = vec![(i, a), (a, i), (i, b), (b, i), (a, b), (b, a)];
    if inverted {
        pairs.push((M::sample_c(), i));
    }
    pairs
}

/// Random matrix close to a scaled identity, which has always positive
/// determinant.
pub fn random_element<M: FixedMatrix, R: Rng + ?Sized>(rng: &mut R) -> M {
    let perturbation = Uniform::new(-0.3, 0.3);
    let scale = rng.sample(Uniform::new(0.5, 2.0));
    M::from_fn(|i, j| {
        let base = if i == j { 1.0 } else { 0.0 };
        (base + rng.sample(perturbation)) * scale
    })
}

/// Generates reproducible `(A, W)` pairs of elements with positive
/// determinant.
pub fn random_pairs<M: FixedMatrix>(count: usize, seed: u64) -> Vec<(M, M)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let a = random_element(&mut rng);
            let w = random_element(&mut rng);
            (a, w)
        })
        .collect()
}

/// Returns `true` if the values are equal up to the relative tolerance.
pub fn is_close(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() <= tolerance * (1.0 + actual.abs().max(expected.abs()))
}

fn max_abs<M: FixedMatrix>(m: &M) -> f64 {
    let mut max = 0.0f64;
    for i in 0..M::DIM {
        for j in 0..M::DIM {
            max = max.max(m[(i, j)].abs());
        }
    }
    max
}

/// Asserts that two matrices are equal up to a tolerance relative to the
/// largest entry.
pub fn assert_matrix_close<M: FixedMatrix>(actual: &M, expected: &M, tolerance: f64, what: &str) {
    let scale = 1.0 + max_abs(actual).max(max_abs(expected));
    for i in 0..M::DIM {
        for j in 0..M::DIM {
            assert!(
                (actual[(i, j)] - expected[(i, j)]).abs() <= tolerance * scale,
                "{}: entry ({}, {}) differs: {} != {}\nactual = {:?}\nexpected = {:?}",
                what,
                i,
                j,
                actual[(i, j)],
                expected[(i, j)],
                actual,
                expected
            );
        }
    }
}

/// Asserts that two Hessians are equal up to a tolerance relative to the
/// largest entry.
pub fn assert_hessian_close<M: FixedMatrix>(
    actual: &Hessian<M>,
    expected: &Hessian<M>,
    tolerance: f64,
    what: &str,
) {
    let scale = 1.0 + actual.max_abs().max(expected.max_abs());
    for (index, (i, j)) in Hessian::<M>::pairs().enumerate() {
        let (actual, expected) = (actual[index], expected[index]);
        for k in 0..M::DIM {
            for l in 0..M::DIM {
                assert!(
                    (actual[(k, l)] - expected[(k, l)]).abs() <= tolerance * scale,
                    "{}: block ({}, {}) entry ({}, {}) differs: {} != {}",
                    what,
                    i,
                    j,
                    k,
                    l,
                    actual[(k, l)],
                    expected[(k, l)]
                );
            }
        }
    }
}

/// Asserts that `evaluate` and `evaluate_with_grad` agree and that the
/// gradient matches finite differences of `evaluate`.
pub fn assert_gradient_consistent<M, T>(metric: &T, a: &M, w: &M)
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    let name = metric.name();
    let value = metric.evaluate(a, w).expect("evaluate failed");
    let with_grad = metric.evaluate_with_grad(a, w).expect("evaluate_with_grad failed");

    match (value, with_grad) {
        (None, None) => {}
        (Some(value), Some((value_g, grad))) => {
            assert!(
                is_close(value_g, value, 1e-10),
                "{}: values differ: {} != {}",
                name,
                value_g,
                value
            );

            let numeric = numeric::gradient(metric, a, w)
                .expect("numeric gradient failed")
                .expect("metric is not defined around the point");
            assert_matrix_close(
                &grad,
                &numeric,
                DERIVATIVE_TOLERANCE,
                &format!("{} gradient at A = {:?}, W = {:?}", name, a, w),
            );
        }
        _ => panic!("{}: evaluate and evaluate_with_grad disagree on validity", name),
    }
}

/// Asserts that `evaluate_with_grad` and `evaluate_with_hess` agree and that
/// the Hessian matches finite differences of `evaluate_with_grad`.
pub fn assert_hessian_consistent<M, T>(metric: &T, a: &M, w: &M)
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    let name = metric.name();
    let with_grad = metric.evaluate_with_grad(a, w).expect("evaluate_with_grad failed");
    let with_hess = metric.evaluate_with_hess(a, w).expect("evaluate_with_hess failed");

    match (with_grad, with_hess) {
        (None, None) => {}
        (Some((value_g, grad)), Some((value_h, grad_h, hess))) => {
            assert!(
                is_close(value_h, value_g, 1e-10),
                "{}: values differ: {} != {}",
                name,
                value_h,
                value_g
            );
            assert_matrix_close(&grad_h, &grad, 1e-10, &format!("{} gradients", name));

            for i in 0..M::DIM {
                let block = hess.block(i, i);
                assert_matrix_close(
                    &block,
                    &block.transposed(),
                    1e-10,
                    &format!("{} diagonal block {} symmetry", name, i),
                );
            }

            let numeric = numeric::hessian(metric, a, w)
                .expect("numeric hessian failed")
                .expect("metric is not defined around the point");
            assert_hessian_close(
                &hess,
                &numeric,
                DERIVATIVE_TOLERANCE,
                &format!("{} hessian at A = {:?}, W = {:?}", name, a, w),
            );
        }
        _ => panic!("{}: evaluate_with_grad and evaluate_with_hess disagree on validity", name),
    }
}

/// Checks closed-form derivatives on the fixture pairs and a few random
/// pairs.
pub fn assert_derivatives<M, T>(metric: &T, inverted: bool)
where
    M: Fixtures,
    T: TargetMetric<M> + ?Sized,
{
    let pairs = fixture_pairs::<M>(inverted)
        .into_iter()
        .chain(random_pairs::<M>(10, 42));

    for (a, w) in pairs {
        assert_gradient_consistent(metric, &a, &w);
        assert_hessian_consistent(metric, &a, &w);
    }
}

/// Asserts that the metric is not defined for the inverted fixture.
pub fn assert_barrier<M, T>(metric: &T)
where
    M: Fixtures,
    T: TargetMetric<M> + ?Sized,
{
    let a = M::sample_c();
    let w = M::one();
    let name = metric.name();

    assert!(
        metric.evaluate(&a, &w).expect("evaluate failed").is_none(),
        "{} is defined for inverted element",
        name
    );
    assert!(metric
        .evaluate_with_grad(&a, &w)
        .expect("evaluate_with_grad failed")
        .is_none());
    assert!(metric
        .evaluate_with_hess(&a, &w)
        .expect("evaluate_with_hess failed")
        .is_none());
}

/// Asserts that every evaluation of the metric at `(a, w)` is either out of
/// domain or finite.
pub fn assert_finite_or_invalid<M, T>(metric: &T, a: &M, w: &M)
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    let name = metric.name();

    if let Some(value) = metric.evaluate(a, w).expect("evaluate failed") {
        assert!(value.is_finite(), "{}: value = {} at {:?}", name, value, a);
    }

    if let Some((value, grad)) = metric.evaluate_with_grad(a, w).expect("evaluate_with_grad failed") {
        assert!(value.is_finite(), "{}: value = {} at {:?}", name, value, a);
        assert!(grad.is_finite(), "{}: gradient = {:?} at {:?}", name, grad, a);
    }

    if let Some((value, grad, hess)) = metric.evaluate_with_hess(a, w).expect("evaluate_with_hess failed") {
        assert!(value.is_finite(), "{}: value = {} at {:?}", name, value, a);
        assert!(grad.is_finite(), "{}: gradient = {:?} at {:?}", name, grad, a);
        assert!(
            hess.blocks().iter().all(|block| block.is_finite()),
            "{}: non-finite hessian at {:?}",
            name,
            a
        );
    }
}

/// Asserts that the metric value and gradient vanish at the ideal element,
/// also for a target matrix different from identity.
pub fn assert_ideal<M, T>(metric: &T)
where
    M: Fixtures,
    T: TargetMetric<M> + ?Sized,
{
    let name = metric.name();
    for w in [M::one(), M::sample_a(), M::sample_b()] {
        let (value, grad) = metric
            .evaluate_with_grad(&w, &w)
            .expect("evaluate_with_grad failed")
            .expect("metric is not defined at the ideal element");
        assert!(value.abs() < 1e-8, "{}: value at ideal = {}", name, value);
        assert!(
            max_abs(&grad) < 1e-6,
            "{}: gradient at ideal = {:?}",
            name,
            grad
        );
    }
}
