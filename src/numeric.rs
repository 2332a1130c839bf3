//! Finite difference approximations of metric derivatives.
//!
//! These are meant as an oracle for checking closed-form derivatives and for
//! debugging user-defined metrics, not as a replacement of them. Central
//! differences are used for both the gradient (differencing
//! [`evaluate`](TargetMetric::evaluate)) and the Hessian (differencing
//! [`evaluate_with_grad`](TargetMetric::evaluate_with_grad)).

use getset::{CopyGetters, Setters};
use log::debug;

use crate::core::{FixedMatrix, Hessian, MetricError, TargetMetric};

/// Cubic root of double precision machine epsilon, the usual relative step of
/// central differences.
pub const EPSILON_CBRT: f64 = 0.0000060554544523933395;

/// Options for finite differences.
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct FiniteDifferenceOptions {
    /// Relative step. Default: [`EPSILON_CBRT`].
    step: f64,
    /// Typical magnitude of the entries. Entries smaller than this use the
    /// magnitude for computing the step. Default: `1`.
    magnitude: f64,
}

impl Default for FiniteDifferenceOptions {
    fn default() -> Self {
        Self {
            step: EPSILON_CBRT,
            magnitude: 1.0,
        }
    }
}

impl FiniteDifferenceOptions {
    fn step_for(&self, x: f64) -> f64 {
        // The step is scaled by the entry itself to keep the number of good
        // digits in the difference. For entries close to zero, the typical
        // magnitude is taken instead.
        let step = self.step * x.abs().max(self.magnitude);
        if step == 0.0 {
            self.step
        } else {
            step
        }
    }
}

/// Computes the gradient of the metric with respect to `A` with default
/// options. See [`gradient_with`] for details.
pub fn gradient<M, T>(metric: &T, a: &M, w: &M) -> Result<Option<M>, MetricError>
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    gradient_with(metric, a, w, &FiniteDifferenceOptions::default())
}

/// Computes the gradient of the metric with respect to `A` by central
/// differences of [`evaluate`](TargetMetric::evaluate).
///
/// Returns `Ok(None)` if the metric is not defined in any of the perturbed
/// points.
pub fn gradient_with<M, T>(
    metric: &T,
    a: &M,
    w: &M,
    options: &FiniteDifferenceOptions,
) -> Result<Option<M>, MetricError>
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    let mut grad = M::zero();
    let mut x = *a;

    for i in 0..M::DIM {
        for k in 0..M::DIM {
            let xik = x[(i, k)];
            let step = options.step_for(xik);

            x[(i, k)] = xik + step;
            let plus = metric.evaluate(&x, w)?;
            x[(i, k)] = xik - step;
            let minus = metric.evaluate(&x, w)?;

            // Restore the original value.
            x[(i, k)] = xik;

            match (plus, minus) {
                (Some(plus), Some(minus)) => grad[(i, k)] = (plus - minus) / (2.0 * step),
                _ => {
                    debug!(
                        "metric {} is not defined in the neighborhood of entry ({}, {})",
                        metric.name(),
                        i,
                        k
                    );
                    return Ok(None);
                }
            }
        }
    }

    Ok(Some(grad))
}

/// Computes the Hessian of the metric with respect to `A` with default
/// options. See [`hessian_with`] for details.
pub fn hessian<M, T>(metric: &T, a: &M, w: &M) -> Result<Option<Hessian<M>>, MetricError>
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    hessian_with(metric, a, w, &FiniteDifferenceOptions::default())
}

/// Computes the Hessian of the metric with respect to `A` by central
/// differences of [`evaluate_with_grad`](TargetMetric::evaluate_with_grad).
///
/// The stored blocks are filled from the differences of the gradient, no
/// symmetrization is done. Returns `Ok(None)` if the metric is not defined in
/// any of the perturbed points.
pub fn hessian_with<M, T>(
    metric: &T,
    a: &M,
    w: &M,
    options: &FiniteDifferenceOptions,
) -> Result<Option<Hessian<M>>, MetricError>
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    let mut hess = Hessian::<M>::zeros();
    let mut x = *a;

    for j in 0..M::DIM {
        for l in 0..M::DIM {
            let xjl = x[(j, l)];
            let step = options.step_for(xjl);

            x[(j, l)] = xjl + step;
            let plus = metric.evaluate_with_grad(&x, w)?;
            x[(j, l)] = xjl - step;
            let minus = metric.evaluate_with_grad(&x, w)?;

            x[(j, l)] = xjl;

            let diff = match (plus, minus) {
                (Some((_, plus)), Some((_, minus))) => (plus - minus) / (2.0 * step),
                _ => {
                    debug!(
                        "metric {} is not defined in the neighborhood of entry ({}, {})",
                        metric.name(),
                        j,
                        l
                    );
                    return Ok(None);
                }
            };

            // diff(i, k) = ∂²f / ∂A(i, k) ∂A(j, l), which belongs to block
            // (i, j) at position (k, l).
            for i in 0..=j {
                let block = hess.block_mut(i, j);
                for k in 0..M::DIM {
                    block[(k, l)] = diff[(i, k)];
                }
            }
        }
    }

    Ok(Some(hess))
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::Matrix2;

    // |2A - Aᵀ - W|², a quadratic with a known constant Hessian.
    struct Quadratic;

    impl TargetMetric<Matrix2<f64>> for Quadratic {
        fn name(&self) -> String {
            "Quadratic".to_string()
        }

        fn evaluate(&self, a: &Matrix2<f64>, w: &Matrix2<f64>) -> Result<Option<f64>, MetricError> {
            let d = a * 2.0 - a.transpose() - w;
            Ok(Some(d.norm_squared()))
        }

        fn evaluate_with_grad(
            &self,
            a: &Matrix2<f64>,
            w: &Matrix2<f64>,
        ) -> Result<Option<(f64, Matrix2<f64>)>, MetricError> {
            let d = a * 2.0 - a.transpose() - w;
            Ok(Some((d.norm_squared(), d * 4.0 - d.transpose() * 2.0)))
        }
    }

    #[test]
    fn quadratic_gradient() {
        let a = Matrix2::new(1.0, 2.0, 2.0, 5.0);
        let w = Matrix2::new(-1.0, 0.5, 0.0, 1.0);

        let numeric = gradient(&Quadratic, &a, &w).unwrap().unwrap();
        let (_, analytic) = Quadratic.evaluate_with_grad(&a, &w).unwrap().unwrap();
        assert_abs_diff_eq!(numeric, analytic, epsilon = 1e-6);
    }

    #[test]
    fn quadratic_hessian_blocks() {
        let a = Matrix2::new(1.0, 2.0, 2.0, 5.0);
        let w = Matrix2::<f64>::identity();

        let hess = hessian(&Quadratic, &a, &w).unwrap().unwrap();
        assert_abs_diff_eq!(hess[0], Matrix2::new(2.0, 0.0, 0.0, 10.0), epsilon = 1e-6);
        assert_abs_diff_eq!(hess[1], Matrix2::new(0.0, 0.0, -8.0, 0.0), epsilon = 1e-6);
        assert_abs_diff_eq!(hess[2], Matrix2::new(10.0, 0.0, 0.0, 2.0), epsilon = 1e-6);
    }

    struct Undefined;

    impl TargetMetric<Matrix2<f64>> for Undefined {
        fn name(&self) -> String {
            "Undefined".to_string()
        }

        fn evaluate(&self, a: &Matrix2<f64>, _w: &Matrix2<f64>) -> Result<Option<f64>, MetricError> {
            if a[(0, 0)] > 1.0 {
                Ok(None)
            } else {
                Ok(Some(a[(0, 0)]))
            }
        }
    }

    #[test]
    fn undefined_neighborhood() {
        let w = Matrix2::<f64>::identity();
        assert!(gradient(&Undefined, &w, &w).unwrap().is_none());
        assert!(gradient(&Undefined, &(w * 0.5), &w).unwrap().is_some());
    }

    #[test]
    fn unsupported_gradient_propagates() {
        let w = Matrix2::<f64>::identity();
        assert!(matches!(
            hessian(&Undefined, &w, &w),
            Err(MetricError::Unsupported { .. })
        ));
    }

    #[test]
    fn step_for_small_entries() {
        let options = FiniteDifferenceOptions::default();
        assert_eq!(options.step_for(0.0), EPSILON_CBRT);
        assert_eq!(options.step_for(-4.0), 4.0 * EPSILON_CBRT);

        let mut options = FiniteDifferenceOptions::default();
        options.set_magnitude(0.0);
        assert_eq!(options.step_for(0.0), EPSILON_CBRT);
    }
}
