//! Metrics of the size of the element.

use crate::core::{FixedMatrix, Hessian, MetricError, TargetFrame, TargetMetric};
use crate::derivatives::{add_det_function_hessian, add_scaled_identity, det_function_grad};

/// Size metric `(det(T) − 1)²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Size;

impl<M: FixedMatrix> TargetMetric<M> for Size {
    fn name(&self) -> String {
        "Size".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let d = frame.tau() - 1.0;
            d * d
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let d = frame.tau() - 1.0;
            let grad = det_function_grad(frame.t(), 2.0 * d);
            (d * d, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let t = frame.t();
            let d = frame.tau() - 1.0;
            let grad = det_function_grad(t, 2.0 * d);
            let mut hess = Hessian::zeros();
            add_det_function_hessian(&mut hess, t, 2.0 * d, 2.0);
            frame.finish(d * d, grad, hess)
        }))
    }
}

/// Squared Frobenius norm of `T`.
///
/// The minimum is not at the ideal element, it is meant to be combined with
/// other metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TSquared;

impl<M: FixedMatrix> TargetMetric<M> for TSquared {
    fn name(&self) -> String {
        "TSquared".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| frame.t().sqr_frobenius()))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let t = frame.t();
            (t.sqr_frobenius(), frame.grad_wrt_a(&(*t * 2.0)))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let t = frame.t();
            let mut hess = Hessian::zeros();
            add_scaled_identity(&mut hess, 2.0);
            frame.finish(t.sqr_frobenius(), *t * 2.0, hess)
        }))
    }
}

/// The determinant of `T`.
///
/// Meant for diagnostics, derivatives are not supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tau;

impl<M: FixedMatrix> TargetMetric<M> for Tau {
    fn name(&self) -> String {
        "Tau".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| frame.tau()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Operation;
    use crate::testing::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix2, Matrix3};

    #[test]
    fn size_derivatives() {
        assert_derivatives::<Matrix2<f64>, _>(&Size, true);
        assert_derivatives::<Matrix3<f64>, _>(&Size, true);
        assert_ideal::<Matrix2<f64>, _>(&Size);
        assert_ideal::<Matrix3<f64>, _>(&Size);
    }

    #[test]
    fn size_ignores_shape() {
        let a = Matrix2::new(1.0, 2.0, 2.0, 5.0);
        let value = Size.evaluate(&a, &Matrix2::<f64>::identity()).unwrap().unwrap();
        assert_abs_diff_eq!(value, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn t_squared_derivatives() {
        assert_derivatives::<Matrix2<f64>, _>(&TSquared, true);
        assert_derivatives::<Matrix3<f64>, _>(&TSquared, true);
    }

    #[test]
    fn t_squared_of_identity() {
        let i = Matrix3::<f64>::identity();
        assert_eq!(TSquared.evaluate(&i, &i).unwrap(), Some(3.0));
    }

    #[test]
    fn tau_value() {
        let a = Matrix3::<f64>::sample_a();
        let w = Matrix3::<f64>::sample_b();
        let value = Tau.evaluate(&a, &w).unwrap().unwrap();
        assert_abs_diff_eq!(value, 4.0 / 2.081, epsilon = 1e-12);

        let c = Matrix2::<f64>::sample_c();
        assert_eq!(Tau.evaluate(&c, &Matrix2::<f64>::identity()).unwrap(), Some(-1.0));
    }

    #[test]
    fn tau_derivatives_unsupported() {
        let i = Matrix2::<f64>::identity();
        assert!(matches!(
            Tau.evaluate_with_grad(&i, &i),
            Err(MetricError::Unsupported {
                operation: Operation::Gradient,
                ..
            })
        ));
        assert!(matches!(
            Tau.evaluate_with_hess(&i, &i),
            Err(MetricError::Unsupported {
                operation: Operation::Hessian,
                ..
            })
        ));
    }
}
