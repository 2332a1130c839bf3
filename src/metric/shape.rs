//! Non-barrier metrics sensitive to the shape of the element.
//!
//! With `n` being the dimension:
//!
//! * [`Shape`]: `|T|^n − n^(n/2) det(T)` (`|T|² − 2 det(T)` in 2D and
//!   `|T|³ − 3√3 det(T)` in 3D), invariant to size and orientation,
//! * [`ShapeOrient`]: `|T| − tr(T) / √n`, invariant to size,
//! * [`ShapeSize`]: `Shape + (det(T) − 1)²`, invariant to orientation,
//! * [`ShapeSizeOrient`]: `|T − I|²`,
//! * [`Orient`]: `1 − tr(T) / (√n |T|)`, invariant to size.

use crate::core::{FixedMatrix, Hessian, MetricError, TargetFrame, TargetMetric};
use crate::derivatives::{
    add_det_function_hessian, add_scaled_det_hessian, add_scaled_identity,
    add_scaled_outer_product, add_scaled_sum_outer_product, det_function_grad,
};

use super::{dim, invertible_norm_power, norm_power_of_identity, NormPower};

/// Shape metric `|T|^n − n^(n/2) det(T)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Shape;

impl Shape {
    fn value<M: FixedMatrix>(t: &M, tau: f64) -> f64 {
        NormPower::new(t).value() - norm_power_of_identity::<M>() * tau
    }

    fn grad<M: FixedMatrix>(t: &M, tau: f64) -> (f64, M) {
        let c = norm_power_of_identity::<M>();
        let np = NormPower::new(t);
        let value = np.value() - c * tau;
        let grad = np.grad(t) - t.transpose_adj() * c;
        (value, grad)
    }

    fn hess<M: FixedMatrix>(t: &M, tau: f64) -> Option<(f64, M, Hessian<M>)> {
        let c = norm_power_of_identity::<M>();
        let np = NormPower::new(t);
        let value = np.value() - c * tau;
        let grad = np.grad(t) - t.transpose_adj() * c;

        let mut hess = Hessian::zeros();
        if !np.add_hessian(&mut hess, 1.0, t) {
            return None;
        }
        add_scaled_det_hessian(&mut hess, -c, t);

        Some((value, grad, hess))
    }
}

impl<M: FixedMatrix> TargetMetric<M> for Shape {
    fn name(&self) -> String {
        "Shape".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| Self::value(frame.t(), frame.tau())))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let (value, grad) = Self::grad(frame.t(), frame.tau());
            (value, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.and_then(|frame| {
            let (value, grad, hess) = Self::hess(frame.t(), frame.tau())?;
            Some(frame.finish(value, grad, hess))
        }))
    }
}

/// Shape and orientation metric `|T| − tr(T) / √n`.
///
/// The derivatives are not defined for `T = 0` or for `T` so small that the
/// powers of `|T|` they need underflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeOrient;

impl<M: FixedMatrix> TargetMetric<M> for ShapeOrient {
    fn name(&self) -> String {
        "ShapeOrient".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let t = frame.t();
            t.frobenius() - t.trace() / dim::<M>().sqrt()
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.and_then(|frame| {
            let t = frame.t();
            let norm = invertible_norm_power(t.frobenius(), 1)?;

            let sqrt_n = dim::<M>().sqrt();
            let value = norm - t.trace() / sqrt_n;
            let grad = *t / norm - M::one() / sqrt_n;
            Some((value, frame.grad_wrt_a(&grad)))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.and_then(|frame| {
            let t = frame.t();
            let norm = t.frobenius();
            let norm3 = invertible_norm_power(norm, 3)?;

            let sqrt_n = dim::<M>().sqrt();
            let value = norm - t.trace() / sqrt_n;
            let grad = *t / norm - M::one() / sqrt_n;

            let mut hess = Hessian::zeros();
            add_scaled_identity(&mut hess, 1.0 / norm);
            add_scaled_outer_product(&mut hess, -1.0 / norm3, t);

            Some(frame.finish(value, grad, hess))
        }))
    }
}

/// Shape and size metric `Shape + (det(T) − 1)²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeSize;

impl<M: FixedMatrix> TargetMetric<M> for ShapeSize {
    fn name(&self) -> String {
        "ShapeSize".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let tau = frame.tau();
            Shape::value(frame.t(), tau) + (tau - 1.0) * (tau - 1.0)
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let (shape, grad) = Shape::grad(t, tau);
            let value = shape + (tau - 1.0) * (tau - 1.0);
            let grad = grad + det_function_grad(t, 2.0 * (tau - 1.0));
            (value, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.and_then(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let (shape, grad, mut hess) = Shape::hess(t, tau)?;
            let value = shape + (tau - 1.0) * (tau - 1.0);
            let grad = grad + det_function_grad(t, 2.0 * (tau - 1.0));
            add_det_function_hessian(&mut hess, t, 2.0 * (tau - 1.0), 2.0);
            Some(frame.finish(value, grad, hess))
        }))
    }
}

/// Shape, size and orientation metric `|T − I|²`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeSizeOrient;

impl<M: FixedMatrix> TargetMetric<M> for ShapeSizeOrient {
    fn name(&self) -> String {
        "ShapeSizeOrient".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| (*frame.t() - M::one()).sqr_frobenius()))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let d = *frame.t() - M::one();
            (d.sqr_frobenius(), frame.grad_wrt_a(&(d * 2.0)))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let d = *frame.t() - M::one();
            let mut hess = Hessian::zeros();
            add_scaled_identity(&mut hess, 2.0);
            frame.finish(d.sqr_frobenius(), d * 2.0, hess)
        }))
    }
}

/// Orientation metric `1 − tr(T) / (√n |T|)`, the cosine distance between `T`
/// and the identity.
///
/// Not defined for `T = 0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Orient;

impl<M: FixedMatrix> TargetMetric<M> for Orient {
    fn name(&self) -> String {
        "Orient".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.and_then(|frame| {
            let t = frame.t();
            let norm = invertible_norm_power(t.frobenius(), 1)?;
            Some(1.0 - t.trace() / (dim::<M>().sqrt() * norm))
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.and_then(|frame| {
            let t = frame.t();
            let norm = t.frobenius();
            let norm3 = invertible_norm_power(norm, 3)?;

            let sqrt_n = dim::<M>().sqrt();
            let trace = t.trace();
            let value = 1.0 - trace / (sqrt_n * norm);
            let grad = (M::one() / norm - *t * (trace / norm3)) * (-1.0 / sqrt_n);
            Some((value, frame.grad_wrt_a(&grad)))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.and_then(|frame| {
            let t = frame.t();
            let norm = t.frobenius();
            let norm3 = invertible_norm_power(norm, 3)?;
            let norm5 = invertible_norm_power(norm, 5)?;

            let sqrt_n = dim::<M>().sqrt();
            let trace = t.trace();
            let value = 1.0 - trace / (sqrt_n * norm);
            let grad = (M::one() / norm - *t * (trace / norm3)) * (-1.0 / sqrt_n);

            let mut hess = Hessian::zeros();
            add_scaled_sum_outer_product(&mut hess, 1.0 / (sqrt_n * norm3), &M::one(), t);
            add_scaled_identity(&mut hess, trace / (sqrt_n * norm3));
            add_scaled_outer_product(&mut hess, -3.0 * trace / (sqrt_n * norm5), t);

            Some(frame.finish(value, grad, hess))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix2, Matrix3};

    #[test]
    fn shape_derivatives() {
        assert_derivatives::<Matrix2<f64>, _>(&Shape, true);
        assert_derivatives::<Matrix3<f64>, _>(&Shape, true);
    }

    #[test]
    fn shape_ideal() {
        assert_ideal::<Matrix2<f64>, _>(&Shape);
        assert_ideal::<Matrix3<f64>, _>(&Shape);
    }

    #[test]
    fn shape_2d_formula() {
        let a = Matrix2::new(1.0, 2.0, 2.0, 5.0);
        let value = Shape.evaluate(&a, &Matrix2::<f64>::identity()).unwrap().unwrap();
        assert_abs_diff_eq!(value, 34.0 - 2.0, epsilon = 1e-12);
    }

    #[test]
    fn shape_3d_formula() {
        let a = Matrix3::new(2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0);
        let value = Shape.evaluate(&a, &Matrix3::<f64>::identity()).unwrap().unwrap();
        let expected = 18f64.powf(1.5) - 3.0 * 3f64.sqrt() * 4.0;
        assert_abs_diff_eq!(value, expected, epsilon = 1e-10);
    }

    #[test]
    fn shape_3d_hessian_undefined_at_zero() {
        let zero = Matrix3::<f64>::zeros();
        let w = Matrix3::<f64>::identity();
        assert!(Shape.evaluate_with_grad(&zero, &w).unwrap().is_some());
        assert!(Shape.evaluate_with_hess(&zero, &w).unwrap().is_none());
        assert!(Shape
            .evaluate_with_hess(&Matrix2::<f64>::zeros(), &Matrix2::<f64>::identity())
            .unwrap()
            .is_some());
    }

    #[test]
    fn shape_orient_derivatives() {
        assert_derivatives::<Matrix2<f64>, _>(&ShapeOrient, true);
        assert_derivatives::<Matrix3<f64>, _>(&ShapeOrient, true);
        assert_ideal::<Matrix2<f64>, _>(&ShapeOrient);
        assert_ideal::<Matrix3<f64>, _>(&ShapeOrient);
    }

    #[test]
    fn shape_orient_at_zero() {
        let zero = Matrix2::<f64>::zeros();
        let w = Matrix2::<f64>::identity();
        assert_eq!(ShapeOrient.evaluate(&zero, &w).unwrap(), Some(0.0));
        assert!(ShapeOrient.evaluate_with_grad(&zero, &w).unwrap().is_none());
        assert!(ShapeOrient.evaluate_with_hess(&zero, &w).unwrap().is_none());
    }

    #[test]
    fn shape_size_derivatives() {
        assert_derivatives::<Matrix2<f64>, _>(&ShapeSize, true);
        assert_derivatives::<Matrix3<f64>, _>(&ShapeSize, true);
        assert_ideal::<Matrix2<f64>, _>(&ShapeSize);
        assert_ideal::<Matrix3<f64>, _>(&ShapeSize);
    }

    #[test]
    fn shape_size_orient_derivatives() {
        assert_derivatives::<Matrix2<f64>, _>(&ShapeSizeOrient, true);
        assert_derivatives::<Matrix3<f64>, _>(&ShapeSizeOrient, true);
        assert_ideal::<Matrix2<f64>, _>(&ShapeSizeOrient);
        assert_ideal::<Matrix3<f64>, _>(&ShapeSizeOrient);
    }

    #[test]
    fn shape_size_orient_of_identity_target() {
        let i = Matrix2::<f64>::identity();
        assert_eq!(ShapeSizeOrient.evaluate(&i, &i).unwrap(), Some(0.0));

        let a = Matrix2::new(1.0, 2.0, 2.0, 5.0);
        let value = ShapeSizeOrient.evaluate(&a, &i).unwrap().unwrap();
        assert_abs_diff_eq!(value, 24.0, epsilon = 1e-12);
    }

    #[test]
    fn orient_derivatives() {
        assert_derivatives::<Matrix2<f64>, _>(&Orient, true);
        assert_derivatives::<Matrix3<f64>, _>(&Orient, true);
        assert_ideal::<Matrix2<f64>, _>(&Orient);
        assert_ideal::<Matrix3<f64>, _>(&Orient);
    }

    fn check_extreme_scales<M: Fixtures>() {
        let w = M::one();
        for scale in [1e-100, 1e-110, 1e-160, 1e200] {
            let a = M::one() * scale;
            assert_finite_or_invalid(&Shape, &a, &w);
            assert_finite_or_invalid(&ShapeOrient, &a, &w);
            assert_finite_or_invalid(&ShapeSize, &a, &w);
            assert_finite_or_invalid(&ShapeSizeOrient, &a, &w);
            assert_finite_or_invalid(&Orient, &a, &w);
        }
    }

    #[test]
    fn extreme_scales_are_finite_or_invalid() {
        check_extreme_scales::<Matrix2<f64>>();
        check_extreme_scales::<Matrix3<f64>>();

        let w = Matrix2::<f64>::identity();
        let tiny = w * 1e-110;
        assert!(ShapeOrient.evaluate(&tiny, &w).unwrap().is_some());
        assert!(ShapeOrient.evaluate_with_hess(&tiny, &w).unwrap().is_none());
        assert!(Orient.evaluate(&tiny, &w).unwrap().is_some());
        assert!(Orient.evaluate_with_grad(&tiny, &w).unwrap().is_none());

        let huge = w * 1e200;
        assert!(Shape.evaluate(&huge, &w).unwrap().is_none());
        assert!(ShapeSize.evaluate(&huge, &w).unwrap().is_none());
    }

    #[test]
    fn orient_of_rotation() {
        let rotation = Matrix2::new(0.0, -1.0, 1.0, 0.0);
        let value = Orient.evaluate(&rotation, &Matrix2::<f64>::identity()).unwrap().unwrap();
        assert_abs_diff_eq!(value, 1.0, epsilon = 1e-12);
        assert!(Orient
            .evaluate(&Matrix2::<f64>::zeros(), &Matrix2::<f64>::identity())
            .unwrap()
            .is_none());
    }
}
