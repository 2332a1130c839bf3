use getset::CopyGetters;

use crate::core::{FixedMatrix, Hessian, MetricError, TargetMetric};

/// Metric multiplied by a constant factor, useful for weighting terms of a
/// [`Sum`](super::Sum).
#[derive(CopyGetters)]
pub struct Scale<M: FixedMatrix> {
    metric: Box<dyn TargetMetric<M>>,
    /// The factor.
    #[getset(get_copy = "pub")]
    alpha: f64,
}

impl<M: FixedMatrix> Scale<M> {
    /// Initializes the metric `alpha · mu`.
    pub fn new<T>(metric: T, alpha: f64) -> Self
    where
        T: TargetMetric<M> + 'static,
    {
        assert!(alpha.is_finite(), "alpha must be finite");
        Self {
            metric: Box::new(metric),
            alpha,
        }
    }
}

impl<M: FixedMatrix> TargetMetric<M> for Scale<M> {
    fn name(&self) -> String {
        format!("{}*{}", self.alpha, self.metric.name())
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(self.metric.evaluate(a, w)?.map(|value| self.alpha * value))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(self
            .metric
            .evaluate_with_grad(a, w)?
            .map(|(value, grad)| (self.alpha * value, grad * self.alpha)))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(self
            .metric
            .evaluate_with_hess(a, w)?
            .map(|(value, grad, hess)| (self.alpha * value, grad * self.alpha, hess * self.alpha)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinator::Sum;
    use crate::metric::{Shape, SizeBarrier};
    use crate::testing::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix2, Matrix3};

    #[test]
    fn scale_derivatives() {
        let metric = Sum::new(Scale::new(Shape, 0.25), Scale::new(SizeBarrier, 4.0));
        assert_derivatives::<Matrix2<f64>, _>(&metric, false);

        let metric = Sum::new(Scale::new(Shape, 0.25), Scale::new(SizeBarrier, 4.0));
        assert_derivatives::<Matrix3<f64>, _>(&metric, false);
    }

    #[test]
    fn scale_value() {
        let metric = Scale::new(Shape, 3.0);
        let a = Matrix2::<f64>::sample_a();
        let value = metric.evaluate(&a, &Matrix2::<f64>::identity()).unwrap().unwrap();
        assert_abs_diff_eq!(value, 3.0 * 32.0, epsilon = 1e-10);
        assert_eq!(metric.alpha(), 3.0);
        assert_eq!(TargetMetric::<Matrix2<f64>>::name(&metric), "3*Shape");
    }

    #[test]
    fn scale_name_in_sum() {
        let metric = Sum::new(Scale::new(Shape, 0.25), Scale::new(SizeBarrier, 4.0));
        assert_eq!(
            TargetMetric::<Matrix3<f64>>::name(&metric),
            "0.25*Shape+4*SizeBarrier"
        );
    }
}
