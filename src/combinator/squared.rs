use crate::core::{FixedMatrix, Hessian, MetricError, TargetMetric};
use crate::derivatives::add_scaled_outer_product;

/// Square of a metric.
///
/// The Hessian is `2 mu ∇²mu + 2 ∇mu ⊗ ∇mu`.
pub struct Squared<M: FixedMatrix> {
    metric: Box<dyn TargetMetric<M>>,
}

impl<M: FixedMatrix> Squared<M> {
    /// Initializes the square of a metric.
    pub fn new<T>(metric: T) -> Self
    where
        T: TargetMetric<M> + 'static,
    {
        Self {
            metric: Box::new(metric),
        }
    }
}

impl<M: FixedMatrix> TargetMetric<M> for Squared<M> {
    fn name(&self) -> String {
        format!("sqr({})", self.metric.name())
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(self.metric.evaluate(a, w)?.map(|value| value * value))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(self
            .metric
            .evaluate_with_grad(a, w)?
            .map(|(value, grad)| (value * value, grad * (2.0 * value))))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(self
            .metric
            .evaluate_with_hess(a, w)?
            .map(|(value, grad, hess)| {
                let mut hess = hess * (2.0 * value);
                add_scaled_outer_product(&mut hess, 2.0, &grad);
                (value * value, grad * (2.0 * value), hess)
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{ShapeBarrier, ShapeOrient, ShapeSizeOrient};
    use crate::testing::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix2, Matrix3};

    #[test]
    fn squared_derivatives() {
        assert_derivatives::<Matrix2<f64>, _>(&Squared::new(ShapeOrient), true);
        assert_derivatives::<Matrix3<f64>, _>(&Squared::new(ShapeOrient), true);
        assert_derivatives::<Matrix2<f64>, _>(&Squared::new(ShapeBarrier), false);
        assert_derivatives::<Matrix3<f64>, _>(&Squared::new(ShapeBarrier), false);
    }

    #[test]
    fn squared_value() {
        let metric = Squared::new(ShapeSizeOrient);
        let a = Matrix2::<f64>::sample_a();
        let w = Matrix2::<f64>::identity();
        let value = metric.evaluate(&a, &w).unwrap().unwrap();
        assert_abs_diff_eq!(value, 24.0 * 24.0, epsilon = 1e-9);
        assert_eq!(TargetMetric::<Matrix2<f64>>::name(&metric), "sqr(ShapeSizeOrient)");
    }

    #[test]
    fn squared_barrier_stays_barrier() {
        assert_barrier::<Matrix2<f64>, _>(&Squared::new(ShapeBarrier));
        assert_barrier::<Matrix3<f64>, _>(&Squared::new(ShapeBarrier));
    }
}
