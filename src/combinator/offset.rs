use getset::CopyGetters;

use crate::core::{FixedMatrix, Hessian, MetricError, TargetMetric};

/// Metric shifted by a constant.
#[derive(CopyGetters)]
pub struct Offset<M: FixedMatrix> {
    metric: Box<dyn TargetMetric<M>>,
    /// The constant added to the metric.
    #[getset(get_copy = "pub")]
    alpha: f64,
}

impl<M: FixedMatrix> Offset<M> {
    /// Initializes the metric `mu + alpha`.
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

impl<M: FixedMatrix> TargetMetric<M> for Offset<M> {
    fn name(&self) -> String {
        format!("{}+{}", self.metric.name(), self.alpha)
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(self.metric.evaluate(a, w)?.map(|value| value + self.alpha))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(self
            .metric
            .evaluate_with_grad(a, w)?
            .map(|(value, grad)| (value + self.alpha, grad)))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(self
            .metric
            .evaluate_with_hess(a, w)?
            .map(|(value, grad, hess)| (value + self.alpha, grad, hess)))
    }
}
