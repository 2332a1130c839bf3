use crate::core::{FixedMatrix, Hessian, MetricError, TargetMetric};

/// Sum of two metrics.
pub struct Sum<M: FixedMatrix> {
    first: Box<dyn TargetMetric<M>>,
    second: Box<dyn TargetMetric<M>>,
}

impl<M: FixedMatrix> Sum<M> {
    /// Initializes the sum of two metrics.
    pub fn new<F, S>(first: F, second: S) -> Self
    where
        F: TargetMetric<M> + 'static,
        S: TargetMetric<M> + 'static,
    {
        Self {
            first: Box::new(first),
            second: Box::new(second),
        }
    }
}

impl<M: FixedMatrix> TargetMetric<M> for Sum<M> {
    fn name(&self) -> String {
        format!("{}+{}", self.first.name(), self.second.name())
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        let first = match self.first.evaluate(a, w)? {
            Some(first) => first,
            None => return Ok(None),
        };

        Ok(self.second.evaluate(a, w)?.map(|second| first + second))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        let (first, grad1) = match self.first.evaluate_with_grad(a, w)? {
            Some(first) => first,
            None => return Ok(None),
        };

        Ok(self
            .second
            .evaluate_with_grad(a, w)?
            .map(|(second, grad2)| (first + second, grad1 + grad2)))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        let (first, grad1, hess1) = match self.first.evaluate_with_hess(a, w)? {
            Some(first) => first,
            None => return Ok(None),
        };

        Ok(self
            .second
            .evaluate_with_hess(a, w)?
            .map(|(second, grad2, hess2)| (first + second, grad1 + grad2, hess1 + hess2)))
    }
}
