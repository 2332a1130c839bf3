//! Untangling metrics.
//!
//! These metrics are exactly zero for elements that are "untangled enough"
//! and grow polynomially as `det(T)` leaves the admissible range. Unlike
//! barrier metrics they are defined for inverted elements, which makes them
//! suitable for pulling inverted elements back to validity.

use getset::CopyGetters;

use crate::core::{FixedMatrix, Hessian, MetricError, TargetFrame, TargetMetric};
use crate::derivatives::{add_det_function_hessian, det_function_grad};

/// Untangle metric `(|d| − d)⁴` with `d = det(T) − gamma`.
///
/// Zero for `det(T) >= gamma`.
#[derive(Debug, Clone, Copy, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Untangle {
    /// Threshold of the determinant below which the element is penalized.
    gamma: f64,
}

impl Untangle {
    /// Initializes the metric with given threshold.
    pub fn new(gamma: f64) -> Self {
        assert!(gamma.is_finite(), "gamma must be finite");
        Self { gamma }
    }

    fn value(&self, tau: f64) -> f64 {
        let d = tau - self.gamma;
        let f = d.abs() - d;
        let f2 = f * f;
        f2 * f2
    }

    // First and second derivative with respect to the determinant.
    fn derivatives(&self, tau: f64) -> (f64, f64) {
        let d = tau - self.gamma;
        if d < 0.0 {
            // (|d| − d)⁴ = 16 d⁴
            (64.0 * d * d * d, 192.0 * d * d)
        } else {
            (0.0, 0.0)
        }
    }
}

impl Default for Untangle {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl<M: FixedMatrix> TargetMetric<M> for Untangle {
    fn name(&self) -> String {
        "Untangle".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| self.value(frame.tau())))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let tau = frame.tau();
            let (d1, _) = self.derivatives(tau);
            let grad = det_function_grad(frame.t(), d1);
            (self.value(tau), frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let (d1, d2) = self.derivatives(tau);

            let mut hess = Hessian::zeros();
            add_det_function_hessian(&mut hess, t, d1, d2);
            frame.finish(self.value(tau), det_function_grad(t, d1), hess)
        }))
    }
}

/// Size untangle metric.
///
/// With `mu = (det(T) − 1)²`, the metric is `4 ((1 − epsilon) − mu)²` when
/// `mu > 1 − epsilon` and zero otherwise.
#[derive(Debug, Clone, Copy, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct SizeUntangle {
    /// Relaxation of the admissible range of the determinant.
    epsilon: f64,
}

impl SizeUntangle {
    /// Initializes the metric with given relaxation.
    pub fn new(epsilon: f64) -> Self {
        assert!(epsilon.is_finite(), "epsilon must be finite");
        Self { epsilon }
    }

    // Value and the first and second derivative with respect to the
    // determinant.
    fn derivatives(&self, tau: f64) -> (f64, f64, f64) {
        let mu = (tau - 1.0) * (tau - 1.0);
        if mu > 1.0 - self.epsilon {
            let d = (1.0 - self.epsilon) - mu;
            (
                4.0 * d * d,
                -16.0 * d * (tau - 1.0),
                32.0 * (tau - 1.0) * (tau - 1.0) - 16.0 * d,
            )
        } else {
            (0.0, 0.0, 0.0)
        }
    }
}

impl Default for SizeUntangle {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl<M: FixedMatrix> TargetMetric<M> for SizeUntangle {
    fn name(&self) -> String {
        "SizeUntangle".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| self.derivatives(frame.tau()).0))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let (value, d1, _) = self.derivatives(frame.tau());
            let grad = det_function_grad(frame.t(), d1);
            (value, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::new(a, w)?.map(|frame| {
            let t = frame.t();
            let (value, d1, d2) = self.derivatives(frame.tau());

            let mut hess = Hessian::zeros();
            add_det_function_hessian(&mut hess, t, d1, d2);
            frame.finish(value, det_function_grad(t, d1), hess)
        }))
    }
}
