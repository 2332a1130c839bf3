//! Barrier metrics.
//!
//! These metrics go to infinity as the element degenerates and are not
//! defined for inverted elements, that is when
//! [`invalid_determinant`](crate::invalid_determinant) holds for `det(T)`. In
//! such case all evaluation methods return `Ok(None)`.
//!
//! Most of them are products `u(T) · v(det T)`, whose derivatives are
//! assembled by the product rule
//!
//! ```text
//! ∇(uv)  = v ∇u + u ∇v
//! ∇²(uv) = v ∇²u + u ∇²v + ∇u ⊗ ∇v + ∇v ⊗ ∇u
//! ```

use crate::core::{FixedMatrix, Hessian, MetricError, TargetFrame, TargetMetric};
use crate::derivatives::{
    add_det_function_hessian, add_scaled_identity, add_scaled_outer_product,
    add_scaled_sqr_frobenius_adj_hessian, add_scaled_sum_outer_product,
    add_scaled_trace_adj_hessian, det_function_grad,
};

use super::{dim, norm_power_of_identity, NormPower};

/// `tau^e` with its first and second derivative.
fn power(tau: f64, e: f64) -> (f64, f64, f64) {
    (
        tau.powf(e),
        e * tau.powf(e - 1.0),
        e * (e - 1.0) * tau.powf(e - 2.0),
    )
}

/// Shape barrier metric `|T|^n / (n^(n/2) det(T)) − 1`.
///
/// In 2D this is `|T|² / (2 det(T)) − 1`, in 3D `|T|³ / (3√3 det(T)) − 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeBarrier;

impl<M: FixedMatrix> TargetMetric<M> for ShapeBarrier {
    fn name(&self) -> String {
        "ShapeBarrier".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let c = norm_power_of_identity::<M>();
            NormPower::new(frame.t()).value() / (c * frame.tau()) - 1.0
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let c = norm_power_of_identity::<M>();
            let np = NormPower::new(t);

            let u = np.value();
            let v = 1.0 / (c * tau);
            let v1 = -v / tau;

            let grad = np.grad(t) * v + det_function_grad(t, u * v1);
            (u * v - 1.0, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.and_then(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let c = norm_power_of_identity::<M>();
            let np = NormPower::new(t);

            let u = np.value();
            let gu = np.grad(t);
            let v = 1.0 / (c * tau);
            let v1 = -v / tau;
            let v2 = -2.0 * v1 / tau;
            let gv = det_function_grad(t, v1);

            let grad = gu * v + gv * u;

            let mut hess = Hessian::zeros();
            if !np.add_hessian(&mut hess, v, t) {
                return None;
            }
            add_det_function_hessian(&mut hess, t, u * v1, u * v2);
            add_scaled_sum_outer_product(&mut hess, 1.0, &gu, &gv);

            Some(frame.finish(u * v - 1.0, grad, hess))
        }))
    }
}

/// Shape and orientation barrier metric `(|T| − tr(T) / √n) / det(T)^(1/n)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeOrientBarrier;

impl<M: FixedMatrix> TargetMetric<M> for ShapeOrientBarrier {
    fn name(&self) -> String {
        "ShapeOrientBarrier".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let t = frame.t();
            let n = dim::<M>();
            let u = t.frobenius() - t.trace() / n.sqrt();
            u * frame.tau().powf(-1.0 / n)
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let n = dim::<M>();
            let norm = t.frobenius();

            let u = norm - t.trace() / n.sqrt();
            let gu = *t / norm - M::one() / n.sqrt();
            let (v, v1, _) = power(tau, -1.0 / n);

            let grad = gu * v + det_function_grad(t, u * v1);
            (u * v, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let n = dim::<M>();
            let norm = t.frobenius();

            let u = norm - t.trace() / n.sqrt();
            let gu = *t / norm - M::one() / n.sqrt();
            let (v, v1, v2) = power(tau, -1.0 / n);
            let gv = det_function_grad(t, v1);

            let grad = gu * v + gv * u;

            let mut hess = Hessian::zeros();
            add_scaled_identity(&mut hess, v / norm);
            add_scaled_outer_product(&mut hess, -v / (norm * norm * norm), t);
            add_det_function_hessian(&mut hess, t, u * v1, u * v2);
            add_scaled_sum_outer_product(&mut hess, 1.0, &gu, &gv);

            frame.finish(u * v, grad, hess)
        }))
    }
}

/// Shape and size barrier metric `|T − T⁻ᵀ|²`.
///
/// Computed as `|T|² + |adj T|² / det(T)² − 2n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeSizeBarrier;

impl<M: FixedMatrix> TargetMetric<M> for ShapeSizeBarrier {
    fn name(&self) -> String {
        "ShapeSizeBarrier".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let q = t.adj().sqr_frobenius();
            t.sqr_frobenius() + q / (tau * tau) - 2.0 * dim::<M>()
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let q = t.adj().sqr_frobenius();
            let (v, v1, _) = power(tau, -2.0);

            let value = t.sqr_frobenius() + q * v - 2.0 * dim::<M>();
            let grad = *t * 2.0 + t.sqr_frobenius_adj_grad() * v + det_function_grad(t, q * v1);
            (value, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let q = t.adj().sqr_frobenius();
            let gq = t.sqr_frobenius_adj_grad();
            let (v, v1, v2) = power(tau, -2.0);
            let gv = det_function_grad(t, v1);

            let value = t.sqr_frobenius() + q * v - 2.0 * dim::<M>();
            let grad = *t * 2.0 + gq * v + gv * q;

            let mut hess = Hessian::zeros();
            add_scaled_identity(&mut hess, 2.0);
            add_scaled_sqr_frobenius_adj_hessian(&mut hess, v, t);
            add_det_function_hessian(&mut hess, t, q * v1, q * v2);
            add_scaled_sum_outer_product(&mut hess, 1.0, &gq, &gv);

            frame.finish(value, grad, hess)
        }))
    }
}

/// Shape, size and orientation barrier metric `|T⁻¹ − I|²`.
///
/// Computed as `|adj T|² / det(T)² − 2 tr(adj T) / det(T) + n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShapeSizeOrientBarrier;

impl<M: FixedMatrix> TargetMetric<M> for ShapeSizeOrientBarrier {
    fn name(&self) -> String {
        "ShapeSizeOrientBarrier".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let adj = t.adj();
            adj.sqr_frobenius() / (tau * tau) - 2.0 * adj.trace() / tau + dim::<M>()
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let adj = t.adj();
            let (q, p) = (adj.sqr_frobenius(), adj.trace());
            let (v, v1, _) = power(tau, -2.0);
            let (u, u1, _) = power(tau, -1.0);

            let value = q * v - 2.0 * p * u + dim::<M>();
            let grad = t.sqr_frobenius_adj_grad() * v + det_function_grad(t, q * v1)
                - (t.trace_adj_grad() * u + det_function_grad(t, p * u1)) * 2.0;
            (value, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let adj = t.adj();
            let (q, p) = (adj.sqr_frobenius(), adj.trace());
            let gq = t.sqr_frobenius_adj_grad();
            let gp = t.trace_adj_grad();
            let (v, v1, v2) = power(tau, -2.0);
            let (u, u1, u2) = power(tau, -1.0);
            let gv = det_function_grad(t, v1);
            let gu = det_function_grad(t, u1);

            let value = q * v - 2.0 * p * u + dim::<M>();
            let grad = gq * v + gv * q - (gp * u + gu * p) * 2.0;

            let mut hess = Hessian::zeros();
            // |adj T|² / det(T)²
            add_scaled_sqr_frobenius_adj_hessian(&mut hess, v, t);
            add_det_function_hessian(&mut hess, t, q * v1, q * v2);
            add_scaled_sum_outer_product(&mut hess, 1.0, &gq, &gv);
            // -2 tr(adj T) / det(T)
            add_scaled_trace_adj_hessian(&mut hess, -2.0 * u, t);
            add_det_function_hessian(&mut hess, t, -2.0 * p * u1, -2.0 * p * u2);
            add_scaled_sum_outer_product(&mut hess, -2.0, &gp, &gu);

            frame.finish(value, grad, hess)
        }))
    }
}

/// Size barrier metric `det(T) + 1 / det(T) − 2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeBarrier;

impl<M: FixedMatrix> TargetMetric<M> for SizeBarrier {
    fn name(&self) -> String {
        "SizeBarrier".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let tau = frame.tau();
            tau + 1.0 / tau - 2.0
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let tau = frame.tau();
            let grad = det_function_grad(frame.t(), 1.0 - 1.0 / (tau * tau));
            (tau + 1.0 / tau - 2.0, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let d1 = 1.0 - 1.0 / (tau * tau);
            let d2 = 2.0 / (tau * tau * tau);

            let mut hess = Hessian::zeros();
            add_det_function_hessian(&mut hess, t, d1, d2);
            frame.finish(tau + 1.0 / tau - 2.0, det_function_grad(t, d1), hess)
        }))
    }
}

/// Inverse mean ratio `|T|² / (n det(T)^(2/n)) − 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InverseMeanRatio;

impl<M: FixedMatrix> TargetMetric<M> for InverseMeanRatio {
    fn name(&self) -> String {
        "InverseMeanRatio".to_string()
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let n = dim::<M>();
            frame.t().sqr_frobenius() / (n * frame.tau().powf(2.0 / n)) - 1.0
        }))
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let n = dim::<M>();
            let s = t.sqr_frobenius();
            let (v, v1, _) = power(tau, -2.0 / n);
            let (v, v1) = (v / n, v1 / n);

            let grad = *t * (2.0 * v) + det_function_grad(t, s * v1);
            (s * v - 1.0, frame.grad_wrt_a(&grad))
        }))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?.map(|frame| {
            let (t, tau) = (frame.t(), frame.tau());
            let n = dim::<M>();
            let s = t.sqr_frobenius();
            let (v, v1, v2) = power(tau, -2.0 / n);
            let (v, v1, v2) = (v / n, v1 / n, v2 / n);
            let gs = *t * 2.0;
            let gv = det_function_grad(t, v1);

            let grad = gs * v + gv * s;

            let mut hess = Hessian::zeros();
            add_scaled_identity(&mut hess, 2.0 * v);
            add_det_function_hessian(&mut hess, t, s * v1, s * v2);
            add_scaled_sum_outer_product(&mut hess, 1.0, &gs, &gv);

            frame.finish(s * v - 1.0, grad, hess)
        }))
    }
}
