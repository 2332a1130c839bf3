//! Abstractions for defining target metrics.
//!
//! # Defining a metric
//!
//! A metric is any type that implements [`TargetMetric`]. The only required
//! method is [`evaluate`](TargetMetric::evaluate), derivatives are optional.
//! [`TargetFrame`] takes care of computing `T = A·W⁻¹` and of the chain rule
//! back to the derivatives with respect to `A`.
//!
//! ```rust
//! use tmetric::nalgebra::Matrix2;
//! use tmetric::{FixedMatrix, MetricError, TargetFrame, TargetMetric};
//!
//! // |T|², defined by the user.
//! struct Frobenius;
//!
//! impl<M: FixedMatrix> TargetMetric<M> for Frobenius {
//!     fn name(&self) -> String {
//!         "Frobenius".to_string()
//!     }
//!
//!     fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
//!         let frame = match TargetFrame::new(a, w)? {
//!             Some(frame) => frame,
//!             None => return Ok(None),
//!         };
//!         Ok(Some(frame.t().sqr_frobenius()))
//!     }
//!
//!     fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
//!         let frame = match TargetFrame::new(a, w)? {
//!             Some(frame) => frame,
//!             None => return Ok(None),
//!         };
//!         let t = frame.t();
//!         Ok(Some((t.sqr_frobenius(), frame.grad_wrt_a(&(*t * 2.0)))))
//!     }
//! }
//!
//! let a = Matrix2::new(1.0, 2.0, 2.0, 5.0);
//! let w = Matrix2::<f64>::identity();
//! assert_eq!(Frobenius.evaluate(&a, &w).unwrap(), Some(34.0));
//! // Hessian is not implemented by the metric.
//! assert!(Frobenius.evaluate_with_hess(&a, &w).is_err());
//! ```

use log::debug;

use super::base::{invalid_determinant, is_singular, MetricError, Operation};
use super::matrix::{FixedMatrix, Hessian};
use crate::derivatives::{grad_wrt_product_factor, second_deriv_wrt_product_factor};

/// The trait for defining target metrics.
///
/// A target metric is a scalar function of the sample matrix `A` (the
/// Jacobian of the current element) and the target matrix `W` (the Jacobian
/// of the ideal element). Almost all metrics are functions of `T = A·W⁻¹`
/// only.
///
/// All evaluation methods return
///
/// * `Ok(Some(..))` when the metric is defined for the given pair,
/// * `Ok(None)` when the pair is outside of the domain of the metric (e.g.,
///   singular `W` or inverted element for barrier metrics); an optimizer is
///   expected to treat such configuration as infeasible,
/// * `Err(..)` for errors that are not related to the element, such as an
///   operation not supported by the metric.
///
/// Gradients and Hessians are taken with respect to `A`. See [`Hessian`] for
/// the layout of the second derivatives.
pub trait TargetMetric<M: FixedMatrix>: Send + Sync {
    /// Name of the metric used for diagnostics.
    fn name(&self) -> String;

    /// Evaluates the metric.
    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError>;

    /// Evaluates the metric and its gradient.
    ///
    /// Not supported unless overridden.
    fn evaluate_with_grad(&self, _a: &M, _w: &M) -> Result<Option<(f64, M)>, MetricError> {
        Err(unsupported(self.name(), Operation::Gradient))
    }

    /// Evaluates the metric, its gradient and Hessian.
    ///
    /// Not supported unless overridden.
    fn evaluate_with_hess(
        &self,
        _a: &M,
        _w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        Err(unsupported(self.name(), Operation::Hessian))
    }
}

pub(crate) fn unsupported(metric: String, operation: Operation) -> MetricError {
    debug!("{} requested from metric {} which does not support it", operation, metric);
    MetricError::Unsupported { metric, operation }
}

/// The matrices shared by evaluations of metrics of `T = A·W⁻¹`.
#[derive(Debug, Clone, Copy)]
pub struct TargetFrame<M: FixedMatrix> {
    winv: M,
    t: M,
    tau: f64,
}

impl<M: FixedMatrix> TargetFrame<M> {
    /// Computes `T` for given sample and target matrices.
    ///
    /// Returns `Ok(None)` if `W` is singular or `T` is too large for its
    /// powers up to `|T|^(2n)` to be represented, and an error if any of the
    /// matrices contains an invalid value.
    pub fn new(a: &M, w: &M) -> Result<Option<Self>, MetricError> {
        if !a.is_finite() || !w.is_finite() {
            return Err(MetricError::InvalidValue);
        }

        if is_singular(w) {
            debug!("target matrix is singular: {:?}", w);
            return Ok(None);
        }

        let winv = w.inverse();
        let t = *a * winv;
        let tau = t.det();

        if !tau.is_finite() || !t.sqr_frobenius().powi(M::DIM as i32).is_finite() {
            debug!("target frame out of range: {:?}", t);
            return Ok(None);
        }

        Ok(Some(Self { winv, t, tau }))
    }

    /// Same as [`new`](TargetFrame::new), but additionally returns `Ok(None)`
    /// if the determinant of `T` is not valid for a barrier metric (see
    /// [`invalid_determinant`]).
    pub fn barrier(a: &M, w: &M) -> Result<Option<Self>, MetricError> {
        Ok(Self::new(a, w)?.filter(|frame| {
            if invalid_determinant(frame.tau) {
                debug!("invalid determinant of the target frame: {}", frame.tau);
                false
            } else {
                true
            }
        }))
    }

    /// `W⁻¹`.
    pub fn winv(&self) -> &M {
        &self.winv
    }

    /// `T = A·W⁻¹`.
    pub fn t(&self) -> &M {
        &self.t
    }

    /// `det(T)`.
    pub fn tau(&self) -> f64 {
        self.tau
    }

    /// Converts a gradient with respect to `T` to the gradient with respect
    /// to `A`.
    pub fn grad_wrt_a(&self, grad: &M) -> M {
        grad_wrt_product_factor(grad, &self.winv)
    }

    /// Converts a Hessian with respect to `T` to the Hessian with respect to
    /// `A` in place.
    pub fn hess_wrt_a(&self, hess: &mut Hessian<M>) {
        second_deriv_wrt_product_factor(hess, &self.winv);
    }

    /// Converts the value with derivatives with respect to `T` to the value
    /// with derivatives with respect to `A`.
    pub fn finish(&self, value: f64, grad: M, mut hess: Hessian<M>) -> (f64, M, Hessian<M>) {
        self.hess_wrt_a(&mut hess);
        (value, self.grad_wrt_a(&grad), hess)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use nalgebra::{Matrix2, Matrix3};

    #[test]
    fn frame_of_identity_target() {
        let a = Matrix2::new(1.0, 2.0, 2.0, 5.0);
        let frame = TargetFrame::new(&a, &Matrix2::<f64>::identity()).unwrap().unwrap();
        assert_abs_diff_eq!(*frame.t(), a, epsilon = 1e-12);
        assert_abs_diff_eq!(frame.tau(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn frame_of_general_target() {
        let a = Matrix3::new(2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0);
        let w = Matrix3::new(1.5, -0.7, -0.8, 0.8, -1.3, -0.7, 0.6, -0.9, -2.0);
        let frame = TargetFrame::new(&a, &w).unwrap().unwrap();
        assert_abs_diff_eq!(*frame.t() * w, a, epsilon = 1e-12);
        assert_abs_diff_eq!(frame.tau(), 4.0 / 2.081, epsilon = 1e-12);
    }

    #[test]
    fn singular_target_is_out_of_domain() {
        let a = Matrix2::<f64>::identity();
        let w = Matrix2::new(1.0, 2.0, 2.0, 4.0);
        assert!(TargetFrame::new(&a, &w).unwrap().is_none());
    }

    #[test]
    fn non_finite_input_is_error() {
        let a = Matrix2::new(1.0, f64::NAN, 0.0, 1.0);
        let w = Matrix2::<f64>::identity();
        assert!(matches!(
            TargetFrame::new(&a, &w),
            Err(MetricError::InvalidValue)
        ));
        assert!(matches!(
            TargetFrame::new(&w, &a),
            Err(MetricError::InvalidValue)
        ));
    }

    #[test]
    fn overflowing_frame_is_out_of_domain() {
        let w = Matrix2::<f64>::identity();
        assert!(TargetFrame::new(&(w * 1e200), &w).unwrap().is_none());
        assert!(TargetFrame::new(&(w * 1e100), &w).unwrap().is_none());
        assert!(TargetFrame::new(&(w * 1e50), &w).unwrap().is_some());

        let w = Matrix3::<f64>::identity();
        assert!(TargetFrame::new(&(w * 1e200), &w).unwrap().is_none());
        assert!(TargetFrame::new(&(w * 1e-110), &w).unwrap().is_some());
    }

    #[test]
    fn barrier_rejects_inverted() {
        let a = Matrix2::new(-1.0, 0.5, 0.0, 1.0);
        let w = Matrix2::<f64>::identity();
        assert!(TargetFrame::new(&a, &w).unwrap().is_some());
        assert!(TargetFrame::barrier(&a, &w).unwrap().is_none());
        assert!(TargetFrame::barrier(&w, &w).unwrap().is_some());
    }

    struct ValueOnly;

    impl TargetMetric<Matrix2<f64>> for ValueOnly {
        fn name(&self) -> String {
            "ValueOnly".to_string()
        }

        fn evaluate(&self, _a: &Matrix2<f64>, _w: &Matrix2<f64>) -> Result<Option<f64>, MetricError> {
            Ok(Some(1.0))
        }
    }

    #[test]
    fn derivatives_unsupported_by_default() {
        let m = Matrix2::<f64>::identity();
        match ValueOnly.evaluate_with_grad(&m, &m) {
            Err(MetricError::Unsupported { metric, operation }) => {
                assert_eq!(metric, "ValueOnly");
                assert_eq!(operation, Operation::Gradient);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            ValueOnly.evaluate_with_hess(&m, &m),
            Err(MetricError::Unsupported {
                operation: Operation::Hessian,
                ..
            })
        ));
    }
}
