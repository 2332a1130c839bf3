use std::fmt;

use thiserror::Error;

use super::matrix::FixedMatrix;

/// The smallest determinant of `T = A·W⁻¹` accepted by barrier metrics.
pub const MIN_DETERMINANT: f64 = 1e-12;

/// Returns `true` if the determinant is not finite or not sufficiently
/// positive for a barrier metric to be evaluated.
pub fn invalid_determinant(d: f64) -> bool {
    !(d.is_finite() && d >= MIN_DETERMINANT)
}

/// Returns `true` if the matrix cannot be safely inverted.
///
/// The test is relative to the magnitude of the entries, so uniformly scaled
/// matrices are judged equally.
pub fn is_singular<M: FixedMatrix>(m: &M) -> bool {
    let det = m.det();
    let scale = m.frobenius().powi(M::DIM as i32);
    !det.is_finite() || det.abs() <= MIN_DETERMINANT * scale
}

/// Operation requested from a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Value of the metric.
    Value,
    /// Value and gradient.
    Gradient,
    /// Value, gradient and Hessian.
    Hessian,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Value => write!(f, "value"),
            Operation::Gradient => write!(f, "gradient"),
            Operation::Hessian => write!(f, "hessian"),
        }
    }
}

/// Error encountered while evaluating a metric.
///
/// An element outside of the domain of a metric is *not* an error. It is
/// signaled by `Ok(None)` instead, see [`TargetMetric`](super::TargetMetric).
#[derive(Debug, Error)]
pub enum MetricError {
    /// The metric does not implement the requested operation.
    #[error("{operation} is not supported by metric {metric}")]
    Unsupported {
        /// Name of the metric.
        metric: String,
        /// The requested operation.
        operation: Operation,
    },
    /// An invalid value (NaN, positive or negative infinity) was passed to the
    /// metric.
    #[error("invalid value encountered")]
    InvalidValue,
    /// A custom error specific to the metric.
    #[error("{0}")]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}
