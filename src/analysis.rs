//! Various analyses of metric properties.
//!
//! [`sensitivity`] classifies a metric by probing it with elements that differ
//! from the ideal one only in shape, size or orientation and with an inverted
//! element. This is useful for checking that a metric composed of
//! [combinators](crate::combinator) penalizes what it is expected to.
//!
//! ```rust
//! use tmetric::analysis::sensitivity;
//! use tmetric::metric::ShapeSizeBarrier;
//! use tmetric::nalgebra::Matrix2;
//!
//! let result = sensitivity::<Matrix2<f64>, _>(&ShapeSizeBarrier).unwrap();
//! assert!(result.shape());
//! assert!(result.size());
//! assert!(!result.orientation());
//! assert!(result.barrier());
//! ```

use getset::{CopyGetters, Setters};
use log::debug;
use thiserror::Error;

use crate::core::{FixedMatrix, MetricError, TargetMetric};

/// Error returned from [`sensitivity`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Error that occurred when evaluating the metric.
    #[error("{0}")]
    Metric(#[from] MetricError),
    /// The metric is not defined at the ideal element, so there is nothing to
    /// compare the probes with.
    #[error("metric {metric} is not defined at the ideal element")]
    UndefinedIdeal {
        /// Name of the metric.
        metric: String,
    },
}

/// Options for [`sensitivity_with`].
#[derive(Debug, Clone, CopyGetters, Setters)]
#[getset(get_copy = "pub", set = "pub")]
pub struct SensitivityOptions {
    /// Relative tolerance under which a change of the value is considered to
    /// be zero. Default: `1e-6`.
    tolerance: f64,
}

impl Default for SensitivityOptions {
    fn default() -> Self {
        Self { tolerance: 1e-6 }
    }
}

/// Result of the sensitivity analysis.
#[derive(Debug, Clone, Copy, PartialEq, CopyGetters)]
#[getset(get_copy = "pub")]
pub struct Sensitivity {
    /// Value at the ideal element.
    ideal: f64,
    /// The value changes for an element of different shape.
    shape: bool,
    /// The value changes for an element of different size.
    size: bool,
    /// The value changes for a rotated element.
    orientation: bool,
    /// The metric is not defined for an inverted element.
    barrier: bool,
}

/// Shear with unit determinant.
fn shear<M: FixedMatrix>() -> M {
    let (a, b) = (2.0 / 3f64.sqrt(), 1.0 / 3f64.sqrt());
    M::from_fn(|i, j| match (i, j) {
        (0, 0) | (1, 1) => a,
        (0, 1) | (1, 0) => b,
        _ if i == j => 1.0,
        _ => 0.0,
    })
}

fn scaled<M: FixedMatrix>() -> M {
    M::one() * 2.0
}

/// Rotation by 90 degrees in the plane of the first two axes.
fn rotation<M: FixedMatrix>() -> M {
    M::from_fn(|i, j| match (i, j) {
        (0, 1) => -1.0,
        (1, 0) => 1.0,
        _ if i == j && i >= 2 => 1.0,
        _ => 0.0,
    })
}

fn reflection<M: FixedMatrix>() -> M {
    M::from_fn(|i, j| {
        if i != j {
            0.0
        } else if i == M::DIM - 1 {
            -1.0
        } else {
            1.0
        }
    })
}

/// Analyzes the sensitivity of the metric with default options and identity
/// target. See [`sensitivity_with`] for details.
pub fn sensitivity<M, T>(metric: &T) -> Result<Sensitivity, AnalysisError>
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    sensitivity_with(metric, &M::one(), &SensitivityOptions::default())
}

/// Analyzes the sensitivity of the metric for target `w`.
///
/// The metric is evaluated for `A = P·W` where `P` is one of the probes:
///
/// * shape: symmetric shear with unit determinant,
/// * size: `2 I`,
/// * orientation: rotation by 90 degrees,
/// * barrier: reflection of the last axis.
///
/// A probe that makes the metric undefined counts as a change of the value.
pub fn sensitivity_with<M, T>(
    metric: &T,
    w: &M,
    options: &SensitivityOptions,
) -> Result<Sensitivity, AnalysisError>
where
    M: FixedMatrix,
    T: TargetMetric<M> + ?Sized,
{
    let ideal = metric
        .evaluate(w, w)?
        .ok_or_else(|| AnalysisError::UndefinedIdeal {
            metric: metric.name(),
        })?;

    let changes = |probe: M| -> Result<bool, AnalysisError> {
        let value = metric.evaluate(&(probe * *w), w)?;
        Ok(match value {
            Some(value) => {
                (value - ideal).abs() > options.tolerance * (1.0 + ideal.abs())
            }
            None => true,
        })
    };

    let result = Sensitivity {
        ideal,
        shape: changes(shear())?,
        size: changes(scaled())?,
        orientation: changes(rotation())?,
        barrier: metric.evaluate(&(reflection::<M>() * *w), w)?.is_none(),
    };

    debug!("sensitivity of {}: {:?}", metric.name(), result);

    Ok(result)
}
