//! Collection of primitive target metrics.
//!
//! All metrics are functions of `T = A·W⁻¹` and are generic over the
//! dimension, so each of them is both a 2D and a 3D metric. Every metric
//! except [`Tau`] provides closed-form gradient and Hessian.
//!
//! * Shape: [`Shape`], [`ShapeOrient`], [`ShapeSize`], [`ShapeSizeOrient`],
//!   [`Orient`]
//! * Size: [`Size`], [`TSquared`], [`Tau`]
//! * Barrier: [`ShapeBarrier`], [`ShapeOrientBarrier`], [`ShapeSizeBarrier`],
//!   [`ShapeSizeOrientBarrier`], [`SizeBarrier`], [`InverseMeanRatio`]
//! * Untangle: [`Untangle`], [`SizeUntangle`]
//!
//! Barrier metrics are not defined for inverted (or nearly degenerate)
//! elements and return `Ok(None)` for them.
//!
//! Metrics with the minimum at the ideal element evaluate to zero for
//! `T = I`:
//!
//! ```rust
//! use tmetric::nalgebra::Matrix3;
//! use tmetric::metric::ShapeSizeOrientBarrier;
//! use tmetric::TargetMetric;
//!
//! let w = Matrix3::new(2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0);
//! let value = ShapeSizeOrientBarrier.evaluate(&w, &w).unwrap().unwrap();
//! assert!(value.abs() < 1e-12);
//!
//! // An inverted element.
//! let a = Matrix3::from_diagonal(&tmetric::nalgebra::Vector3::new(1.0, 1.0, -1.0));
//! assert!(ShapeSizeOrientBarrier.evaluate(&a, &w).unwrap().is_none());
//! ```

mod barrier;
mod shape;
mod size;
mod untangle;

pub use barrier::*;
pub use shape::*;
pub use size::*;
pub use untangle::*;

use crate::core::{FixedMatrix, Hessian};
use crate::derivatives::{add_scaled_identity, add_scaled_outer_product};

/// Dimension as a scalar.
pub(crate) fn dim<M: FixedMatrix>() -> f64 {
    M::DIM as f64
}

/// `n^(n/2)`, the value of `|I|^n`.
pub(crate) fn norm_power_of_identity<M: FixedMatrix>() -> f64 {
    let n = dim::<M>();
    n.powf(n / 2.0)
}

/// `|T|^k` if both the power and its reciprocal are positive and finite.
pub(crate) fn invertible_norm_power(norm: f64, k: i32) -> Option<f64> {
    let power = norm.powi(k);
    if power > 0.0 && power.is_finite() && power.recip().is_finite() {
        Some(power)
    } else {
        None
    }
}

/// `|T|^n` as a function of `s = |T|²` together with its derivatives with
/// respect to `s`.
pub(crate) struct NormPower {
    value: f64,
    d1: f64,
    d2: f64,
}

impl NormPower {
    pub(crate) fn new<M: FixedMatrix>(t: &M) -> Self {
        let s = t.sqr_frobenius();
        let half = dim::<M>() / 2.0;

        let value = s.powf(half);
        let d1 = half * s.powf(half - 1.0);
        // In 2D the function is linear in s and the general formula would give
        // 0 * inf for s = 0.
        let d2 = if M::DIM == 2 {
            0.0
        } else {
            half * (half - 1.0) * s.powf(half - 2.0)
        };

        Self { value, d1, d2 }
    }

    pub(crate) fn value(&self) -> f64 {
        self.value
    }

    pub(crate) fn grad<M: FixedMatrix>(&self, t: &M) -> M {
        *t * (2.0 * self.d1)
    }

    /// `H += alpha * ∂²|T|^n / ∂T²`. Returns `false` if the second derivative
    /// is not defined (`T = 0` in 3D).
    pub(crate) fn add_hessian<M: FixedMatrix>(
        &self,
        hess: &mut Hessian<M>,
        alpha: f64,
        t: &M,
    ) -> bool {
        if !self.d2.is_finite() {
            return false;
        }

        add_scaled_outer_product(hess, 4.0 * alpha * self.d2, t);
        add_scaled_identity(hess, 2.0 * alpha * self.d1);
        true
    }
}
