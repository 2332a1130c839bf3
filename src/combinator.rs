//! Metrics composed of other metrics.
//!
//! * [`Sum`]: `mu1 + mu2`
//! * [`Squared`]: `mu²`
//! * [`Offset`]: `mu + alpha`
//! * [`Scale`]: `alpha · mu`
//! * [`InverseTranspose`]: `mu` evaluated for `T⁻ᵀ`, turning any metric into a
//!   barrier
//!
//! A combinator is not defined (returns `Ok(None)`) whenever any of its
//! children is not defined, and child errors are propagated unchanged.
//!
//! ```rust
//! use tmetric::nalgebra::Matrix2;
//! use tmetric::combinator::{Squared, Sum};
//! use tmetric::metric::{Shape, Size};
//! use tmetric::TargetMetric;
//!
//! let metric = Squared::new(Sum::new(Shape, Size));
//! assert_eq!(TargetMetric::<Matrix2<f64>>::name(&metric), "sqr(Shape+Size)");
//!
//! let a = Matrix2::new(1.0, 2.0, 2.0, 5.0);
//! let w = Matrix2::<f64>::identity();
//! let (value, _grad, _hess) = metric.evaluate_with_hess(&a, &w).unwrap().unwrap();
//! assert!((value - 32.0 * 32.0).abs() < 1e-9);
//! ```

mod inverse_transpose;
mod offset;
mod scale;
mod squared;
mod sum;

pub use inverse_transpose::*;
pub use offset::*;
pub use scale::*;
pub use squared::*;
pub use sum::*;
