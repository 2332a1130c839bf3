#![allow(clippy::many_single_char_names)]
#![allow(clippy::type_complexity)]
#![warn(missing_docs)]

//! # Tmetric
//!
//! A pure Rust implementation of target-matrix quality metrics for mesh
//! optimization.
//!
//! A target metric measures how much a mapping of a mesh element deviates from
//! its ideal. It is a function `mu(T)` of the matrix `T = A·W⁻¹`, where `A` is
//! the Jacobian of the element at a sample point (the active matrix) and `W` is
//! the Jacobian of the ideal element (the target matrix). Metrics are
//! implemented for 2x2 and 3x3 matrices and each of them provides its value,
//! gradient and Hessian with respect to `A`, which is what a mesh optimizer
//! needs to move the vertices.
//!
//! ## Metrics
//!
//! * [Shape](metric::Shape) -- Penalizes the distortion of the shape while
//!   being indifferent to size and orientation.
//! * [Shape-size-orient](metric::ShapeSizeOrient) -- Distance to the target in
//!   all three aspects.
//! * [Barrier metrics](metric::ShapeBarrier) -- Not defined for inverted
//!   elements, they keep a valid mesh valid.
//! * [Untangle metrics](metric::Untangle) -- Defined for inverted elements,
//!   they push them back to validity.
//!
//! The primitive metrics can be composed with [combinators](combinator), for
//! example the square of a sum of two metrics.
//!
//! ## Evaluation
//!
//! All metrics implement the [`TargetMetric`] trait.
//!
//! ```rust
//! use tmetric::nalgebra::Matrix2;
//! use tmetric::metric::InverseMeanRatio;
//! use tmetric::TargetMetric;
//!
//! // Equilateral triangle as the target.
//! let w = Matrix2::new(1.0, 0.5, 0.0, 3f64.sqrt() / 2.0);
//! // Right triangle as the actual element.
//! let a = Matrix2::new(1.0, 0.0, 0.0, 1.0);
//!
//! match InverseMeanRatio.evaluate_with_hess(&a, &w) {
//!     Ok(Some((value, grad, hess))) => {
//!         println!("value = {}", value);
//!         println!("gradient = {}", grad);
//!         println!("hessian block (0, 0) = {}", hess.block(0, 0));
//!     }
//!     Ok(None) => println!("element is inverted"),
//!     Err(error) => panic!("{}", error),
//! }
//! ```
//!
//! An evaluation returns `Ok(None)` if the metric is not defined for the
//! element (for example an inverted element and a barrier metric). This is a
//! regular situation during the optimization, usually handled by shortening
//! the step. An `Err` on the other hand signals a programming error, such as
//! non-finite input or requesting derivatives that the metric does not
//! provide.
//!
//! ## Custom metrics
//!
//! A user-defined metric only needs to implement
//! [`evaluate`](TargetMetric::evaluate). The derivatives can then be
//! approximated by [finite differences](numeric), which is also the way how
//! closed-form derivatives are checked.
//!
//! ```rust
//! use tmetric::nalgebra::Matrix3;
//! use tmetric::{numeric, FixedMatrix, MetricError, TargetFrame, TargetMetric};
//!
//! struct Trace;
//!
//! impl<M: FixedMatrix> TargetMetric<M> for Trace {
//!     fn name(&self) -> String {
//!         "Trace".to_string()
//!     }
//!
//!     fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
//!         Ok(TargetFrame::new(a, w)?.map(|frame| frame.t().trace()))
//!     }
//! }
//!
//! let a = Matrix3::new(2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0);
//! let i = Matrix3::identity();
//! let grad = numeric::gradient(&Trace, &a, &i).unwrap().unwrap();
//! assert!((grad - i).norm() < 1e-8);
//! ```
//!
//! ## License
//!
//! Licensed under MIT.

pub mod analysis;
pub mod combinator;
mod core;
pub mod derivatives;
pub mod metric;
pub mod numeric;

pub use core::*;

#[cfg(feature = "testing")]
pub mod testing;

#[cfg(not(feature = "testing"))]
pub(crate) mod testing;

pub use nalgebra;
