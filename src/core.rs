//! Core abstractions and types for tmetric.
//!
//! *Users* are mainly interested in the [`TargetMetric`] trait and the
//! [`FixedMatrix`] implementations for 2x2 and 3x3 matrices.
//!
//! Metric *developers* are interested in [`TargetFrame`] and [`Hessian`] as
//! well as tools in the [derivatives](crate::derivatives) module.

mod base;
mod matrix;
mod metric;

pub use base::*;
pub use matrix::*;
pub use metric::*;
