//! Rounded interval arithmetic and an earliest-root interval root finder.
//!
//! This crate provides the numeric foundation for conservative continuous
//! collision detection:
//!
//! - [`Interval`] - a closed interval over `f64` whose operations round
//!   outward, so the interval image of a function always encloses the true
//!   range of the function over the input interval.
//! - [`interval_root_finder`] - a branch-and-bound search for the earliest
//!   root of an interval-valued function on a box, with domain-validity and
//!   constraint predicates.
//! - [`RoundingGuard`] - a scoped acquirer for the process-wide floating
//!   point rounding state.
//!
//! # Rounding backends
//!
//! Outward rounding is a build-time choice between two cargo features:
//!
//! | feature | algebraic ops | transcendentals |
//! |---------|---------------|-----------------|
//! | `rounding-soft` (default) | nearest + 1 ULP widening | nearest + 1 ULP widening |
//! | `rounding-hard` (x86_64)  | MXCSR directed rounding  | nearest + 1 ULP widening |
//!
//! The hard backend exists because directed rounding of the libm
//! transcendentals is not reliable across hosts; algebraic operations are
//! the hot path and benefit from exact directed rounding. Enabling
//! `rounding-hard` on a non-x86_64 target is a compile error.
//!
//! # Example
//!
//! ```
//! use ccd_interval::Interval;
//!
//! let x = Interval::new(0.0, 1.0);
//! let y = x * x - Interval::point(0.25);
//! assert!(y.zero_in());
//! // Containment: for any v in x, v*v - 0.25 is in y.
//! assert!(y.contains(0.5 * 0.5 - 0.25));
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn, clippy::suboptimal_flops)]

mod interval;
mod root_finder;
mod rounding;

pub use interval::Interval;
pub use root_finder::{interval_root_finder, interval_root_finder_1d};
pub use rounding::RoundingGuard;
