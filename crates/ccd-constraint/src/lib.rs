//! Collision constraints and the barrier-guarded Newton solver.
//!
//! Detected contacts become constraints a Newton-type optimizer can
//! consume:
//!
//! - [`DistanceBarrierConstraint`] - a smooth barrier on point-to-edge
//!   distance that diverges as the distance reaches zero, keeping the
//!   optimizer penetration-free.
//! - [`VolumeConstraint`] - a swept-volume measure of each edge's first
//!   impact, one row per edge per side of the impact.
//! - [`NewtonSolver`] - free-DoF Newton iteration with a
//!   positive-definite projection fallback and a collision-aware line
//!   search.
//!
//! Both constraints implement [`CollisionConstraint`], the capability set
//! the solver dispatches through. Gradients and Hessians of the constraint
//! potentials come from forward-mode automatic differentiation
//! ([`num_dual`]) over a fixed, per-call variable count: the potentials are
//! written generically over `D: DualNum<f64>` and evaluated with plain
//! `f64` for values, dual vectors for derivatives.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
)]

mod barrier;
mod constraint;
mod distance;
mod line_search;
mod newton;
mod problem;
mod volume;

pub use barrier::{distance_barrier, DistanceBarrierConstraint};
pub use constraint::CollisionConstraint;
pub use distance::point_to_edge_sq_distance;
pub use line_search::line_search;
pub use newton::{
    init_free_dof, make_matrix_positive_definite, project_to_psd, NewtonSolver, NewtonStats,
};
pub use problem::{OptimizationProblem, OptimizationResults};
pub use volume::{
    collision_volume, get_constraint_index, get_constraints_size, VolumeConstraint,
};
