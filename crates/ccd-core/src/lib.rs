//! Continuous collision detection over rigid-body sweeps.
//!
//! This crate implements the per-step CCD pipeline:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Pipeline                              │
//! │  poses(t0, t1) → broad phase → candidates → earliest TOI     │
//! └──────────────────────────┬───────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │              RigidBodyHashGrid (broad phase)                 │
//! │  screw-motion vertex trajectories → interval AABBs →         │
//! │  uniform cell hash → candidate EV / EE / EF / FV pairs       │
//! └──────────────────────────┬───────────────────────────────────┘
//!                            │
//!                            ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │               TOI kernels (narrow phase)                     │
//! │  interval root finder over (t, parameters) boxes             │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The broad phase conservatively encloses each vertex's swept trajectory in
//! an interval-valued axis-aligned bounding box: translations are
//! interpolated linearly over `t ∈ [0, 1]` and rotations through a screw
//! decomposition, both evaluated in interval arithmetic so the enclosure
//! holds for every instant of the step. The narrow phase isolates the
//! earliest time of impact of each candidate with the interval root finder.
//!
//! Time steppers for advancing body states between CCD queries live in
//! [`stepper`], as a tagged variant selected by scene dimension.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
)]

mod aabb;
mod hash_grid;
mod pipeline;
mod rigid_hash_grid;
mod screw;
pub mod stepper;
mod toi;
mod trajectory;

pub use aabb::Aabb;
pub use hash_grid::{HashGrid, HashItem};
pub use pipeline::{compute_earliest_toi, detect_collision_candidates};
pub use rigid_hash_grid::RigidBodyHashGrid;
pub use screw::{decompose_to_z_screwing, rotate_around_z};
pub use stepper::TimeStepper;
pub use toi::{
    edge_edge_time_of_impact, edge_vertex_time_of_impact, edge_vertex_time_of_impact_linear,
    face_vertex_time_of_impact, DEFAULT_TOI_TOLERANCE,
};
pub use trajectory::{compute_vertex_intervals, BodyTrajectory};
