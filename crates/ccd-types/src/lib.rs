//! Core types for continuous collision detection.
//!
//! This crate provides the data structures shared by the CCD pipeline:
//!
//! - [`Pose`] - position + rotation of a rigid body (2D angle or 3D
//!   axis-angle)
//! - [`RigidBody`] / [`RigidBodyAssembler`] - body geometry in its local
//!   frame and the read-only scene snapshot that concatenates bodies into
//!   global vertex/edge/face index spaces
//! - Broad-phase candidate pairs and narrow-phase impact records
//! - [`ConstraintConfig`] / [`NewtonConfig`] - settings deserialized from
//!   scene JSON
//! - [`CcdError`] - the error enum for the computation crates
//!
//! These types are pure data plus cheap geometric accessors; the broad
//! phase, root finding, and solvers live in the computation crates. The
//! assembler is the sole owner of its bodies - everything else refers to
//! bodies, vertices, edges, and faces by index.
//!
//! Scenes are either entirely 2D or entirely 3D; the assembler rejects
//! mixtures at construction.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,      // usize to f64 is fine for counts
    clippy::missing_errors_doc,
)]

mod body;
mod candidate;
mod config;
mod error;
mod pose;

pub use body::{RigidBody, RigidBodyAssembler};
pub use candidate::{
    Candidates, EdgeEdgeCandidate, EdgeEdgeImpact, EdgeFaceCandidate, EdgeVertexCandidate,
    EdgeVertexImpact, FaceVertexCandidate,
};
pub use config::{ConstraintConfig, NewtonConfig};
pub use error::CcdError;
pub use pose::{degrees_to_radians, radians_to_degrees, Pose};

/// Result type for CCD operations.
pub type Result<T> = std::result::Result<T, CcdError>;
