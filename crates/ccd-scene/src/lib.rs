//! Rigid-body scene input.
//!
//! Scenes are JSON documents with a `rigid_bodies` array plus optional
//! constraint and solver settings:
//!
//! ```json
//! {
//!   "rigid_bodies": [
//!     {
//!       "vertices": [[-1.0, 0.0], [1.0, 0.0]],
//!       "edges": [[0, 1]],
//!       "position": [0.0, 0.0],
//!       "is_dof_fixed": [true, true, true]
//!     }
//!   ],
//!   "constraint_settings": { "custom_inital_epsilon": 0.5 },
//!   "solver_settings": { "max_iterations": 200 }
//! }
//! ```
//!
//! Each body takes either a `mesh` path (an OBJ triangle mesh, with edges
//! derived from the faces) or explicit `vertices` / `faces` / `edges`.
//! Rotations and angular velocities are given in degrees and stored in
//! radians. Bodies of mixed dimensions in one scene are rejected; faces on
//! 2D bodies are dropped with a warning.

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
)]

mod error;
mod mesh;
mod scene;

pub use error::SceneError;
pub use mesh::{edges_from_faces, parse_obj, read_obj};
pub use scene::{read_scene, read_scene_str, Scene};
