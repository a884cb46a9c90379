//! Rigid bodies and the scene assembler.

use nalgebra::{DMatrix, DVector, Scalar};
use num_traits::Zero;
use std::ops::{Add, Mul};

use crate::{CcdError, Pose, Result};

/// A rigid body: mesh geometry in the body frame plus its current state.
///
/// Vertices are stored one per row (`num_vertices x dim`); edges and faces
/// index into the body's own vertex rows. Geometry is fixed after
/// construction - only `pose` and `velocity` change over a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    /// Vertex positions in the body frame, one row per vertex.
    pub vertices: DMatrix<f64>,
    /// Edges as pairs of vertex indices.
    pub edges: Vec<[usize; 2]>,
    /// Triangular faces as triples of vertex indices (3D only).
    pub faces: Vec<[usize; 3]>,
    /// Current pose.
    pub pose: Pose,
    /// Current velocity (linear + angular), same layout as a pose.
    pub velocity: Pose,
    /// Mass density.
    pub density: f64,
    /// Which degrees of freedom are held fixed (`ndof` entries).
    pub is_dof_fixed: Vec<bool>,
    /// Whether the faces are consistently oriented.
    pub oriented: bool,
}

impl RigidBody {
    /// Construct a rigid body, validating dimensions and index bounds.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vertices: DMatrix<f64>,
        edges: Vec<[usize; 2]>,
        faces: Vec<[usize; 3]>,
        pose: Pose,
        velocity: Pose,
        density: f64,
        is_dof_fixed: Vec<bool>,
        oriented: bool,
    ) -> Result<Self> {
        let dim = vertices.ncols();
        if dim != 2 && dim != 3 {
            return Err(CcdError::UnsupportedDimension(dim));
        }
        if pose.dim() != dim || velocity.dim() != dim {
            return Err(CcdError::invalid_scene(format!(
                "pose dimension {} does not match vertex dimension {dim}",
                pose.dim()
            )));
        }
        let ndof = Pose::dim_to_ndof(dim);
        if is_dof_fixed.len() != ndof {
            return Err(CcdError::invalid_scene(format!(
                "is_dof_fixed has {} entries, expected {ndof}",
                is_dof_fixed.len()
            )));
        }
        let nv = vertices.nrows();
        if edges.iter().flatten().any(|&v| v >= nv) {
            return Err(CcdError::invalid_scene("edge index out of bounds"));
        }
        if faces.iter().flatten().any(|&v| v >= nv) {
            return Err(CcdError::invalid_scene("face index out of bounds"));
        }
        if !density.is_finite() || density <= 0.0 {
            return Err(CcdError::invalid_scene(format!(
                "density must be positive, got {density}"
            )));
        }
        Ok(Self {
            vertices,
            edges,
            faces,
            pose,
            velocity,
            density,
            is_dof_fixed,
            oriented,
        })
    }

    /// Spatial dimension (2 or 3).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.vertices.ncols()
    }

    /// Number of vertices.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.vertices.nrows()
    }

    /// Degrees of freedom (3 in 2D, 6 in 3D).
    #[must_use]
    pub fn ndof(&self) -> usize {
        Pose::dim_to_ndof(self.dim())
    }

    /// Mean length of the body's edges in the body frame (0 if edgeless).
    #[must_use]
    pub fn average_edge_length(&self) -> f64 {
        if self.edges.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .edges
            .iter()
            .map(|&[a, b]| (self.vertices.row(a) - self.vertices.row(b)).norm())
            .sum();
        total / self.edges.len() as f64
    }

    /// World-frame vertex positions at the given pose.
    #[must_use]
    pub fn world_vertices(&self, pose: &Pose) -> DMatrix<f64> {
        let r = pose.rotation_matrix();
        let dim = self.dim();
        DMatrix::from_fn(self.num_vertices(), dim, |v, i| {
            let mut acc = pose.position[i];
            for j in 0..dim {
                acc += r[(i, j)] * self.vertices[(v, j)];
            }
            acc
        })
    }
}

/// Read-only scene snapshot: bodies concatenated into global index spaces.
///
/// The assembler owns its bodies by value. Global vertex `g` belongs to body
/// `vertex_group_ids[g]`; edges and faces are stored with global vertex
/// indices. Group ids double as the broad phase's collision groups -
/// primitives of the same body never collide with each other.
#[derive(Debug, Clone)]
pub struct RigidBodyAssembler {
    bodies: Vec<RigidBody>,
    dim: usize,
    vertex_offsets: Vec<usize>,
    edge_offsets: Vec<usize>,
    face_offsets: Vec<usize>,
    edges: Vec<[usize; 2]>,
    faces: Vec<[usize; 3]>,
    vertex_group_ids: Vec<usize>,
    average_edge_length: f64,
}

impl RigidBodyAssembler {
    /// Assemble a scene from bodies.
    ///
    /// Fails if the bodies mix dimensions or the scene is empty.
    pub fn from_bodies(bodies: Vec<RigidBody>) -> Result<Self> {
        let Some(first) = bodies.first() else {
            return Err(CcdError::invalid_scene("scene has no rigid bodies"));
        };
        let dim = first.dim();
        if bodies.iter().any(|b| b.dim() != dim) {
            return Err(CcdError::MixedDimensions);
        }

        let mut vertex_offsets = Vec::with_capacity(bodies.len());
        let mut edge_offsets = Vec::with_capacity(bodies.len());
        let mut face_offsets = Vec::with_capacity(bodies.len());
        let mut edges = Vec::new();
        let mut faces = Vec::new();
        let mut vertex_group_ids = Vec::new();
        let mut offset = 0;
        for (group, body) in bodies.iter().enumerate() {
            vertex_offsets.push(offset);
            edge_offsets.push(edges.len());
            face_offsets.push(faces.len());
            edges.extend(body.edges.iter().map(|&[a, b]| [a + offset, b + offset]));
            faces.extend(
                body.faces
                    .iter()
                    .map(|&[a, b, c]| [a + offset, b + offset, c + offset]),
            );
            vertex_group_ids.extend(std::iter::repeat(group).take(body.num_vertices()));
            offset += body.num_vertices();
        }

        let num_edges: usize = bodies.iter().map(|b| b.edges.len()).sum();
        let average_edge_length = if num_edges == 0 {
            0.0
        } else {
            bodies
                .iter()
                .map(|b| b.average_edge_length() * b.edges.len() as f64)
                .sum::<f64>()
                / num_edges as f64
        };

        Ok(Self {
            bodies,
            dim,
            vertex_offsets,
            edge_offsets,
            face_offsets,
            edges,
            faces,
            vertex_group_ids,
            average_edge_length,
        })
    }

    /// Spatial dimension of the scene.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of bodies.
    #[must_use]
    pub fn num_bodies(&self) -> usize {
        self.bodies.len()
    }

    /// Total number of vertices across bodies.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.vertex_group_ids.len()
    }

    /// The bodies, in assembly order.
    #[must_use]
    pub fn bodies(&self) -> &[RigidBody] {
        &self.bodies
    }

    /// Mutable access to the bodies for time stepping. Poses and velocities
    /// may be mutated; geometry must not change after assembly.
    #[must_use]
    pub fn bodies_mut(&mut self) -> &mut [RigidBody] {
        &mut self.bodies
    }

    /// A body by index.
    #[must_use]
    pub fn body(&self, i: usize) -> &RigidBody {
        &self.bodies[i]
    }

    /// Global edges (pairs of global vertex indices).
    #[must_use]
    pub fn edges(&self) -> &[[usize; 2]] {
        &self.edges
    }

    /// Global faces (triples of global vertex indices).
    #[must_use]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Per-vertex collision group (the owning body index).
    #[must_use]
    pub fn vertex_group_ids(&self) -> &[usize] {
        &self.vertex_group_ids
    }

    /// Mean edge length across all bodies (0 for edgeless scenes).
    #[must_use]
    pub fn average_edge_length(&self) -> f64 {
        self.average_edge_length
    }

    /// Map a global vertex index to `(body index, local vertex index)`.
    #[must_use]
    pub fn vertex_body(&self, global: usize) -> (usize, usize) {
        let body = self.vertex_group_ids[global];
        (body, global - self.vertex_offsets[body])
    }

    /// Map a global edge index to `(body index, local edge index)`.
    #[must_use]
    pub fn edge_body(&self, global: usize) -> (usize, usize) {
        let body = self.vertex_group_ids[self.edges[global][0]];
        (body, global - self.edge_offsets[body])
    }

    /// Map a global face index to `(body index, local face index)`.
    #[must_use]
    pub fn face_body(&self, global: usize) -> (usize, usize) {
        let body = self.vertex_group_ids[self.faces[global][0]];
        (body, global - self.face_offsets[body])
    }

    /// Current poses of all bodies.
    #[must_use]
    pub fn poses(&self) -> Vec<Pose> {
        self.bodies.iter().map(|b| b.pose.clone()).collect()
    }

    /// World-frame positions of all vertices at the given poses.
    #[must_use]
    pub fn world_vertices(&self, poses: &[Pose]) -> DMatrix<f64> {
        let rotations: Vec<DMatrix<f64>> = poses.iter().map(Pose::rotation_matrix).collect();
        let positions: Vec<DVector<f64>> = poses.iter().map(|p| p.position.clone()).collect();
        self.world_vertices_with(&rotations, &positions)
    }

    /// World-frame vertex positions for per-body rotation matrices and
    /// translations of any scalar type.
    ///
    /// This is the seam the rigid-body broad phase uses to evaluate vertex
    /// trajectories over interval-valued rotations and translations with the
    /// same code path as plain `f64` poses.
    ///
    /// # Panics
    ///
    /// Panics if the slices do not have one entry per body.
    #[must_use]
    pub fn world_vertices_with<T>(
        &self,
        rotations: &[DMatrix<T>],
        positions: &[DVector<T>],
    ) -> DMatrix<T>
    where
        T: Scalar + Copy + Zero + Add<Output = T> + Mul<Output = T> + From<f64>,
    {
        assert_eq!(rotations.len(), self.num_bodies());
        assert_eq!(positions.len(), self.num_bodies());

        let dim = self.dim;
        let mut out = DMatrix::<T>::zeros(self.num_vertices(), dim);
        for (b, body) in self.bodies.iter().enumerate() {
            let r = &rotations[b];
            let p = &positions[b];
            let offset = self.vertex_offsets[b];
            for v in 0..body.num_vertices() {
                for i in 0..dim {
                    let mut acc = p[i];
                    for j in 0..dim {
                        acc = acc + r[(i, j)] * T::from(body.vertices[(v, j)]);
                    }
                    out[(offset + v, i)] = acc;
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_segment_body() -> RigidBody {
        RigidBody::new(
            DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 1.0, 0.0]),
            vec![[0, 1]],
            vec![],
            Pose::zeros(2),
            Pose::zeros(2),
            1.0,
            vec![false; 3],
            false,
        )
        .expect("body should be valid")
    }

    fn point_body(x: f64, y: f64) -> RigidBody {
        RigidBody::new(
            DMatrix::from_row_slice(1, 2, &[x, y]),
            vec![],
            vec![],
            Pose::zeros(2),
            Pose::zeros(2),
            1.0,
            vec![false; 3],
            false,
        )
        .expect("body should be valid")
    }

    #[test]
    fn test_body_validation() {
        let bad_edge = RigidBody::new(
            DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]),
            vec![[0, 5]],
            vec![],
            Pose::zeros(2),
            Pose::zeros(2),
            1.0,
            vec![false; 3],
            false,
        );
        assert!(bad_edge.is_err());

        let bad_dof = RigidBody::new(
            DMatrix::from_row_slice(1, 2, &[0.0, 0.0]),
            vec![],
            vec![],
            Pose::zeros(2),
            Pose::zeros(2),
            1.0,
            vec![false; 6],
            false,
        );
        assert!(bad_dof.is_err());
    }

    #[test]
    fn test_average_edge_length() {
        let body = unit_segment_body();
        assert_relative_eq!(body.average_edge_length(), 2.0);
    }

    #[test]
    fn test_world_vertices_rotation() {
        let mut body = unit_segment_body();
        body.pose = Pose::new(
            DVector::from_vec(vec![0.0, 1.0]),
            DVector::from_element(1, std::f64::consts::FRAC_PI_2),
        );
        let w = body.world_vertices(&body.pose.clone());
        // (-1, 0) rotated by 90 degrees is (0, -1), translated to (0, 0).
        assert_relative_eq!(w[(0, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(w[(0, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_assembler_offsets_and_groups() {
        let assembler =
            RigidBodyAssembler::from_bodies(vec![point_body(0.0, 1.0), unit_segment_body()])
                .expect("assembly should succeed");

        assert_eq!(assembler.num_vertices(), 3);
        assert_eq!(assembler.edges(), &[[1, 2]]);
        assert_eq!(assembler.vertex_group_ids(), &[0, 1, 1]);
        assert_eq!(assembler.vertex_body(2), (1, 1));
        assert_relative_eq!(assembler.average_edge_length(), 2.0);
    }

    #[test]
    fn test_assembler_rejects_mixed_dimensions() {
        let body3 = RigidBody::new(
            DMatrix::from_row_slice(1, 3, &[0.0, 0.0, 0.0]),
            vec![],
            vec![],
            Pose::zeros(3),
            Pose::zeros(3),
            1.0,
            vec![false; 6],
            false,
        )
        .expect("3d body should be valid");

        let err = RigidBodyAssembler::from_bodies(vec![point_body(0.0, 0.0), body3])
            .expect_err("mixed dimensions must fail");
        assert_eq!(err, CcdError::MixedDimensions);
    }

    #[test]
    fn test_world_vertices_match_identity_pose() {
        let assembler = RigidBodyAssembler::from_bodies(vec![unit_segment_body()])
            .expect("assembly should succeed");
        let w = assembler.world_vertices(&assembler.poses());
        assert_eq!(w, assembler.body(0).vertices);
    }
}
