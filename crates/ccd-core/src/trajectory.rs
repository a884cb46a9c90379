//! Interval-valued rigid-body vertex trajectories over a time step.

use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, Vector2, Vector3};
use rayon::prelude::*;

use ccd_interval::Interval;
use ccd_types::{Pose, RigidBody, RigidBodyAssembler};

use crate::screw::{decompose_to_z_screwing, rotate_around_z};

/// The trajectory of one rigid body over `t ∈ [0, 1]`.
///
/// Translation is interpolated linearly. Rotation is interpolated as an
/// angle in 2D and through the screw decomposition in 3D, so evaluating at
/// an interval `t` yields a conservative enclosure of every intermediate
/// rotation.
#[derive(Debug, Clone)]
pub struct BodyTrajectory {
    dim: usize,
    position_t0: DVector<f64>,
    position_delta: DVector<f64>,
    // 2D rotation: linear angle interpolation.
    angle_t0: f64,
    angle_delta: f64,
    // 3D rotation: R(t) = P^T * Rz(t * omega) * P * R0.
    r0: Matrix3<f64>,
    p_basis: Matrix3<f64>,
    omega: f64,
}

impl BodyTrajectory {
    /// Build the trajectory between two poses of the same body.
    ///
    /// # Panics
    ///
    /// Panics if the poses disagree in dimension.
    #[must_use]
    pub fn new(pose_t0: &Pose, pose_t1: &Pose) -> Self {
        assert_eq!(pose_t0.dim(), pose_t1.dim());
        let dim = pose_t0.dim();
        let (angle_t0, angle_delta, r0, p_basis, omega) = if dim == 2 {
            (
                pose_t0.rotation[0],
                pose_t1.rotation[0] - pose_t0.rotation[0],
                Matrix3::identity(),
                Matrix3::identity(),
                0.0,
            )
        } else {
            let (r0, p, omega) = decompose_to_z_screwing(pose_t0, pose_t1);
            (0.0, 0.0, r0, p, omega)
        };
        Self {
            dim,
            position_t0: pose_t0.position.clone(),
            position_delta: &pose_t1.position - &pose_t0.position,
            angle_t0,
            angle_delta,
            r0,
            p_basis,
            omega,
        }
    }

    /// Spatial dimension of the trajectory.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Interval enclosure of the body translation at time `t`.
    #[must_use]
    pub fn position(&self, t: Interval) -> DVector<Interval> {
        DVector::from_fn(self.dim, |i, _| {
            Interval::point(self.position_t0[i]) + t * self.position_delta[i]
        })
    }

    /// Interval enclosure of the body rotation matrix at time `t`.
    #[must_use]
    pub fn rotation(&self, t: Interval) -> DMatrix<Interval> {
        if self.dim == 2 {
            let r = self.rotation2(t);
            DMatrix::from_fn(2, 2, |i, j| r[(i, j)])
        } else {
            let r = self.rotation3(t);
            DMatrix::from_fn(3, 3, |i, j| r[(i, j)])
        }
    }

    fn rotation2(&self, t: Interval) -> Matrix2<Interval> {
        let angle = Interval::point(self.angle_t0) + t * self.angle_delta;
        let c = angle.cos();
        let s = angle.sin();
        Matrix2::new(c, -s, s, c)
    }

    fn rotation3(&self, t: Interval) -> Matrix3<Interval> {
        let rz = rotate_around_z(t * self.omega);
        let p = self.p_basis.map(Interval::point);
        let r0 = self.r0.map(Interval::point);
        p.transpose() * rz * p * r0
    }

    /// Interval enclosure of a body vertex's world position at time `t` (2D).
    #[must_use]
    pub fn vertex2(&self, body: &RigidBody, vertex_id: usize, t: Interval) -> Vector2<Interval> {
        debug_assert_eq!(self.dim, 2);
        let r = self.rotation2(t);
        let v = Vector2::new(
            Interval::point(body.vertices[(vertex_id, 0)]),
            Interval::point(body.vertices[(vertex_id, 1)]),
        );
        let p = self.position(t);
        r * v + Vector2::new(p[0], p[1])
    }

    /// Interval enclosure of a body vertex's world position at time `t` (3D).
    #[must_use]
    pub fn vertex3(&self, body: &RigidBody, vertex_id: usize, t: Interval) -> Vector3<Interval> {
        debug_assert_eq!(self.dim, 3);
        let r = self.rotation3(t);
        let v = Vector3::new(
            Interval::point(body.vertices[(vertex_id, 0)]),
            Interval::point(body.vertices[(vertex_id, 1)]),
            Interval::point(body.vertices[(vertex_id, 2)]),
        );
        let p = self.position(t);
        r * v + Vector3::new(p[0], p[1], p[2])
    }
}

/// Interval enclosures of every vertex's world position over `t`.
///
/// Trajectory construction and evaluation are a parallel-for over bodies;
/// the result matrix has one row per global vertex.
///
/// # Panics
///
/// Panics if the pose slices do not have one entry per body.
#[must_use]
pub fn compute_vertex_intervals(
    bodies: &RigidBodyAssembler,
    poses_t0: &[Pose],
    poses_t1: &[Pose],
    t: Interval,
) -> DMatrix<Interval> {
    assert_eq!(poses_t0.len(), bodies.num_bodies());
    assert_eq!(poses_t1.len(), bodies.num_bodies());

    let (rotations, positions): (Vec<DMatrix<Interval>>, Vec<DVector<Interval>>) = poses_t0
        .par_iter()
        .zip(poses_t1.par_iter())
        .map(|(p0, p1)| {
            let trajectory = BodyTrajectory::new(p0, p1);
            (trajectory.rotation(t), trajectory.position(t))
        })
        .unzip();

    bodies.world_vertices_with(&rotations, &positions)
}
