//! Time-of-impact kernels for rigid-body and linear trajectories.
//!
//! Each kernel parameterizes the impact as the zero set of a gap function
//! over a `(time, parameters)` box and hands it to the interval root finder.
//! Time is coordinate 0; the kernels return the lower bound of the earliest
//! root box, which under-approximates the true time of impact by at most
//! the time tolerance - the conservative direction for collision response.

use nalgebra::SVector;

use ccd_interval::{interval_root_finder, Interval};
use ccd_types::{Pose, RigidBody};

use crate::trajectory::BodyTrajectory;

/// Default tolerance on the time coordinate of a root box.
pub const DEFAULT_TOI_TOLERANCE: f64 = 1e-6;

/// Tolerance on edge/face parameter coordinates of a root box.
const PARAMETER_TOLERANCE: f64 = 1e-6;

/// Hard cap on root-finder iterations per kernel invocation. Exceeding it
/// reports no impact.
const MAX_ROOT_FINDER_ITERATIONS: usize = 4_000_000;

/// Earliest time of impact between a vertex of one rigid body and an edge
/// of another (2D).
///
/// Searches `(t, alpha) ∈ [0, earliest_toi] × [0, 1]` for a zero of
/// `x_v(t) - ((1 - alpha) x_e0(t) + alpha x_e1(t))`.
///
/// # Panics
///
/// Panics in debug builds if the bodies are not 2D.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn edge_vertex_time_of_impact(
    vertex_body: &RigidBody,
    vertex_pose_t0: &Pose,
    vertex_pose_t1: &Pose,
    vertex_id: usize,
    edge_body: &RigidBody,
    edge_pose_t0: &Pose,
    edge_pose_t1: &Pose,
    edge_id: usize,
    earliest_toi: f64,
    toi_tolerance: f64,
) -> Option<f64> {
    debug_assert_eq!(vertex_body.dim(), 2);
    debug_assert_eq!(edge_body.dim(), 2);

    let vertex_trajectory = BodyTrajectory::new(vertex_pose_t0, vertex_pose_t1);
    let edge_trajectory = BodyTrajectory::new(edge_pose_t0, edge_pose_t1);
    let [e0, e1] = edge_body.edges[edge_id];

    let f = |x: &SVector<Interval, 2>| {
        let (t, alpha) = (x[0], x[1]);
        let v = vertex_trajectory.vertex2(vertex_body, vertex_id, t);
        let a = edge_trajectory.vertex2(edge_body, e0, t);
        let b = edge_trajectory.vertex2(edge_body, e1, t);
        let gap = v - (a + (b - a) * alpha);
        SVector::<Interval, 2>::new(gap[0], gap[1])
    };

    let x0 = SVector::<Interval, 2>::new(Interval::new(0.0, earliest_toi), Interval::UNIT);
    let tol = SVector::<f64, 2>::new(toi_tolerance, PARAMETER_TOLERANCE);
    interval_root_finder(f, |_| true, |_| true, &x0, &tol, MAX_ROOT_FINDER_ITERATIONS)
        .map(|root| root[0].lo())
}

/// Earliest time of impact between edges of two rigid bodies (3D).
///
/// Searches `(t, alpha, beta) ∈ [0, earliest_toi] × [0, 1]²` for a zero of
/// the gap between the two edge points.
///
/// # Panics
///
/// Panics in debug builds if the bodies are not 3D.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn edge_edge_time_of_impact(
    body_a: &RigidBody,
    pose_a_t0: &Pose,
    pose_a_t1: &Pose,
    edge_a_id: usize,
    body_b: &RigidBody,
    pose_b_t0: &Pose,
    pose_b_t1: &Pose,
    edge_b_id: usize,
    earliest_toi: f64,
    toi_tolerance: f64,
) -> Option<f64> {
    debug_assert_eq!(body_a.dim(), 3);
    debug_assert_eq!(body_b.dim(), 3);

    let trajectory_a = BodyTrajectory::new(pose_a_t0, pose_a_t1);
    let trajectory_b = BodyTrajectory::new(pose_b_t0, pose_b_t1);
    let [a0, a1] = body_a.edges[edge_a_id];
    let [b0, b1] = body_b.edges[edge_b_id];

    let f = |x: &SVector<Interval, 3>| {
        let (t, alpha, beta) = (x[0], x[1], x[2]);
        let pa0 = trajectory_a.vertex3(body_a, a0, t);
        let pa1 = trajectory_a.vertex3(body_a, a1, t);
        let pb0 = trajectory_b.vertex3(body_b, b0, t);
        let pb1 = trajectory_b.vertex3(body_b, b1, t);
        let gap = (pa0 + (pa1 - pa0) * alpha) - (pb0 + (pb1 - pb0) * beta);
        SVector::<Interval, 3>::new(gap[0], gap[1], gap[2])
    };

    let x0 = SVector::<Interval, 3>::new(
        Interval::new(0.0, earliest_toi),
        Interval::UNIT,
        Interval::UNIT,
    );
    let tol = SVector::<f64, 3>::new(toi_tolerance, PARAMETER_TOLERANCE, PARAMETER_TOLERANCE);
    interval_root_finder(f, |_| true, |_| true, &x0, &tol, MAX_ROOT_FINDER_ITERATIONS)
        .map(|root| root[0].lo())
}

/// Earliest time of impact between a vertex of one rigid body and a
/// triangular face of another (3D).
///
/// Searches `(t, u, v) ∈ [0, earliest_toi] × T` where `T` is the unit
/// triangle, for a zero of
/// `x_p(t) - (x_f0(t) + u (x_f1 - x_f0)(t) + v (x_f2 - x_f0)(t))`. The
/// triangle domain is enforced by a domain-validity predicate on boxes:
/// `u.lo + v.lo <= 1` with `u.hi >= 0` and `v.hi >= 0`.
///
/// # Panics
///
/// Panics in debug builds if the bodies are not 3D.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn face_vertex_time_of_impact(
    vertex_body: &RigidBody,
    vertex_pose_t0: &Pose,
    vertex_pose_t1: &Pose,
    vertex_id: usize,
    face_body: &RigidBody,
    face_pose_t0: &Pose,
    face_pose_t1: &Pose,
    face_id: usize,
    earliest_toi: f64,
    toi_tolerance: f64,
) -> Option<f64> {
    debug_assert_eq!(vertex_body.dim(), 3);
    debug_assert_eq!(face_body.dim(), 3);

    let vertex_trajectory = BodyTrajectory::new(vertex_pose_t0, vertex_pose_t1);
    let face_trajectory = BodyTrajectory::new(face_pose_t0, face_pose_t1);
    let [f0, f1, f2] = face_body.faces[face_id];

    let f = |x: &SVector<Interval, 3>| {
        let (t, u, v) = (x[0], x[1], x[2]);
        let p = vertex_trajectory.vertex3(vertex_body, vertex_id, t);
        let q0 = face_trajectory.vertex3(face_body, f0, t);
        let q1 = face_trajectory.vertex3(face_body, f1, t);
        let q2 = face_trajectory.vertex3(face_body, f2, t);
        let gap = p - (q0 + (q1 - q0) * u + (q2 - q0) * v);
        SVector::<Interval, 3>::new(gap[0], gap[1], gap[2])
    };

    let is_domain_valid = |x: &SVector<Interval, 3>| {
        x[1].lo() + x[2].lo() <= 1.0 && x[1].hi() >= 0.0 && x[2].hi() >= 0.0
    };

    let x0 = SVector::<Interval, 3>::new(
        Interval::new(0.0, earliest_toi),
        Interval::UNIT,
        Interval::UNIT,
    );
    let tol = SVector::<f64, 3>::new(toi_tolerance, PARAMETER_TOLERANCE, PARAMETER_TOLERANCE);
    interval_root_finder(
        f,
        |_| true,
        is_domain_valid,
        &x0,
        &tol,
        MAX_ROOT_FINDER_ITERATIONS,
    )
    .map(|root| root[0].lo())
}

/// Earliest time of impact between a linearly moving vertex and a linearly
/// moving edge (2D): trajectories `x(t) = x + t U`.
///
/// Returns `(toi, alpha)` - the impact time and the contact parameter along
/// the edge. This is the kernel the deformable constraint layer uses, where
/// scene motion is a per-vertex displacement rather than a rigid pose pair.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn edge_vertex_time_of_impact_linear(
    vertex: [f64; 2],
    vertex_displacement: [f64; 2],
    edge_vertex0: [f64; 2],
    edge_vertex0_displacement: [f64; 2],
    edge_vertex1: [f64; 2],
    edge_vertex1_displacement: [f64; 2],
    earliest_toi: f64,
    toi_tolerance: f64,
) -> Option<(f64, f64)> {
    let lerp = |p: [f64; 2], u: [f64; 2], t: Interval, i: usize| Interval::point(p[i]) + t * u[i];

    let f = |x: &SVector<Interval, 2>| {
        let (t, alpha) = (x[0], x[1]);
        let vx = lerp(vertex, vertex_displacement, t, 0);
        let vy = lerp(vertex, vertex_displacement, t, 1);
        let ax = lerp(edge_vertex0, edge_vertex0_displacement, t, 0);
        let ay = lerp(edge_vertex0, edge_vertex0_displacement, t, 1);
        let bx = lerp(edge_vertex1, edge_vertex1_displacement, t, 0);
        let by = lerp(edge_vertex1, edge_vertex1_displacement, t, 1);
        SVector::<Interval, 2>::new(
            vx - (ax + (bx - ax) * alpha),
            vy - (ay + (by - ay) * alpha),
        )
    };

    let x0 = SVector::<Interval, 2>::new(Interval::new(0.0, earliest_toi), Interval::UNIT);
    let tol = SVector::<f64, 2>::new(toi_tolerance, PARAMETER_TOLERANCE);
    interval_root_finder(f, |_| true, |_| true, &x0, &tol, MAX_ROOT_FINDER_ITERATIONS)
        .map(|root| (root[0].lo(), root[1].midpoint().clamp(0.0, 1.0)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_kernel_head_on_impact() {
        // Vertex at (0, 1) moving down by 2; edge from (-1, 0) to (1, 0).
        let (toi, alpha) = edge_vertex_time_of_impact_linear(
            [0.0, 1.0],
            [0.0, -2.0],
            [-1.0, 0.0],
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 0.0],
            1.0,
            DEFAULT_TOI_TOLERANCE,
        )
        .expect("impact should be found");
        assert_relative_eq!(toi, 0.5, epsilon = 1e-6);
        assert_relative_eq!(alpha, 0.5, epsilon = 1e-4);
    }

    #[test]
    fn test_linear_kernel_miss() {
        // Vertex moving down past the edge's extent on x.
        let result = edge_vertex_time_of_impact_linear(
            [5.0, 1.0],
            [0.0, -2.0],
            [-1.0, 0.0],
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 0.0],
            1.0,
            DEFAULT_TOI_TOLERANCE,
        );
        assert!(result.is_none());
    }

    #[test]
    fn test_linear_kernel_respects_earliest_toi_cap() {
        // Impact at t = 0.5 is invisible when the search is capped earlier.
        let result = edge_vertex_time_of_impact_linear(
            [0.0, 1.0],
            [0.0, -2.0],
            [-1.0, 0.0],
            [0.0, 0.0],
            [1.0, 0.0],
            [0.0, 0.0],
            0.25,
            DEFAULT_TOI_TOLERANCE,
        );
        assert!(result.is_none());
    }
}
