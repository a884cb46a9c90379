//! Per-step CCD driver: broad phase, then earliest TOI over candidates.

use ccd_types::{Candidates, Pose, Result, RigidBodyAssembler};

use crate::toi::{
    edge_edge_time_of_impact, edge_vertex_time_of_impact, face_vertex_time_of_impact,
};
use crate::RigidBodyHashGrid;

/// Run the rigid-body broad phase for the step `poses_t0 → poses_t1`.
///
/// A 2D scene produces edge-vertex candidates; a 3D scene produces
/// edge-edge, edge-face, and face-vertex candidates. Body group ids filter
/// intra-body pairs.
pub fn detect_collision_candidates(
    bodies: &RigidBodyAssembler,
    poses_t0: &[Pose],
    poses_t1: &[Pose],
    inflation_radius: f64,
) -> Result<Candidates> {
    let mut grid = RigidBodyHashGrid::default();
    grid.resize(bodies, poses_t0, poses_t1, inflation_radius);
    grid.add_bodies(bodies, poses_t0, poses_t1, inflation_radius)?;

    let group_ids = Some(bodies.vertex_group_ids());
    let mut candidates = Candidates::default();
    if bodies.dim() == 2 {
        candidates.ev = grid.get_edge_vertex_pairs(bodies.edges(), group_ids);
    } else {
        candidates.ee = grid.get_edge_edge_pairs(bodies.edges(), group_ids);
        candidates.ef = grid.get_edge_face_pairs(bodies.edges(), bodies.faces(), group_ids);
        candidates.fv = grid.get_face_vertex_pairs(bodies.faces(), group_ids);
    }
    tracing::debug!(
        ev = candidates.ev.len(),
        ee = candidates.ee.len(),
        ef = candidates.ef.len(),
        fv = candidates.fv.len(),
        "broad phase candidates"
    );
    Ok(candidates)
}

/// Earliest time of impact across all candidate pairs of the step, or
/// `None` if no pair impacts in `[0, 1]`.
///
/// Candidates are narrowed sequentially with a shrinking `earliest_toi`
/// cap, so later kernels only search before the best impact found so far.
pub fn compute_earliest_toi(
    bodies: &RigidBodyAssembler,
    poses_t0: &[Pose],
    poses_t1: &[Pose],
    inflation_radius: f64,
    toi_tolerance: f64,
) -> Result<Option<f64>> {
    let candidates = detect_collision_candidates(bodies, poses_t0, poses_t1, inflation_radius)?;

    let mut earliest = 1.0_f64;
    let mut found = false;

    for c in &candidates.ev {
        let (vb, vl) = bodies.vertex_body(c.vertex_index);
        let (eb, el) = bodies.edge_body(c.edge_index);
        if let Some(toi) = edge_vertex_time_of_impact(
            bodies.body(vb),
            &poses_t0[vb],
            &poses_t1[vb],
            vl,
            bodies.body(eb),
            &poses_t0[eb],
            &poses_t1[eb],
            el,
            earliest,
            toi_tolerance,
        ) {
            earliest = earliest.min(toi);
            found = true;
        }
    }
    for c in &candidates.ee {
        let (ab, al) = bodies.edge_body(c.edge0_index);
        let (bb, bl) = bodies.edge_body(c.edge1_index);
        if let Some(toi) = edge_edge_time_of_impact(
            bodies.body(ab),
            &poses_t0[ab],
            &poses_t1[ab],
            al,
            bodies.body(bb),
            &poses_t0[bb],
            &poses_t1[bb],
            bl,
            earliest,
            toi_tolerance,
        ) {
            earliest = earliest.min(toi);
            found = true;
        }
    }
    for c in &candidates.fv {
        let (vb, vl) = bodies.vertex_body(c.vertex_index);
        let (fb, fl) = bodies.face_body(c.face_index);
        if let Some(toi) = face_vertex_time_of_impact(
            bodies.body(vb),
            &poses_t0[vb],
            &poses_t1[vb],
            vl,
            bodies.body(fb),
            &poses_t0[fb],
            &poses_t1[fb],
            fl,
            earliest,
            toi_tolerance,
        ) {
            earliest = earliest.min(toi);
            found = true;
        }
    }

    if found {
        tracing::debug!(toi = earliest, "earliest impact");
    }
    Ok(found.then_some(earliest))
}
