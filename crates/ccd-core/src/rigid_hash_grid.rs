//! Hash grid specialization for rigid bodies with angular trajectories.

use std::ops::{Deref, DerefMut};

use nalgebra::DVector;
use rayon::prelude::*;

use ccd_interval::{Interval, RoundingGuard};
use ccd_types::{Pose, Result, RigidBodyAssembler};

use crate::trajectory::compute_vertex_intervals;
use crate::{Aabb, HashGrid, HashItem};

/// A [`HashGrid`] filled from interval enclosures of screw-motion vertex
/// trajectories.
///
/// Cell sizing uses the mean per-vertex interval width as the displacement
/// proxy: a vertex that sweeps far (by translation or rotation) produces a
/// wide interval, and cells must be at least that large for the swept AABB
/// to land in few cells.
#[derive(Debug, Clone, Default)]
pub struct RigidBodyHashGrid {
    grid: HashGrid,
}

impl Deref for RigidBodyHashGrid {
    type Target = HashGrid;
    fn deref(&self) -> &HashGrid {
        &self.grid
    }
}

impl DerefMut for RigidBodyHashGrid {
    fn deref_mut(&mut self) -> &mut HashGrid {
        &mut self.grid
    }
}

impl RigidBodyHashGrid {
    /// Size the grid from the swept scene: the domain is the hull of all
    /// vertex enclosures and the cell size is
    /// `max(mean interval width, mean edge length) + inflation`.
    pub fn resize(
        &mut self,
        bodies: &RigidBodyAssembler,
        poses_t0: &[Pose],
        poses_t1: &[Pose],
        inflation_radius: f64,
    ) {
        let _rounding = RoundingGuard::acquire();
        let vertices = compute_vertex_intervals(bodies, poses_t0, poses_t1, Interval::UNIT);
        let dim = bodies.dim();

        let mut extents = vec![Interval::point(0.0); dim];
        let mut average_width = 0.0;
        for v in 0..vertices.nrows() {
            let mut max_side_width: f64 = 0.0;
            for i in 0..dim {
                extents[i] = if v == 0 {
                    vertices[(v, i)]
                } else {
                    Interval::hull(extents[i], vertices[(v, i)])
                };
                max_side_width = max_side_width.max(vertices[(v, i)].width());
            }
            average_width += max_side_width;
        }
        average_width /= vertices.nrows() as f64;

        let min = DVector::from_fn(dim, |i, _| extents[i].lo() - inflation_radius);
        let max = DVector::from_fn(dim, |i, _| extents[i].hi() + inflation_radius);

        let mut cell_size = average_width.max(bodies.average_edge_length()) + inflation_radius;
        if cell_size <= 0.0 {
            cell_size = ((&max - &min).max() / 10.0).max(f64::EPSILON);
        }
        self.grid.resize(min, max, cell_size);
    }

    /// Insert every vertex, edge, and face of the scene as the AABB of its
    /// interval trajectory enclosure.
    ///
    /// Vertex, edge, and face insertion run as three sibling parallel
    /// tasks; within each, the loop over primitives is parallel.
    pub fn add_bodies(
        &mut self,
        bodies: &RigidBodyAssembler,
        poses_t0: &[Pose],
        poses_t1: &[Pose],
        inflation_radius: f64,
    ) -> Result<()> {
        let _rounding = RoundingGuard::acquire();
        let vertices = compute_vertex_intervals(bodies, poses_t0, poses_t1, Interval::UNIT);
        let dim = bodies.dim();

        let vertex_aabbs: Vec<Aabb> = (0..vertices.nrows())
            .into_par_iter()
            .map(|v| {
                let min = DVector::from_fn(dim, |i, _| vertices[(v, i)].lo() - inflation_radius);
                let max = DVector::from_fn(dim, |i, _| vertices[(v, i)].hi() + inflation_radius);
                Aabb::new(min, max)
            })
            .collect();

        let grid = &self.grid;
        let (vertex_result, (edge_result, face_result)) = rayon::join(
            || {
                vertex_aabbs
                    .par_iter()
                    .enumerate()
                    .map(|(v, aabb)| grid.cell_items(aabb, v))
                    .collect::<Result<Vec<Vec<HashItem>>>>()
            },
            || {
                rayon::join(
                    || {
                        bodies
                            .edges()
                            .par_iter()
                            .enumerate()
                            .map(|(e, &[a, b])| {
                                let aabb = vertex_aabbs[a].union(&vertex_aabbs[b]);
                                grid.cell_items(&aabb, e)
                            })
                            .collect::<Result<Vec<Vec<HashItem>>>>()
                    },
                    || {
                        bodies
                            .faces()
                            .par_iter()
                            .enumerate()
                            .map(|(f, &[a, b, c])| {
                                let aabb = vertex_aabbs[a]
                                    .union(&vertex_aabbs[b])
                                    .union(&vertex_aabbs[c]);
                                grid.cell_items(&aabb, f)
                            })
                            .collect::<Result<Vec<Vec<HashItem>>>>()
                    },
                )
            },
        );

        self.grid
            .vertex_items
            .extend(vertex_result?.into_iter().flatten());
        self.grid
            .edge_items
            .extend(edge_result?.into_iter().flatten());
        self.grid
            .face_items
            .extend(face_result?.into_iter().flatten());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;
    use ccd_types::RigidBody;

    fn scene_2d() -> RigidBodyAssembler {
        let vertex_body = RigidBody::new(
            DMatrix::from_row_slice(1, 2, &[0.0, 0.0]),
            vec![],
            vec![],
            Pose::new(DVector::from_vec(vec![0.0, 1.0]), DVector::zeros(1)),
            Pose::zeros(2),
            1.0,
            vec![false; 3],
            false,
        )
        .expect("body should be valid");
        let edge_body = RigidBody::new(
            DMatrix::from_row_slice(2, 2, &[-1.0, 0.0, 1.0, 0.0]),
            vec![[0, 1]],
            vec![],
            Pose::zeros(2),
            Pose::zeros(2),
            1.0,
            vec![false; 3],
            false,
        )
        .expect("body should be valid");
        RigidBodyAssembler::from_bodies(vec![vertex_body, edge_body])
            .expect("assembly should succeed")
    }

    #[test]
    fn test_falling_vertex_pairs_with_edge() {
        let bodies = scene_2d();
        let poses_t0 = bodies.poses();
        let mut poses_t1 = bodies.poses();
        poses_t1[0].position[1] = -1.0;

        let mut grid = RigidBodyHashGrid::default();
        grid.resize(&bodies, &poses_t0, &poses_t1, 0.0);
        grid.add_bodies(&bodies, &poses_t0, &poses_t1, 0.0)
            .expect("insertion should succeed");

        let candidates =
            grid.get_edge_vertex_pairs(bodies.edges(), Some(bodies.vertex_group_ids()));
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].edge_index, 0);
        assert_eq!(candidates[0].vertex_index, 0);
    }

    #[test]
    fn test_static_separated_scene_has_no_pairs() {
        let bodies = scene_2d();
        let poses = bodies.poses();

        let mut grid = RigidBodyHashGrid::default();
        grid.resize(&bodies, &poses, &poses, 0.0);
        grid.add_bodies(&bodies, &poses, &poses, 0.0)
            .expect("insertion should succeed");

        let candidates =
            grid.get_edge_vertex_pairs(bodies.edges(), Some(bodies.vertex_group_ids()));
        assert!(candidates.is_empty());
    }
}
