//! Distance-barrier collision constraint.

use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use num_dual::DualNum;

use ccd_core::{edge_vertex_time_of_impact_linear, HashGrid, DEFAULT_TOI_TOLERANCE};
use ccd_types::{CcdError, ConstraintConfig, EdgeVertexCandidate, Result};

use crate::constraint::CollisionConstraint;
use crate::distance::point_to_edge_sq_distance;
use crate::newton::project_to_psd;

/// Barrier potential over squared distance.
///
/// For `d² ∈ (0, ε²)` the value is `-(d² - ε²)² · ln(d²/ε²)`: it diverges
/// as the distance reaches zero and joins `0` with zero slope at `d = ε`,
/// so both the value and the gradient norm grow monotonically as the
/// distance shrinks. At or below zero squared distance the barrier is
/// infinite; at or beyond `ε` it vanishes.
pub fn distance_barrier<D: DualNum<f64> + Copy>(distance_sq: D, epsilon: f64) -> D {
    let eps_sq = epsilon * epsilon;
    if distance_sq.re() <= 0.0 {
        return D::from(f64::INFINITY);
    }
    if distance_sq.re() >= eps_sq {
        return D::zero();
    }
    let gap = distance_sq - eps_sq;
    -(gap * gap * (distance_sq / eps_sq).ln())
}

/// Distance-barrier constraint over broad-phase edge-vertex candidates.
///
/// One constraint row per candidate pair; rows for pairs farther than the
/// barrier epsilon evaluate to zero, so the candidate set only needs to be
/// a superset of the active contacts.
#[derive(Debug, Clone)]
pub struct DistanceBarrierConstraint {
    config: ConstraintConfig,
    barrier_epsilon: f64,
    vertices: DMatrix<f64>,
    edges: Vec<[usize; 2]>,
    ev_candidates: Vec<EdgeVertexCandidate>,
}

impl DistanceBarrierConstraint {
    /// Create the constraint with the given settings.
    #[must_use]
    pub fn new(config: ConstraintConfig) -> Self {
        let barrier_epsilon = config.custom_initial_epsilon;
        Self {
            config,
            barrier_epsilon,
            vertices: DMatrix::zeros(0, 2),
            edges: Vec::new(),
            ev_candidates: Vec::new(),
        }
    }

    /// Current barrier epsilon.
    #[must_use]
    pub fn barrier_epsilon(&self) -> f64 {
        self.barrier_epsilon
    }

    /// Shrink (or set) the barrier epsilon for the next outer iteration.
    pub fn set_barrier_epsilon(&mut self, epsilon: f64) {
        self.barrier_epsilon = epsilon;
    }

    /// The candidate pairs collected by the last [`initialize`](CollisionConstraint::initialize).
    #[must_use]
    pub fn candidates(&self) -> &[EdgeVertexCandidate] {
        &self.ev_candidates
    }

    /// The three primitive points of a candidate at displaced positions.
    fn candidate_points(
        &self,
        candidate: &EdgeVertexCandidate,
        displacements: &DMatrix<f64>,
    ) -> ([f64; 2], [f64; 2], [f64; 2], [usize; 3]) {
        let v = candidate.vertex_index;
        let [b, c] = self.edges[candidate.edge_index];
        let point = |i: usize| {
            [
                self.vertices[(i, 0)] + displacements[(i, 0)],
                self.vertices[(i, 1)] + displacements[(i, 1)],
            ]
        };
        (point(v), point(b), point(c), [v, b, c])
    }

    /// Gradient of one candidate's barrier over its six coordinates.
    fn candidate_gradient(
        a: [f64; 2],
        b: [f64; 2],
        c: [f64; 2],
        epsilon: f64,
    ) -> SVector<f64, 6> {
        let x = SVector::<f64, 6>::from([a[0], a[1], b[0], b[1], c[0], c[1]]);
        let (_, gradient) = num_dual::gradient(
            |v| {
                distance_barrier(
                    point_to_edge_sq_distance([v[0], v[1]], [v[2], v[3]], [v[4], v[5]]),
                    epsilon,
                )
            },
            x,
        );
        gradient
    }

    /// Hessian of one candidate's barrier over its six coordinates,
    /// projected onto the positive semi-definite cone.
    fn candidate_hessian(a: [f64; 2], b: [f64; 2], c: [f64; 2], epsilon: f64) -> SMatrix<f64, 6, 6> {
        let x = SVector::<f64, 6>::from([a[0], a[1], b[0], b[1], c[0], c[1]]);
        let (_, _, hessian) = num_dual::hessian(
            |v| {
                distance_barrier(
                    point_to_edge_sq_distance([v[0], v[1]], [v[2], v[3]], [v[4], v[5]]),
                    epsilon,
                )
            },
            x,
        );
        let dense = DMatrix::from_fn(6, 6, |i, j| hessian[(i, j)]);
        let projected = project_to_psd(&dense);
        SMatrix::<f64, 6, 6>::from_fn(|i, j| projected[(i, j)])
    }
}

impl CollisionConstraint for DistanceBarrierConstraint {
    fn initialize(
        &mut self,
        vertices: &DMatrix<f64>,
        edges: &[[usize; 2]],
        group_ids: Option<&[usize]>,
        displacements: &DMatrix<f64>,
    ) -> Result<()> {
        if vertices.ncols() != 2 {
            return Err(CcdError::UnsupportedDimension(vertices.ncols()));
        }
        self.config.validate()?;
        self.barrier_epsilon = self.config.custom_initial_epsilon;
        self.vertices = vertices.clone();
        self.edges = edges.to_vec();

        let displaced = vertices + displacements;
        let mut grid = HashGrid::default();
        grid.resize_for_displacements(vertices, &displaced, edges, self.barrier_epsilon);
        grid.add_vertices(vertices, &displaced, self.barrier_epsilon)?;
        grid.add_edges(vertices, &displaced, edges, self.barrier_epsilon)?;
        self.ev_candidates = grid.get_edge_vertex_pairs(edges, group_ids);
        tracing::debug!(
            candidates = self.ev_candidates.len(),
            barrier_epsilon = self.barrier_epsilon,
            "initialized distance barrier constraint"
        );
        Ok(())
    }

    fn number_of_constraints(&self) -> usize {
        self.ev_candidates.len()
    }

    fn compute_constraints(&self, displacements: &DMatrix<f64>) -> DVector<f64> {
        DVector::from_iterator(
            self.ev_candidates.len(),
            self.ev_candidates.iter().map(|candidate| {
                let (a, b, c, _) = self.candidate_points(candidate, displacements);
                distance_barrier(point_to_edge_sq_distance(a, b, c), self.barrier_epsilon)
            }),
        )
    }

    fn compute_constraints_jacobian(&self, displacements: &DMatrix<f64>) -> DMatrix<f64> {
        let ndof = 2 * self.vertices.nrows();
        let mut jacobian = DMatrix::zeros(self.ev_candidates.len(), ndof);
        for (row, candidate) in self.ev_candidates.iter().enumerate() {
            let (a, b, c, ids) = self.candidate_points(candidate, displacements);
            let gradient = Self::candidate_gradient(a, b, c, self.barrier_epsilon);
            for (k, &vertex) in ids.iter().enumerate() {
                jacobian[(row, 2 * vertex)] += gradient[2 * k];
                jacobian[(row, 2 * vertex + 1)] += gradient[2 * k + 1];
            }
        }
        jacobian
    }

    fn compute_constraints_hessian(&self, displacements: &DMatrix<f64>) -> Vec<DMatrix<f64>> {
        let ndof = 2 * self.vertices.nrows();
        self.ev_candidates
            .iter()
            .map(|candidate| {
                let (a, b, c, ids) = self.candidate_points(candidate, displacements);
                let local = Self::candidate_hessian(a, b, c, self.barrier_epsilon);
                let mut hessian = DMatrix::zeros(ndof, ndof);
                for (p, &vp) in ids.iter().enumerate() {
                    for (q, &vq) in ids.iter().enumerate() {
                        for di in 0..2 {
                            for dj in 0..2 {
                                hessian[(2 * vp + di, 2 * vq + dj)] +=
                                    local[(2 * p + di, 2 * q + dj)];
                            }
                        }
                    }
                }
                hessian
            })
            .collect()
    }

    fn has_collisions(&self, displacements: &DMatrix<f64>) -> bool {
        self.ev_candidates.iter().any(|candidate| {
            let v = candidate.vertex_index;
            let [b, c] = self.edges[candidate.edge_index];
            let point = |i: usize| [self.vertices[(i, 0)], self.vertices[(i, 1)]];
            let displacement = |i: usize| [displacements[(i, 0)], displacements[(i, 1)]];
            edge_vertex_time_of_impact_linear(
                point(v),
                displacement(v),
                point(b),
                displacement(b),
                point(c),
                displacement(c),
                1.0,
                DEFAULT_TOI_TOLERANCE,
            )
            .is_some()
        })
    }

    fn min_distance(&self, displacements: &DMatrix<f64>) -> Option<f64> {
        self.ev_candidates
            .iter()
            .map(|candidate| {
                let (a, b, c, _) = self.candidate_points(candidate, displacements);
                point_to_edge_sq_distance(a, b, c).sqrt()
            })
            .reduce(f64::min)
    }

    fn settings(&self) -> &ConstraintConfig {
        &self.config
    }
}
