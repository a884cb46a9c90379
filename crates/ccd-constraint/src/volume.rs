//! Swept-volume collision constraint over edge-edge impacts.

use nalgebra::{DMatrix, DVector, SMatrix, SVector};
use num_dual::DualNum;

use ccd_core::{edge_vertex_time_of_impact_linear, HashGrid, DEFAULT_TOI_TOLERANCE};
use ccd_types::{
    CcdError, ConstraintConfig, EdgeEdgeImpact, EdgeVertexImpact, Result,
};

use crate::constraint::CollisionConstraint;

/// Space-time interference volume of one edge at an impact.
///
/// `v_i, v_j` are the edge endpoints, `u_i, u_j` their step displacements,
/// `toi` the time of impact, and `alpha` the contact parameter along the
/// edge. With `e(τ) = (v_j + τ u_j) - (v_i + τ u_i)` and `e⊥` its quarter
/// turn, the volume is
///
/// `-(1 - τ) · sqrt(ε² ‖e⊥‖² + (U_c · e⊥)²)` where `U_c = u_i + α (u_j - u_i)`.
///
/// The result is never positive: it measures how much space-time the
/// contact sweeps after the impact, and vanishes only when the remaining
/// step or the relative normal motion does.
pub fn collision_volume<D: DualNum<f64> + Copy>(
    v_i: [f64; 2],
    v_j: [f64; 2],
    u_i: [D; 2],
    u_j: [D; 2],
    toi: f64,
    alpha: f64,
    epsilon: f64,
) -> D {
    let e_toi = [
        u_j[0] * toi + v_j[0] - (u_i[0] * toi + v_i[0]),
        u_j[1] * toi + v_j[1] - (u_i[1] * toi + v_i[1]),
    ];
    let e_rot90 = [e_toi[1], -e_toi[0]];
    let e_len_sq = e_rot90[0] * e_rot90[0] + e_rot90[1] * e_rot90[1];

    let u_c = [
        u_i[0] + (u_j[0] - u_i[0]) * alpha,
        u_i[1] + (u_j[1] - u_i[1]) * alpha,
    ];
    let normal_motion = u_c[0] * e_rot90[0] + u_c[1] * e_rot90[1];

    -((e_len_sq * (epsilon * epsilon) + normal_motion * normal_motion).sqrt() * (1.0 - toi))
}

/// Dense row index of an impact's constraint.
///
/// The impacted side occupies rows `[0, num_edges)` by impacted edge; the
/// impacting side occupies rows `[num_edges, 2 num_edges)` by impacting
/// edge.
#[must_use]
pub fn get_constraint_index(impact: &EdgeEdgeImpact, is_impacted: bool, num_edges: usize) -> usize {
    if is_impacted {
        impact.impacted_edge_index
    } else {
        num_edges + impact.impacting_edge_index
    }
}

/// Total number of constraint rows for an edge count.
#[must_use]
pub fn get_constraints_size(num_edges: usize) -> usize {
    2 * num_edges
}

/// Volume constraint: each edge contributes the swept volume of its first
/// impact, one row per side of the impact.
#[derive(Debug, Clone)]
pub struct VolumeConstraint {
    config: ConstraintConfig,
    vertices: DMatrix<f64>,
    edges: Vec<[usize; 2]>,
    group_ids: Option<Vec<usize>>,
    ee_impacts: Vec<EdgeEdgeImpact>,
    /// Index of each edge's first (earliest) impact in `ee_impacts`.
    edge_impact_map: Vec<Option<usize>>,
}

impl VolumeConstraint {
    /// Create the constraint with the given settings.
    #[must_use]
    pub fn new(config: ConstraintConfig) -> Self {
        Self {
            config,
            vertices: DMatrix::zeros(0, 2),
            edges: Vec::new(),
            group_ids: None,
            ee_impacts: Vec::new(),
            edge_impact_map: Vec::new(),
        }
    }

    /// The edge-edge impacts of the last initialization.
    #[must_use]
    pub fn ee_impacts(&self) -> &[EdgeEdgeImpact] {
        &self.ee_impacts
    }

    /// Detect edge-vertex impacts for the step and convert them to
    /// edge-edge impacts through the impacting vertex's incident edges.
    pub fn get_ee_collision_set(
        &self,
        displacements: &DMatrix<f64>,
    ) -> Result<Vec<EdgeEdgeImpact>> {
        if self.vertices.nrows() == 0 || self.edges.is_empty() {
            return Ok(Vec::new());
        }
        let displaced = &self.vertices + displacements;
        let mut grid = HashGrid::default();
        grid.resize_for_displacements(&self.vertices, &displaced, &self.edges, 0.0);
        grid.add_vertices(&self.vertices, &displaced, 0.0)?;
        grid.add_edges(&self.vertices, &displaced, &self.edges, 0.0)?;
        let candidates = grid.get_edge_vertex_pairs(&self.edges, self.group_ids.as_deref());

        let point = |i: usize| [self.vertices[(i, 0)], self.vertices[(i, 1)]];
        let displacement = |i: usize| [displacements[(i, 0)], displacements[(i, 1)]];

        let mut ev_impacts = Vec::new();
        for candidate in &candidates {
            let v = candidate.vertex_index;
            let [b, c] = self.edges[candidate.edge_index];
            if let Some((time, alpha)) = edge_vertex_time_of_impact_linear(
                point(v),
                displacement(v),
                point(b),
                displacement(b),
                point(c),
                displacement(c),
                1.0,
                DEFAULT_TOI_TOLERANCE,
            ) {
                ev_impacts.push(EdgeVertexImpact {
                    time,
                    edge_index: candidate.edge_index,
                    alpha,
                    vertex_index: v,
                });
            }
        }

        let mut ee_impacts = Vec::new();
        for impact in &ev_impacts {
            for (e2, edge) in self.edges.iter().enumerate() {
                if e2 == impact.edge_index || !edge.contains(&impact.vertex_index) {
                    continue;
                }
                ee_impacts.push(EdgeEdgeImpact {
                    time: impact.time,
                    impacted_edge_index: impact.edge_index,
                    impacted_alpha: impact.alpha,
                    impacting_edge_index: e2,
                    impacting_alpha: if edge[0] == impact.vertex_index { 0.0 } else { 1.0 },
                });
            }
        }
        Ok(ee_impacts)
    }

    /// For every edge, the index of its earliest impact (either side).
    fn build_edge_impact_map(&self) -> Vec<Option<usize>> {
        let mut map: Vec<Option<usize>> = vec![None; self.edges.len()];
        for (idx, impact) in self.ee_impacts.iter().enumerate() {
            for edge in [impact.impacted_edge_index, impact.impacting_edge_index] {
                match map[edge] {
                    Some(best) if self.ee_impacts[best].time <= impact.time => {}
                    _ => map[edge] = Some(idx),
                }
            }
        }
        map
    }

    /// The 8 displacement coordinates of an impact's two edges, the
    /// corresponding vertex ids, and the constant geometry.
    fn impact_coordinates(
        &self,
        impact: &EdgeEdgeImpact,
        displacements: &DMatrix<f64>,
    ) -> (SVector<f64, 8>, [usize; 4]) {
        let [i, j] = self.edges[impact.impacted_edge_index];
        let [k, l] = self.edges[impact.impacting_edge_index];
        let ids = [i, j, k, l];
        let mut u = SVector::<f64, 8>::zeros();
        for (slot, &vertex) in ids.iter().enumerate() {
            u[2 * slot] = displacements[(vertex, 0)];
            u[2 * slot + 1] = displacements[(vertex, 1)];
        }
        (u, ids)
    }

    /// Evaluate one side's volume as a function of all 8 displacement
    /// coordinates (the other side's coordinates are carried for
    /// differentiation but do not enter the value).
    fn side_volume<D: DualNum<f64> + Copy>(
        &self,
        impact: &EdgeEdgeImpact,
        is_impacted: bool,
        u: &[D; 8],
    ) -> D {
        let (edge, alpha, offset) = if is_impacted {
            (impact.impacted_edge_index, impact.impacted_alpha, 0)
        } else {
            (impact.impacting_edge_index, impact.impacting_alpha, 4)
        };
        let [i, j] = self.edges[edge];
        collision_volume(
            [self.vertices[(i, 0)], self.vertices[(i, 1)]],
            [self.vertices[(j, 0)], self.vertices[(j, 1)]],
            [u[offset], u[offset + 1]],
            [u[offset + 2], u[offset + 3]],
            impact.time,
            alpha,
            self.config.volume_epsilon,
        )
    }

    /// Rows this constraint fills: `(row, impact index, is_impacted)`.
    fn active_rows(&self) -> Vec<(usize, usize, bool)> {
        let num_edges = self.edges.len();
        let mut rows = Vec::new();
        for (edge, entry) in self.edge_impact_map.iter().enumerate() {
            let Some(idx) = entry else { continue };
            let impact = &self.ee_impacts[*idx];
            if impact.impacted_edge_index == edge {
                rows.push((get_constraint_index(impact, true, num_edges), *idx, true));
            }
            if impact.impacting_edge_index == edge {
                rows.push((get_constraint_index(impact, false, num_edges), *idx, false));
            }
        }
        rows
    }
}

impl CollisionConstraint for VolumeConstraint {
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
        self.vertices = vertices.clone();
        self.edges = edges.to_vec();
        self.group_ids = group_ids.map(<[usize]>::to_vec);
        self.ee_impacts = self.get_ee_collision_set(displacements)?;
        self.edge_impact_map = self.build_edge_impact_map();
        tracing::debug!(
            impacts = self.ee_impacts.len(),
            "initialized volume constraint"
        );
        Ok(())
    }

    fn number_of_constraints(&self) -> usize {
        get_constraints_size(self.edges.len())
    }

    fn compute_constraints(&self, displacements: &DMatrix<f64>) -> DVector<f64> {
        let mut g = DVector::zeros(self.number_of_constraints());
        for (row, idx, is_impacted) in self.active_rows() {
            let impact = &self.ee_impacts[idx];
            let (u, _) = self.impact_coordinates(impact, displacements);
            let u: [f64; 8] = u.into();
            g[row] = self.side_volume(impact, is_impacted, &u);
        }
        g
    }

    fn compute_constraints_jacobian(&self, displacements: &DMatrix<f64>) -> DMatrix<f64> {
        let ndof = 2 * self.vertices.nrows();
        let mut jacobian = DMatrix::zeros(self.number_of_constraints(), ndof);
        for (row, idx, is_impacted) in self.active_rows() {
            let impact = &self.ee_impacts[idx];
            let (u, ids) = self.impact_coordinates(impact, displacements);
            let (_, gradient) = num_dual::gradient(
                |v: SVector<_, 8>| {
                    let u = [v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7]];
                    self.side_volume(impact, is_impacted, &u)
                },
                u,
            );
            for (slot, &vertex) in ids.iter().enumerate() {
                jacobian[(row, 2 * vertex)] += gradient[2 * slot];
                jacobian[(row, 2 * vertex + 1)] += gradient[2 * slot + 1];
            }
        }
        jacobian
    }

    fn compute_constraints_hessian(&self, displacements: &DMatrix<f64>) -> Vec<DMatrix<f64>> {
        let ndof = 2 * self.vertices.nrows();
        let mut hessians = vec![DMatrix::zeros(ndof, ndof); self.number_of_constraints()];
        for (row, idx, is_impacted) in self.active_rows() {
            let impact = &self.ee_impacts[idx];
            let (u, ids) = self.impact_coordinates(impact, displacements);
            let (_, _, local): (_, _, SMatrix<f64, 8, 8>) = num_dual::hessian(
                |v: SVector<_, 8>| {
                    let u = [v[0], v[1], v[2], v[3], v[4], v[5], v[6], v[7]];
                    self.side_volume(impact, is_impacted, &u)
                },
                u,
            );
            for (p, &vp) in ids.iter().enumerate() {
                for (q, &vq) in ids.iter().enumerate() {
                    for di in 0..2 {
                        for dj in 0..2 {
                            hessians[row][(2 * vp + di, 2 * vq + dj)] +=
                                local[(2 * p + di, 2 * q + dj)];
                        }
                    }
                }
            }
        }
        hessians
    }

    fn has_collisions(&self, displacements: &DMatrix<f64>) -> bool {
        self.get_ee_collision_set(displacements)
            .map(|impacts| !impacts.is_empty())
            .unwrap_or(true)
    }

    fn min_distance(&self, _displacements: &DMatrix<f64>) -> Option<f64> {
        None
    }

    fn settings(&self) -> &ConstraintConfig {
        &self.config
    }
}
