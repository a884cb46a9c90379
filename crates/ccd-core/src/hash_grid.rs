//! Uniform spatial hash over swept AABBs.
//!
//! The grid covers a rectangular domain with `grid_size` cells per axis;
//! each inserted AABB is registered in every cell its corners span, as a
//! `(cell key, primitive id)` item. Candidate pairs are produced by sorting
//! the item buckets by key and crossing the items of equal-key runs, so the
//! result is insensitive to insertion order.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use ccd_types::{
    CcdError, EdgeEdgeCandidate, EdgeFaceCandidate, EdgeVertexCandidate, FaceVertexCandidate,
    Result,
};

use crate::Aabb;

/// An entry in the hash grid: a cell key, a primitive id, and the
/// primitive's swept AABB.
#[derive(Debug, Clone)]
pub struct HashItem {
    /// Encoded grid cell, `(z * S + y) * S + x`.
    pub key: usize,
    /// Primitive index (vertex, edge, or face, depending on the bucket).
    pub id: usize,
    /// Swept AABB of the primitive.
    pub aabb: Aabb,
}

/// A uniform spatial hash grid over vertex, edge, and face AABBs.
#[derive(Debug, Clone)]
pub struct HashGrid {
    cell_size: f64,
    grid_size: usize,
    domain_min: DVector<f64>,
    domain_max: DVector<f64>,
    pub(crate) vertex_items: Vec<HashItem>,
    pub(crate) edge_items: Vec<HashItem>,
    pub(crate) face_items: Vec<HashItem>,
}

impl Default for HashGrid {
    fn default() -> Self {
        Self {
            cell_size: 1.0,
            grid_size: 0,
            domain_min: DVector::zeros(0),
            domain_max: DVector::zeros(0),
            vertex_items: Vec::new(),
            edge_items: Vec::new(),
            face_items: Vec::new(),
        }
    }
}

impl HashGrid {
    /// Resize the grid to cover `[min, max]` with the given cell size and
    /// clear all buckets.
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is not positive.
    pub fn resize(&mut self, min: DVector<f64>, max: DVector<f64>, cell_size: f64) {
        assert!(cell_size > 0.0, "cell size must be positive");
        let extent = (&max - &min).max();
        self.cell_size = cell_size;
        self.grid_size = (extent / cell_size).ceil() as usize + 1;
        self.domain_min = min;
        self.domain_max = max;
        self.clear();
        tracing::debug!(
            cell_size = self.cell_size,
            grid_size = self.grid_size,
            "resized hash grid"
        );
    }

    /// Resize for a linear sweep: the domain covers the scene at both ends
    /// of the step, and the cell size is the larger of the mean edge length
    /// and the mean per-vertex displacement, plus the inflation radius.
    pub fn resize_for_displacements(
        &mut self,
        vertices_t0: &DMatrix<f64>,
        vertices_t1: &DMatrix<f64>,
        edges: &[[usize; 2]],
        inflation_radius: f64,
    ) {
        let dim = vertices_t0.ncols();
        let mut min = DVector::from_element(dim, f64::INFINITY);
        let mut max = DVector::from_element(dim, f64::NEG_INFINITY);
        for vertices in [vertices_t0, vertices_t1] {
            for v in 0..vertices.nrows() {
                for i in 0..dim {
                    min[i] = min[i].min(vertices[(v, i)]);
                    max[i] = max[i].max(vertices[(v, i)]);
                }
            }
        }
        min.add_scalar_mut(-inflation_radius);
        max.add_scalar_mut(inflation_radius);

        let mean_edge_length = if edges.is_empty() {
            0.0
        } else {
            edges
                .iter()
                .map(|&[a, b]| {
                    let l0 = (vertices_t0.row(a) - vertices_t0.row(b)).norm();
                    let l1 = (vertices_t1.row(a) - vertices_t1.row(b)).norm();
                    0.5 * (l0 + l1)
                })
                .sum::<f64>()
                / edges.len() as f64
        };
        let mean_displacement = (vertices_t1 - vertices_t0)
            .row_iter()
            .map(|r| r.norm())
            .sum::<f64>()
            / vertices_t0.nrows() as f64;

        let mut cell_size = mean_edge_length.max(mean_displacement) + inflation_radius;
        if cell_size <= 0.0 {
            // Static, edgeless scene: fall back to a fraction of the extent.
            cell_size = ((&max - &min).max() / 10.0).max(f64::EPSILON);
        }
        tracing::debug!(mean_edge_length, mean_displacement, "sizing hash grid cells");
        self.resize(min, max, cell_size);
    }

    /// Side length of a grid cell.
    #[must_use]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Number of cells per axis.
    #[must_use]
    pub fn grid_size(&self) -> usize {
        self.grid_size
    }

    /// Minimum corner of the grid domain.
    #[must_use]
    pub fn domain_min(&self) -> &DVector<f64> {
        &self.domain_min
    }

    /// Maximum corner of the grid domain.
    #[must_use]
    pub fn domain_max(&self) -> &DVector<f64> {
        &self.domain_max
    }

    /// Encode a cell location as a single key.
    fn hash(&self, x: usize, y: usize, z: usize) -> usize {
        debug_assert!(x < self.grid_size && y < self.grid_size && z < self.grid_size);
        (z * self.grid_size + y) * self.grid_size + x
    }

    /// The items registering `aabb` in every grid cell its corners span.
    ///
    /// Fails with a capacity error when the AABB lies entirely outside the
    /// grid domain on some axis.
    pub(crate) fn cell_items(&self, aabb: &Aabb, id: usize) -> Result<Vec<HashItem>> {
        let dim = aabb.dim();
        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        for i in 0..dim {
            let lo_cell = ((aabb.min()[i] - self.domain_min[i]) / self.cell_size).floor();
            let hi_cell = ((aabb.max()[i] - self.domain_min[i]) / self.cell_size).floor();
            if hi_cell < 0.0 || lo_cell >= self.grid_size as f64 {
                return Err(CcdError::grid_capacity(format!(
                    "item {id} does not intersect the grid domain on axis {i}"
                )));
            }
            lo[i] = lo_cell.max(0.0) as usize;
            hi[i] = (hi_cell as usize).min(self.grid_size - 1);
        }

        let mut items = Vec::with_capacity((hi[0] - lo[0] + 1) * (hi[1] - lo[1] + 1));
        for z in lo[2]..=hi[2] {
            for y in lo[1]..=hi[1] {
                for x in lo[0]..=hi[0] {
                    items.push(HashItem {
                        key: self.hash(x, y, z),
                        id,
                        aabb: aabb.clone(),
                    });
                }
            }
        }
        Ok(items)
    }

    /// Add one vertex as the AABB of its time-swept position.
    pub fn add_vertex(
        &mut self,
        vertex_t0: DVector<f64>,
        vertex_t1: DVector<f64>,
        index: usize,
        inflation_radius: f64,
    ) -> Result<()> {
        let aabb = Aabb::containing(&[vertex_t0, vertex_t1], inflation_radius);
        let items = self.cell_items(&aabb, index)?;
        self.vertex_items.extend(items);
        Ok(())
    }

    /// Add all vertices as AABBs of their time-swept positions.
    pub fn add_vertices(
        &mut self,
        vertices_t0: &DMatrix<f64>,
        vertices_t1: &DMatrix<f64>,
        inflation_radius: f64,
    ) -> Result<()> {
        let grid = &*self;
        let items: Vec<Vec<HashItem>> = (0..vertices_t0.nrows())
            .into_par_iter()
            .map(|v| {
                let aabb = Aabb::containing(
                    &[
                        vertices_t0.row(v).transpose(),
                        vertices_t1.row(v).transpose(),
                    ],
                    inflation_radius,
                );
                grid.cell_items(&aabb, v)
            })
            .collect::<Result<_>>()?;
        self.vertex_items.extend(items.into_iter().flatten());
        Ok(())
    }

    /// Add all edges as AABBs of their time-swept quads.
    pub fn add_edges(
        &mut self,
        vertices_t0: &DMatrix<f64>,
        vertices_t1: &DMatrix<f64>,
        edges: &[[usize; 2]],
        inflation_radius: f64,
    ) -> Result<()> {
        let grid = &*self;
        let items: Vec<Vec<HashItem>> = edges
            .par_iter()
            .enumerate()
            .map(|(e, &[a, b])| {
                let aabb = Aabb::containing(
                    &[
                        vertices_t0.row(a).transpose(),
                        vertices_t0.row(b).transpose(),
                        vertices_t1.row(a).transpose(),
                        vertices_t1.row(b).transpose(),
                    ],
                    inflation_radius,
                );
                grid.cell_items(&aabb, e)
            })
            .collect::<Result<_>>()?;
        self.edge_items.extend(items.into_iter().flatten());
        Ok(())
    }

    /// Add all faces as AABBs of their time-swept prisms.
    pub fn add_faces(
        &mut self,
        vertices_t0: &DMatrix<f64>,
        vertices_t1: &DMatrix<f64>,
        faces: &[[usize; 3]],
        inflation_radius: f64,
    ) -> Result<()> {
        let grid = &*self;
        let items: Vec<Vec<HashItem>> = faces
            .par_iter()
            .enumerate()
            .map(|(f, &[a, b, c])| {
                let aabb = Aabb::containing(
                    &[
                        vertices_t0.row(a).transpose(),
                        vertices_t0.row(b).transpose(),
                        vertices_t0.row(c).transpose(),
                        vertices_t1.row(a).transpose(),
                        vertices_t1.row(b).transpose(),
                        vertices_t1.row(c).transpose(),
                    ],
                    inflation_radius,
                );
                grid.cell_items(&aabb, f)
            })
            .collect::<Result<_>>()?;
        self.face_items.extend(items.into_iter().flatten());
        Ok(())
    }

    /// Drop all items, keeping the domain and allocations.
    pub fn clear(&mut self) {
        self.vertex_items.clear();
        self.edge_items.clear();
        self.face_items.clear();
    }

    /// Candidate edge-vertex pairs.
    ///
    /// A pair is emitted when the swept AABBs overlap in some shared cell,
    /// the vertex is not an endpoint of the edge, and (if `group_ids` are
    /// given) the primitives belong to different groups. Each pair appears
    /// exactly once regardless of how many cells it shares.
    pub fn get_edge_vertex_pairs(
        &mut self,
        edges: &[[usize; 2]],
        group_ids: Option<&[usize]>,
    ) -> Vec<EdgeVertexCandidate> {
        sort_items(&mut self.edge_items);
        sort_items(&mut self.vertex_items);

        let mut candidates = Vec::new();
        cross_buckets(&self.edge_items, &self.vertex_items, |edge, vertex| {
            let e = edge.id;
            let v = vertex.id;
            if edges[e].contains(&v) {
                return;
            }
            if let Some(groups) = group_ids {
                if groups[edges[e][0]] == groups[v] {
                    return;
                }
            }
            if edge.aabb.overlaps(&vertex.aabb) {
                candidates.push(EdgeVertexCandidate {
                    edge_index: e,
                    vertex_index: v,
                });
            }
        });
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// Candidate edge-edge pairs (unordered, no shared vertices).
    pub fn get_edge_edge_pairs(
        &mut self,
        edges: &[[usize; 2]],
        group_ids: Option<&[usize]>,
    ) -> Vec<EdgeEdgeCandidate> {
        sort_items(&mut self.edge_items);

        let mut candidates = Vec::new();
        self_cross_bucket(&self.edge_items, |item0, item1| {
            let (e0, e1) = (item0.id, item1.id);
            if edges[e0].iter().any(|v| edges[e1].contains(v)) {
                return;
            }
            if let Some(groups) = group_ids {
                if groups[edges[e0][0]] == groups[edges[e1][0]] {
                    return;
                }
            }
            if item0.aabb.overlaps(&item1.aabb) {
                candidates.push(EdgeEdgeCandidate::new(e0, e1));
            }
        });
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// Candidate edge-face pairs (the edge is not part of the face).
    pub fn get_edge_face_pairs(
        &mut self,
        edges: &[[usize; 2]],
        faces: &[[usize; 3]],
        group_ids: Option<&[usize]>,
    ) -> Vec<EdgeFaceCandidate> {
        sort_items(&mut self.edge_items);
        sort_items(&mut self.face_items);

        let mut candidates = Vec::new();
        cross_buckets(&self.edge_items, &self.face_items, |edge, face| {
            let e = edge.id;
            let f = face.id;
            if edges[e].iter().any(|v| faces[f].contains(v)) {
                return;
            }
            if let Some(groups) = group_ids {
                if groups[edges[e][0]] == groups[faces[f][0]] {
                    return;
                }
            }
            if edge.aabb.overlaps(&face.aabb) {
                candidates.push(EdgeFaceCandidate {
                    edge_index: e,
                    face_index: f,
                });
            }
        });
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }

    /// Candidate face-vertex pairs (the vertex is not a corner of the face).
    pub fn get_face_vertex_pairs(
        &mut self,
        faces: &[[usize; 3]],
        group_ids: Option<&[usize]>,
    ) -> Vec<FaceVertexCandidate> {
        sort_items(&mut self.face_items);
        sort_items(&mut self.vertex_items);

        let mut candidates = Vec::new();
        cross_buckets(&self.face_items, &self.vertex_items, |face, vertex| {
            let f = face.id;
            let v = vertex.id;
            if faces[f].contains(&v) {
                return;
            }
            if let Some(groups) = group_ids {
                if groups[faces[f][0]] == groups[v] {
                    return;
                }
            }
            if face.aabb.overlaps(&vertex.aabb) {
                candidates.push(FaceVertexCandidate {
                    face_index: f,
                    vertex_index: v,
                });
            }
        });
        candidates.sort_unstable();
        candidates.dedup();
        candidates
    }
}

/// Sort a bucket by `(key, id)`.
fn sort_items(items: &mut [HashItem]) {
    items.sort_unstable_by(|a, b| (a.key, a.id).cmp(&(b.key, b.id)));
}

/// Visit the cross product of two key-sorted buckets over runs of equal keys.
fn cross_buckets(a: &[HashItem], b: &[HashItem], mut visit: impl FnMut(&HashItem, &HashItem)) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (ka, kb) = (a[i].key, b[j].key);
        if ka < kb {
            i += 1;
        } else if ka > kb {
            j += 1;
        } else {
            let i_end = run_end(a, i);
            let j_end = run_end(b, j);
            for item_a in &a[i..i_end] {
                for item_b in &b[j..j_end] {
                    visit(item_a, item_b);
                }
            }
            i = i_end;
            j = j_end;
        }
    }
}

/// Visit unordered pairs within each equal-key run of one sorted bucket.
fn self_cross_bucket(items: &[HashItem], mut visit: impl FnMut(&HashItem, &HashItem)) {
    let mut i = 0;
    while i < items.len() {
        let end = run_end(items, i);
        for p in i..end {
            for q in (p + 1)..end {
                visit(&items[p], &items[q]);
            }
        }
        i = end;
    }
}

fn run_end(items: &[HashItem], start: usize) -> usize {
    let key = items[start].key;
    let mut end = start + 1;
    while end < items.len() && items[end].key == key {
        end += 1;
    }
    end
}
