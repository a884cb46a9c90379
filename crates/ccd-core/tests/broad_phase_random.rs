//! Randomized broad-phase properties: determinism, completeness, soundness.

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ccd_core::{Aabb, HashGrid};
use ccd_types::EdgeVertexCandidate;

/// Random 2D scene: `n` vertices with displacements, plus `n / 2` edges
/// over distinct vertices.
fn random_scene(seed: u64, n: usize) -> (DMatrix<f64>, DMatrix<f64>, Vec<[usize; 2]>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let vertices_t0 = DMatrix::from_fn(n, 2, |_, _| rng.random_range(-5.0..5.0));
    let displacements = DMatrix::from_fn(n, 2, |_, _| rng.random_range(-1.0..1.0));
    let vertices_t1 = &vertices_t0 + displacements;

    let mut edges = Vec::new();
    for _ in 0..n / 2 {
        let a = rng.random_range(0..n);
        let b = rng.random_range(0..n);
        if a != b {
            edges.push([a.min(b), a.max(b)]);
        }
    }
    edges.sort_unstable();
    edges.dedup();
    (vertices_t0, vertices_t1, edges)
}

fn swept_vertex_aabb(v0: &DMatrix<f64>, v1: &DMatrix<f64>, v: usize) -> Aabb {
    Aabb::containing(&[v0.row(v).transpose(), v1.row(v).transpose()], 0.0)
}

fn swept_edge_aabb(v0: &DMatrix<f64>, v1: &DMatrix<f64>, e: [usize; 2]) -> Aabb {
    swept_vertex_aabb(v0, v1, e[0]).union(&swept_vertex_aabb(v0, v1, e[1]))
}

fn grid_candidates(
    v0: &DMatrix<f64>,
    v1: &DMatrix<f64>,
    edges: &[[usize; 2]],
) -> Vec<EdgeVertexCandidate> {
    let mut grid = HashGrid::default();
    grid.resize_for_displacements(v0, v1, edges, 0.0);
    grid.add_vertices(v0, v1, 0.0).expect("insertion should succeed");
    grid.add_edges(v0, v1, edges, 0.0)
        .expect("insertion should succeed");
    grid.get_edge_vertex_pairs(edges, None)
}

/// Inserting the same scene twice yields identical candidate sequences
/// (parallel insertion order does not leak into the result).
#[test]
fn test_candidates_are_deterministic() {
    for seed in [7, 42, 1234] {
        let (v0, v1, edges) = random_scene(seed, 100);
        let first = grid_candidates(&v0, &v1, &edges);
        let second = grid_candidates(&v0, &v1, &edges);
        assert_eq!(first, second, "seed {seed}");
        assert!(!first.is_empty(), "seed {seed} should produce candidates");
    }
}

/// Every pair with overlapping swept AABBs appears exactly once, and every
/// reported pair overlaps.
#[test]
fn test_candidates_match_brute_force() {
    for seed in [3, 99] {
        let (v0, v1, edges) = random_scene(seed, 80);
        let candidates = grid_candidates(&v0, &v1, &edges);

        // Soundness + uniqueness.
        let mut sorted = candidates.clone();
        sorted.dedup();
        assert_eq!(sorted.len(), candidates.len(), "no duplicate candidates");
        for c in &candidates {
            assert!(!edges[c.edge_index].contains(&c.vertex_index));
            let ea = swept_edge_aabb(&v0, &v1, edges[c.edge_index]);
            let va = swept_vertex_aabb(&v0, &v1, c.vertex_index);
            assert!(ea.overlaps(&va), "reported pair must overlap");
        }

        // Completeness against the O(n^2) reference.
        let mut expected = Vec::new();
        for (e, edge) in edges.iter().enumerate() {
            let ea = swept_edge_aabb(&v0, &v1, *edge);
            for v in 0..v0.nrows() {
                if edge.contains(&v) {
                    continue;
                }
                if ea.overlaps(&swept_vertex_aabb(&v0, &v1, v)) {
                    expected.push(EdgeVertexCandidate {
                        edge_index: e,
                        vertex_index: v,
                    });
                }
            }
        }
        expected.sort_unstable();
        assert_eq!(candidates, expected, "seed {seed}");
    }
}
