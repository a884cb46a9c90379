//! Minimal OBJ triangle-mesh reading and edge derivation.

use std::path::Path;

use hashbrown::HashSet;
use nalgebra::DMatrix;

use crate::SceneError;

/// Parse an OBJ document into vertex positions and triangular faces.
///
/// Supports `v x y z` and `f` statements; face vertex references may carry
/// `/texture/normal` suffixes, which are ignored. Polygonal faces are fan
/// triangulated. Indices are 1-based per the format; negative (relative)
/// indices are not supported.
pub fn parse_obj(text: &str) -> Result<(DMatrix<f64>, Vec<[usize; 3]>), SceneError> {
    let mut positions: Vec<[f64; 3]> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();

    for (line_number, line) in text.lines().enumerate() {
        let mut fields = line.split_whitespace();
        match fields.next() {
            Some("v") => {
                let mut coordinate = |axis: &str| {
                    fields
                        .next()
                        .and_then(|s| s.parse::<f64>().ok())
                        .ok_or_else(|| {
                            SceneError::invalid_mesh(format!(
                                "line {}: vertex is missing the {axis} coordinate",
                                line_number + 1
                            ))
                        })
                };
                positions.push([coordinate("x")?, coordinate("y")?, coordinate("z")?]);
            }
            Some("f") => {
                let mut indices = Vec::new();
                for field in fields {
                    let reference = field.split('/').next().unwrap_or(field);
                    let index: usize = reference.parse().map_err(|_| {
                        SceneError::invalid_mesh(format!(
                            "line {}: bad face index {field:?}",
                            line_number + 1
                        ))
                    })?;
                    if index == 0 || index > positions.len() {
                        return Err(SceneError::invalid_mesh(format!(
                            "line {}: face index {index} out of range",
                            line_number + 1
                        )));
                    }
                    indices.push(index - 1);
                }
                if indices.len() < 3 {
                    return Err(SceneError::invalid_mesh(format!(
                        "line {}: face with fewer than 3 vertices",
                        line_number + 1
                    )));
                }
                for k in 1..indices.len() - 1 {
                    faces.push([indices[0], indices[k], indices[k + 1]]);
                }
            }
            _ => {}
        }
    }

    if positions.is_empty() {
        return Err(SceneError::invalid_mesh("no vertices"));
    }
    let vertices = DMatrix::from_fn(positions.len(), 3, |i, j| positions[i][j]);
    Ok((vertices, faces))
}

/// Read an OBJ triangle mesh from disk.
pub fn read_obj(path: &Path) -> Result<(DMatrix<f64>, Vec<[usize; 3]>), SceneError> {
    parse_obj(&std::fs::read_to_string(path)?)
}

/// The unique undirected edge set of a triangle mesh, sorted.
#[must_use]
pub fn edges_from_faces(faces: &[[usize; 3]]) -> Vec<[usize; 2]> {
    let mut set: HashSet<[usize; 2]> = HashSet::new();
    for &[a, b, c] in faces {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            set.insert([u.min(v), u.max(v)]);
        }
    }
    let mut edges: Vec<[usize; 2]> = set.into_iter().collect();
    edges.sort_unstable();
    edges
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const TETRAHEDRON: &str = "\
# a regular-ish tetrahedron
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
v 0.0 0.0 1.0
f 1 2 3
f 1 2 4
f 1 3 4
f 2 3 4
";

    #[test]
    fn test_parse_obj_tetrahedron() {
        let (vertices, faces) = parse_obj(TETRAHEDRON).unwrap();
        assert_eq!(vertices.nrows(), 4);
        assert_eq!(vertices[(1, 0)], 1.0);
        assert_eq!(faces.len(), 4);
        assert_eq!(faces[0], [0, 1, 2]);
    }

    #[test]
    fn test_parse_obj_with_texture_references_and_quads() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1/1/1 2/2/2 3/3/3 4/4/4\n";
        let (_, faces) = parse_obj(text).unwrap();
        // The quad fan-triangulates into two faces.
        assert_eq!(faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_parse_obj_rejects_bad_indices() {
        assert!(parse_obj("v 0 0 0\nf 1 2 3\n").is_err());
        assert!(parse_obj("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 0 1 2\n").is_err());
        assert!(parse_obj("").is_err());
    }

    #[test]
    fn test_edges_from_faces_dedups_shared_edges() {
        let (_, faces) = parse_obj(TETRAHEDRON).unwrap();
        let edges = edges_from_faces(&faces);
        // A tetrahedron has 6 unique edges despite 12 face-edge slots.
        assert_eq!(edges.len(), 6);
        assert!(edges.windows(2).all(|w| w[0] < w[1]));
    }
}
