//! Scene JSON deserialization and rigid body construction.

use std::path::Path;

use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use ccd_types::{
    degrees_to_radians, CcdError, ConstraintConfig, NewtonConfig, Pose, RigidBody,
    RigidBodyAssembler,
};

use crate::mesh::{edges_from_faces, read_obj};
use crate::SceneError;

/// A loaded scene: the assembled bodies plus settings.
#[derive(Debug, Clone)]
pub struct Scene {
    /// The assembled rigid bodies.
    pub bodies: RigidBodyAssembler,
    /// Collision constraint settings.
    pub constraint_settings: ConstraintConfig,
    /// Newton solver settings.
    pub solver_settings: NewtonConfig,
}

#[derive(Debug, Deserialize)]
struct SceneJson {
    rigid_bodies: Vec<RigidBodyJson>,
    #[serde(default)]
    constraint_settings: ConstraintConfig,
    #[serde(default)]
    solver_settings: NewtonConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RigidBodyJson {
    mesh: String,
    vertices: Vec<Vec<f64>>,
    faces: Vec<Vec<usize>>,
    edges: Vec<Vec<usize>>,
    density: f64,
    is_dof_fixed: Vec<bool>,
    oriented: bool,
    position: Vec<f64>,
    rotation: Vec<f64>,
    linear_velocity: Vec<f64>,
    angular_velocity: Vec<f64>,
}

impl Default for RigidBodyJson {
    fn default() -> Self {
        Self {
            mesh: String::new(),
            vertices: Vec::new(),
            faces: Vec::new(),
            edges: Vec::new(),
            density: 1.0,
            is_dof_fixed: vec![false; 6],
            oriented: false,
            position: vec![0.0; 3],
            rotation: vec![0.0; 3],
            linear_velocity: vec![0.0; 3],
            angular_velocity: vec![0.0; 3],
        }
    }
}

/// Read a scene from a JSON string. Relative `mesh` paths resolve against
/// `mesh_root` when given, the working directory otherwise.
pub fn read_scene_str(json: &str, mesh_root: Option<&Path>) -> Result<Scene, SceneError> {
    let scene: SceneJson = serde_json::from_str(json)?;
    if scene.rigid_bodies.is_empty() {
        return Err(CcdError::invalid_scene("scene has no rigid bodies").into());
    }

    let mut bodies = Vec::with_capacity(scene.rigid_bodies.len());
    let mut scene_dim: Option<usize> = None;
    for body_json in &scene.rigid_bodies {
        let body = build_body(body_json, mesh_root, &mut scene_dim)?;
        bodies.push(body);
    }

    scene.constraint_settings.validate()?;
    scene.solver_settings.validate()?;

    Ok(Scene {
        bodies: RigidBodyAssembler::from_bodies(bodies)?,
        constraint_settings: scene.constraint_settings,
        solver_settings: scene.solver_settings,
    })
}

/// Read a scene from a JSON file; `mesh` paths resolve against the scene
/// file's directory.
pub fn read_scene(path: &Path) -> Result<Scene, SceneError> {
    let json = std::fs::read_to_string(path)?;
    read_scene_str(&json, path.parent())
}

fn build_body(
    json: &RigidBodyJson,
    mesh_root: Option<&Path>,
    scene_dim: &mut Option<usize>,
) -> Result<RigidBody, SceneError> {
    let (vertices, mut faces, edges) = if json.mesh.is_empty() {
        (
            vertices_from_rows(&json.vertices)?,
            index_rows::<3>(&json.faces, "faces")?,
            index_rows::<2>(&json.edges, "edges")?,
        )
    } else {
        let path = mesh_root.map_or_else(
            || Path::new(&json.mesh).to_path_buf(),
            |root| root.join(&json.mesh),
        );
        let (vertices, faces) = read_obj(&path)?;
        let edges = edges_from_faces(&faces);
        (vertices, faces, edges)
    };

    let dim = vertices.ncols();
    if dim != 2 && dim != 3 {
        return Err(CcdError::UnsupportedDimension(dim).into());
    }
    match scene_dim {
        None => *scene_dim = Some(dim),
        Some(scene_dim) if *scene_dim != dim => {
            tracing::error!("mixing 2D and 3D bodies is not supported");
            return Err(CcdError::MixedDimensions.into());
        }
        Some(_) => {}
    }

    if dim == 2 && !faces.is_empty() {
        tracing::warn!("ignoring faces of a 2D rigid body");
        faces.clear();
    }

    let angular_dim = Pose::angular_dim(dim);
    let ndof = Pose::dim_to_ndof(dim);

    let pose = Pose::new(
        take_components(&json.position, dim, "position")?,
        degrees_to_radians(&take_components(&json.rotation, angular_dim, "rotation")?),
    );
    let velocity = Pose::new(
        take_components(&json.linear_velocity, dim, "linear_velocity")?,
        degrees_to_radians(&take_components(
            &json.angular_velocity,
            angular_dim,
            "angular_velocity",
        )?),
    );

    if json.is_dof_fixed.len() < ndof {
        return Err(CcdError::invalid_scene(format!(
            "is_dof_fixed has {} entries, expected at least {ndof}",
            json.is_dof_fixed.len()
        ))
        .into());
    }
    let is_dof_fixed = json.is_dof_fixed[..ndof].to_vec();

    RigidBody::new(
        vertices,
        edges,
        faces,
        pose,
        velocity,
        json.density,
        is_dof_fixed,
        json.oriented,
    )
    .map_err(SceneError::from)
}

fn vertices_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>, SceneError> {
    let Some(first) = rows.first() else {
        return Err(CcdError::invalid_scene("body has no vertices and no mesh").into());
    };
    let dim = first.len();
    if rows.iter().any(|row| row.len() != dim) {
        return Err(CcdError::invalid_scene("ragged vertex rows").into());
    }
    Ok(DMatrix::from_fn(rows.len(), dim, |i, j| rows[i][j]))
}

fn index_rows<const N: usize>(
    rows: &[Vec<usize>],
    what: &str,
) -> Result<Vec<[usize; N]>, SceneError> {
    rows.iter()
        .map(|row| {
            <[usize; N]>::try_from(row.as_slice()).map_err(|_| {
                CcdError::invalid_scene(format!(
                    "{what} rows must have {N} indices, got {}",
                    row.len()
                ))
                .into()
            })
        })
        .collect()
}

/// The first `n` components of a JSON vector (longer inputs are truncated,
/// matching fixed-width scene files that always write 3 components).
fn take_components(values: &[f64], n: usize, what: &str) -> Result<DVector<f64>, SceneError> {
    if values.len() < n {
        return Err(CcdError::invalid_scene(format!(
            "{what} has {} components, expected at least {n}",
            values.len()
        ))
        .into());
    }
    Ok(DVector::from_row_slice(&values[..n]))
}
