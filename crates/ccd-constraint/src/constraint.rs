//! The capability set shared by collision constraints.

use nalgebra::{DMatrix, DVector};

use ccd_types::{ConstraintConfig, Result};

/// A set of collision constraints over per-vertex displacements.
///
/// Geometry enters through [`initialize`](Self::initialize): vertex rest
/// positions `V`, edges, and optional collision groups, together with the
/// step displacements `U` used to seed the broad phase. Evaluation methods
/// then take the current displacements and return one value (row) per
/// constraint.
///
/// This is a dispatch interface, not a base class: the solver takes any
/// `&dyn CollisionConstraint` (or a generic parameter) and never needs to
/// know which formulation it is driving.
pub trait CollisionConstraint {
    /// Collect the constraint set for the step `V → V + U`.
    fn initialize(
        &mut self,
        vertices: &DMatrix<f64>,
        edges: &[[usize; 2]],
        group_ids: Option<&[usize]>,
        displacements: &DMatrix<f64>,
    ) -> Result<()>;

    /// Number of constraint rows.
    fn number_of_constraints(&self) -> usize;

    /// Constraint values at the given displacements.
    fn compute_constraints(&self, displacements: &DMatrix<f64>) -> DVector<f64>;

    /// Jacobian of the constraints with respect to the flattened
    /// displacement vector (rows = constraints, columns = `2 * num_vertices`).
    fn compute_constraints_jacobian(&self, displacements: &DMatrix<f64>) -> DMatrix<f64>;

    /// Per-constraint Hessians with respect to the flattened displacement
    /// vector.
    fn compute_constraints_hessian(&self, displacements: &DMatrix<f64>) -> Vec<DMatrix<f64>>;

    /// Whether the step `V → V + U` produces an impact.
    fn has_collisions(&self, displacements: &DMatrix<f64>) -> bool;

    /// Minimum contact distance at the given displacements, if the
    /// formulation defines one.
    fn min_distance(&self, displacements: &DMatrix<f64>) -> Option<f64>;

    /// The settings the constraint was built with.
    fn settings(&self) -> &ConstraintConfig;
}
