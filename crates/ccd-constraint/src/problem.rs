//! The optimization problem interface consumed by the Newton solver.

use nalgebra::{DMatrix, DVector};

/// A smooth objective with collision awareness.
///
/// The solver holds fixed degrees of freedom at their starting values and
/// asks the problem for admissibility of trial points during line search
/// (`has_collisions` between the current and trial configurations).
pub trait OptimizationProblem {
    /// Number of optimization variables.
    fn num_vars(&self) -> usize;

    /// Which variables are held fixed (`num_vars` entries).
    fn is_dof_fixed(&self) -> &[bool];

    /// Initial iterate.
    fn starting_point(&self) -> DVector<f64>;

    /// Objective value, gradient, and Hessian at `x`.
    fn compute_objective(&mut self, x: &DVector<f64>) -> (f64, DVector<f64>, DMatrix<f64>);

    /// Objective value only. The default evaluates the full objective;
    /// implementers with a cheap value path should override it.
    fn eval_f(&mut self, x: &DVector<f64>) -> f64 {
        self.compute_objective(x).0
    }

    /// Whether moving from `x_t0` to `x_t1` produces a collision.
    fn has_collisions(&mut self, x_t0: &DVector<f64>, x_t1: &DVector<f64>) -> bool;

    /// Minimum contact distance at `x`, if the problem tracks one.
    fn compute_min_distance(&self, x: &DVector<f64>) -> Option<f64>;
}

/// Outcome of a solve.
#[derive(Debug, Clone)]
pub struct OptimizationResults {
    /// Final iterate.
    pub x: DVector<f64>,
    /// Objective value at the final iterate.
    pub minf: f64,
    /// Whether the gradient converged below the tolerance.
    pub success: bool,
    /// Newton iterations taken.
    pub iterations: usize,
}
