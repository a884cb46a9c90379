//! Newton solver tests: convergence, direction solve, SPD projection.

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use ccd_constraint::{
    make_matrix_positive_definite, NewtonSolver, OptimizationProblem, OptimizationResults,
};
use ccd_types::NewtonConfig;

/// `f(x) = ||x||^2 / 2` with optional fixed DoFs and a collision switch.
struct QuadraticProblem {
    x0: DVector<f64>,
    is_dof_fixed: Vec<bool>,
    always_colliding: bool,
}

impl QuadraticProblem {
    fn new(num_vars: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            x0: DVector::from_fn(num_vars, |_, _| rng.random_range(-1.0..1.0)),
            is_dof_fixed: vec![false; num_vars],
            always_colliding: false,
        }
    }
}

impl OptimizationProblem for QuadraticProblem {
    fn num_vars(&self) -> usize {
        self.x0.len()
    }

    fn is_dof_fixed(&self) -> &[bool] {
        &self.is_dof_fixed
    }

    fn starting_point(&self) -> DVector<f64> {
        self.x0.clone()
    }

    fn compute_objective(&mut self, x: &DVector<f64>) -> (f64, DVector<f64>, DMatrix<f64>) {
        (
            x.norm_squared() / 2.0,
            x.clone(),
            DMatrix::identity(x.len(), x.len()),
        )
    }

    fn has_collisions(&mut self, _x_t0: &DVector<f64>, _x_t1: &DVector<f64>) -> bool {
        self.always_colliding
    }

    fn compute_min_distance(&self, _x: &DVector<f64>) -> Option<f64> {
        None
    }
}

fn solve_quadratic(num_vars: usize, seed: u64) -> (OptimizationResults, NewtonSolver) {
    let mut problem = QuadraticProblem::new(num_vars, seed);
    let mut solver = NewtonSolver::new(NewtonConfig::default());
    let results = solver.solve(&mut problem);
    (results, solver)
}

#[test]
fn test_quadratic_converges_in_two_iterations() {
    for num_vars in [1, 10, 100] {
        let (results, _) = solve_quadratic(num_vars, 0x1234 + num_vars as u64);
        assert!(results.success, "{num_vars} variables should converge");
        assert!(results.iterations <= 2, "{num_vars} variables took {} iterations", results.iterations);
        assert!(results.x.norm() <= 1e-6);
        assert_relative_eq!(results.minf, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_armijo_rule_also_converges() {
    let mut problem = QuadraticProblem::new(50, 0xa0b1);
    let mut solver = NewtonSolver::new(NewtonConfig {
        armijo_coeff: 1e-4,
        ..Default::default()
    });
    let results = solver.solve(&mut problem);
    assert!(results.success);
    assert!(results.x.norm() <= 1e-6);
}

#[test]
fn test_fixed_dofs_stay_at_start() {
    let mut problem = QuadraticProblem::new(10, 0xfee1);
    problem.is_dof_fixed[3] = true;
    problem.is_dof_fixed[7] = true;
    let expected_3 = problem.x0[3];
    let expected_7 = problem.x0[7];

    let mut solver = NewtonSolver::default();
    let results = solver.solve(&mut problem);
    assert!(results.success);
    assert_eq!(results.x[3], expected_3);
    assert_eq!(results.x[7], expected_7);
    // Free DoFs still reach the minimum.
    for i in (0..10).filter(|&i| i != 3 && i != 7) {
        assert!(results.x[i].abs() <= 1e-6);
    }
}

#[test]
fn test_collision_blocks_every_step() {
    let mut problem = QuadraticProblem::new(5, 0xc0ff);
    problem.always_colliding = true;
    let mut solver = NewtonSolver::default();
    let results = solver.solve(&mut problem);
    assert!(!results.success, "no admissible step exists");
    assert_eq!(results.iterations, 0);
    assert_eq!(results.x, problem.x0);
    assert!(solver.stats().num_collision_check > 0);
}

#[test]
fn test_compute_direction_solves_the_quadratic_model() {
    // f = x^2: gradient 2x, hessian 2I. The Newton step lands on zero.
    let mut rng = StdRng::seed_from_u64(0xd17);
    let num_vars = 1000;
    let x = DVector::from_fn(num_vars, |_, _| rng.random_range(-1.0..1.0));
    let gradient = 2.0 * &x;
    let hessian = DMatrix::<f64>::identity(num_vars, num_vars) * 2.0;

    let solver = NewtonSolver::default();
    let (direction, mu) = solver.compute_direction(&gradient, &hessian, false);
    assert_eq!(mu, 0.0);
    assert!((x + direction).norm_squared() <= 1e-20);
}

#[test]
fn test_compute_direction_projects_indefinite_hessian() {
    let gradient = DVector::from_vec(vec![1.0, -2.0]);
    let hessian = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -1.0]);
    let solver = NewtonSolver::default();
    let (direction, mu) = solver.compute_direction(&gradient, &hessian, true);
    assert!(mu > 0.0, "an indefinite hessian needs a diagonal lift");
    assert!(gradient.dot(&direction) < 0.0, "result must be a descent direction");
}

#[test]
fn test_make_matrix_positive_definite_invariants() {
    let mut rng = StdRng::seed_from_u64(0x5bd);
    let n = 50;
    let r = DMatrix::from_fn(n, n, |_, _| rng.random_range(-1.0..1.0));
    let mut a: DMatrix<f64> = 0.5 * (&r + r.transpose());
    let original = a.clone();

    let mu = make_matrix_positive_definite(&mut a);
    assert!(mu > 0.0, "a random symmetric matrix is almost surely indefinite");
    assert_ne!(a, original, "the matrix is modified in place");

    let eigenvalues = a.clone().symmetric_eigen().eigenvalues;
    for lambda in eigenvalues.iter() {
        assert!(*lambda >= -1e-12, "eigenvalue {lambda} must be non-negative");
    }
    // The lift is exactly mu on the diagonal.
    assert_relative_eq!(a[(0, 0)] - original[(0, 0)], mu, epsilon = 1e-12);
}
