//! Barrier-guarded Newton solver over free degrees of freedom.

use nalgebra::{Cholesky, DMatrix, DVector};

use ccd_types::NewtonConfig;

use crate::line_search::line_search;
use crate::problem::{OptimizationProblem, OptimizationResults};

/// Evaluation and iteration counters for one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewtonStats {
    /// Objective value evaluations.
    pub num_fx: usize,
    /// Gradient evaluations.
    pub num_grad_fx: usize,
    /// Hessian evaluations.
    pub num_hessian_fx: usize,
    /// Collision (admissibility) checks during line search.
    pub num_collision_check: usize,
    /// Total line-search trials.
    pub ls_iterations: usize,
    /// Newton steps taken.
    pub newton_iterations: usize,
}

/// Newton's method with a positive-definite projection fallback and a
/// collision-aware line search.
///
/// The iteration runs on the free degrees of freedom only; fixed DoFs keep
/// their starting values. Each step solves `H Δx = -∇f` by Cholesky
/// factorization. When the factorization fails or the solution is not a
/// descent direction, the Hessian is lifted to positive definite by
/// doubling a diagonal shift (see [`make_matrix_positive_definite`]) and
/// the solve is retried; as a last resort the step falls back to steepest
/// descent.
#[derive(Debug, Clone)]
pub struct NewtonSolver {
    /// Solver settings.
    pub config: NewtonConfig,
    stats: NewtonStats,
}

impl Default for NewtonSolver {
    fn default() -> Self {
        Self::new(NewtonConfig::default())
    }
}

impl NewtonSolver {
    /// Create a solver with the given settings.
    #[must_use]
    pub fn new(config: NewtonConfig) -> Self {
        Self {
            config,
            stats: NewtonStats::default(),
        }
    }

    /// Counters from the most recent solve.
    #[must_use]
    pub fn stats(&self) -> &NewtonStats {
        &self.stats
    }

    /// Minimize the problem from its starting point.
    pub fn solve<P: OptimizationProblem>(&mut self, problem: &mut P) -> OptimizationResults {
        let x0 = problem.starting_point();
        self.solve_from(problem, &x0)
    }

    /// Minimize the problem from `x0`.
    pub fn solve_from<P: OptimizationProblem>(
        &mut self,
        problem: &mut P,
        x0: &DVector<f64>,
    ) -> OptimizationResults {
        self.stats = NewtonStats::default();
        let config = self.config.clone();
        let free_dof = init_free_dof(problem.is_dof_fixed());

        let mut x = x0.clone();
        if free_dof.is_empty() {
            let minf = problem.eval_f(&x);
            self.stats.num_fx += 1;
            return OptimizationResults {
                x,
                minf,
                success: true,
                iterations: 0,
            };
        }
        let mut success = false;

        for _ in 0..config.max_iterations {
            let (fx, grad, hess) = problem.compute_objective(&x);
            self.stats.num_fx += 1;
            self.stats.num_grad_fx += 1;
            self.stats.num_hessian_fx += 1;

            let grad_free = grad.select_rows(free_dof.iter());
            if grad_free.amax() <= config.absolute_tolerance {
                success = true;
                break;
            }
            let hess_free = hess
                .select_rows(free_dof.iter())
                .select_columns(free_dof.iter());

            let (direction_free, _mu) = self.compute_direction(&grad_free, &hess_free, true);

            // Scatter the free-DoF direction back to the full space.
            let mut direction = DVector::zeros(x.len());
            for (k, &i) in free_dof.iter().enumerate() {
                direction[i] = direction_free[k];
            }

            let Some(step_length) =
                line_search(problem, &mut self.stats, &x, &direction, fx, &grad, &config)
            else {
                tracing::debug!(
                    iteration = self.stats.newton_iterations,
                    "line search failed to find an admissible step"
                );
                break;
            };

            let step = step_length * &direction;
            x += &step;
            self.stats.newton_iterations += 1;
            tracing::trace!(
                iteration = self.stats.newton_iterations,
                step_length,
                fx,
                "newton step"
            );

            if step.norm() < config.min_step_length {
                break;
            }
        }

        let minf = problem.eval_f(&x);
        self.stats.num_fx += 1;
        tracing::debug!(stats = ?self.stats, minf, success, "newton solve finished");
        OptimizationResults {
            x,
            minf,
            success,
            iterations: self.stats.newton_iterations,
        }
    }

    /// Solve `H Δx = -∇f` for the Newton direction.
    ///
    /// When `make_psd` is set and the factorization fails or produces an
    /// ascent direction, the Hessian is projected to positive definite by
    /// diagonal lifting and the solve retried. Returns the direction and
    /// the diagonal shift that was needed (0 when none).
    #[must_use]
    pub fn compute_direction(
        &self,
        gradient: &DVector<f64>,
        hessian: &DMatrix<f64>,
        make_psd: bool,
    ) -> (DVector<f64>, f64) {
        let solve = |h: &DMatrix<f64>| {
            Cholesky::new(h.clone()).map(|factorization| factorization.solve(&(-gradient)))
        };

        let mut mu = 0.0;
        let mut direction = solve(hessian);
        let is_descent = |d: &DVector<f64>| gradient.dot(d) < 0.0;

        if make_psd && !direction.as_ref().is_some_and(|d| is_descent(d)) {
            let mut lifted = hessian.clone();
            mu = make_matrix_positive_definite(&mut lifted);
            tracing::debug!(mu, "hessian projected to positive definite");
            direction = solve(&lifted);
        }

        match direction {
            Some(d) if is_descent(&d) => (d, mu),
            _ => {
                tracing::warn!("newton direction is not a descent direction, using -gradient");
                (-gradient.clone(), mu)
            }
        }
    }
}

/// Indices of the free degrees of freedom.
#[must_use]
pub fn init_free_dof(is_dof_fixed: &[bool]) -> Vec<usize> {
    is_dof_fixed
        .iter()
        .enumerate()
        .filter_map(|(i, &fixed)| (!fixed).then_some(i))
        .collect()
}

/// Make `a` positive definite by diagonal lifting, in place.
///
/// Doubles a shift `mu` starting from `1e-9` until `a + mu I` admits a
/// Cholesky factorization, writes the lifted matrix back into `a`, and
/// returns the shift actually added (0 when `a` already factorizes).
pub fn make_matrix_positive_definite(a: &mut DMatrix<f64>) -> f64 {
    if Cholesky::new(a.clone()).is_some() {
        return 0.0;
    }
    let n = a.nrows();
    let identity = DMatrix::<f64>::identity(n, n);
    let mut mu = 1e-9;
    loop {
        let lifted = &*a + &identity * mu;
        if Cholesky::new(lifted.clone()).is_some() {
            *a = lifted;
            return mu;
        }
        mu *= 2.0;
        if !mu.is_finite() {
            tracing::error!("diagonal lifting diverged without a positive definite matrix");
            *a = lifted;
            return mu;
        }
    }
}

/// Project a symmetric matrix onto the positive semi-definite cone.
///
/// Negative eigenvalues are clamped to zero and the matrix rebuilt from
/// its eigenvectors; an already-PSD matrix is returned unchanged.
#[must_use]
pub fn project_to_psd(a: &DMatrix<f64>) -> DMatrix<f64> {
    let eigen = a.clone().symmetric_eigen();
    if eigen.eigenvalues.iter().all(|&lambda| lambda >= 0.0) {
        return a.clone();
    }
    let clamped = DVector::from_iterator(
        eigen.eigenvalues.len(),
        eigen.eigenvalues.iter().map(|&lambda| lambda.max(0.0)),
    );
    &eigen.eigenvectors * DMatrix::from_diagonal(&clamped) * eigen.eigenvectors.transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_init_free_dof() {
        assert_eq!(init_free_dof(&[false, true, false]), vec![0, 2]);
        assert_eq!(init_free_dof(&[true, true]), Vec::<usize>::new());
    }

    #[test]
    fn test_project_to_psd_clamps_negative_eigenvalues() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 0.0, 0.0, -3.0]);
        let p = project_to_psd(&a);
        let eigen = p.clone().symmetric_eigen();
        assert!(eigen.eigenvalues.iter().all(|&l| l >= -1e-12));
        // The positive part is preserved.
        assert!((p[(0, 0)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_psd_matrix_needs_no_lift() {
        let mut a = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 2.0]);
        assert_eq!(make_matrix_positive_definite(&mut a), 0.0);
        assert_eq!(a[(0, 0)], 2.0);
    }
}
