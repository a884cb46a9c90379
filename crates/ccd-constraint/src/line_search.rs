//! Step-length search along a descent direction.

use nalgebra::DVector;

use ccd_types::NewtonConfig;

use crate::newton::NewtonStats;
use crate::problem::OptimizationProblem;

/// Find a step length `s ∈ (0, 1]` along `direction` from `x`.
///
/// A step is accepted when it satisfies the decrease rule - Armijo
/// sufficient decrease `f(x + s d) ≤ f(x) + c₁ s ∇f·d` when
/// `armijo_coeff > 0`, plain decrease `f(x + s d) < f(x)` otherwise - and
/// the admissibility predicate: the move from `x` must not produce a
/// collision. The step is halved until both hold or its length drops below
/// `min_step_length`, in which case the search fails.
pub fn line_search<P: OptimizationProblem>(
    problem: &mut P,
    stats: &mut NewtonStats,
    x: &DVector<f64>,
    direction: &DVector<f64>,
    fx: f64,
    grad_fx: &DVector<f64>,
    config: &NewtonConfig,
) -> Option<f64> {
    let wolfe1 = config.armijo_coeff * direction.dot(grad_fx);
    let direction_norm = direction.norm();

    let mut step_length = 1.0_f64;
    let mut step_norm = direction_norm;
    while step_norm >= config.min_step_length {
        let xi = x + step_length * direction;

        stats.num_fx += 1;
        let f_xi = problem.eval_f(&xi);
        let decrease_ok = if config.armijo_coeff > 0.0 {
            f_xi <= fx + step_length * wolfe1
        } else {
            f_xi < fx
        };

        stats.num_collision_check += 1;
        let admissible = !problem.has_collisions(x, &xi);

        stats.ls_iterations += 1;
        tracing::trace!(step_length, f_xi, fx, decrease_ok, admissible, "line search trial");

        if decrease_ok && admissible {
            return Some(step_length);
        }
        step_length /= 2.0;
        step_norm = step_length * direction_norm;
    }

    tracing::debug!(
        step_norm,
        min_step_length = config.min_step_length,
        "line search exhausted"
    );
    None
}
