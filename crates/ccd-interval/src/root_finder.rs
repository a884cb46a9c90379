//! Branch-and-bound earliest-root search over interval boxes.
//!
//! Coordinate 0 of the search box is time: among all boxes of width below
//! the tolerance that may contain a root, the search returns the one with
//! the smallest lower bound on coordinate 0. Boxes are explored depth-first
//! with the lower half of each bisection pushed last, so earlier times are
//! examined first and later boxes can be pruned against the best root found
//! so far.

use nalgebra::SVector;

use crate::rounding::RoundingGuard;
use crate::Interval;

/// Whether zero is contained in every component of the box image.
fn zero_in_all<const N: usize>(y: &SVector<Interval, N>) -> bool {
    y.iter().all(Interval::zero_in)
}

/// Find the earliest root of `f` inside the box `x0`.
///
/// Searches for a box `x* ⊆ x0` of componentwise width at most `tol` with
/// `0 ∈ f(x*)`, minimizing `x*[0].lo()` (coordinate 0 is time). A candidate
/// leaf is only recorded when `constraint(x*)` holds, and a subtree is
/// abandoned as soon as `is_domain_valid` fails for its root box, so every
/// reported root descends from a chain of domain-valid ancestors.
///
/// `max_iterations` caps the number of boxes popped from the work stack.
/// When the cap is exceeded the search aborts and reports no root - the
/// conservative answer for collision queries, where a missed root must not
/// be silently replaced by an unconverged one.
///
/// If the very start of the box (the origin corner, one tolerance wide)
/// already contains a root, the time tolerance is divided by 100 before
/// searching; otherwise a root pinned at `t = 0` would mask all bisection
/// progress.
///
/// Returns the earliest root box, or `None` if there is no root (or the
/// iteration cap was hit).
pub fn interval_root_finder<const N: usize>(
    f: impl Fn(&SVector<Interval, N>) -> SVector<Interval, N>,
    constraint: impl Fn(&SVector<Interval, N>) -> bool,
    is_domain_valid: impl Fn(&SVector<Interval, N>) -> bool,
    x0: &SVector<Interval, N>,
    tol: &SVector<f64, N>,
    max_iterations: usize,
) -> Option<SVector<Interval, N>> {
    let _rounding = RoundingGuard::acquire();

    let mut tol = *tol;

    // A root at the very origin of the domain would stall the earliest-root
    // bisection; tighten the time tolerance to resolve it.
    let origin = SVector::<Interval, N>::from_fn(|i, _| Interval::new(0.0, tol[i]));
    if zero_in_all(&f(&origin)) {
        tol[0] /= 1e2;
    }

    let mut earliest: Option<SVector<Interval, N>> = None;
    let mut stack = vec![*x0];

    let mut iterations = 0usize;
    while let Some(x) = stack.pop() {
        iterations += 1;
        if iterations > max_iterations {
            return None;
        }

        // Skip any box that cannot be earlier than the best root found.
        if let Some(e) = &earliest {
            if x[0].lo() >= e[0].lo() {
                continue;
            }
        }

        if !is_domain_valid(&x) {
            continue;
        }

        let y = f(&x);
        if !zero_in_all(&y) {
            continue;
        }

        let widths: SVector<f64, N> = x.map(|xi| xi.width());
        if (0..N).all(|i| widths[i] <= tol[i]) {
            if constraint(&x) {
                earliest = Some(x);
            }
            continue;
        }

        // Bisect the axis with the largest width relative to its tolerance,
        // among axes that have not yet converged.
        let mut split = None;
        for i in 0..N {
            let wider = match split {
                None => true,
                Some(j) => widths[i] * tol[j] > widths[j] * tol[i],
            };
            if widths[i] > tol[i] && wider {
                split = Some(i);
            }
        }
        let Some(i) = split else {
            continue;
        };

        let (lo_half, hi_half) = x[i].bisect();
        // Push the upper half first so the lower half is examined first.
        let mut half = x;
        half[i] = hi_half;
        stack.push(half);
        half[i] = lo_half;
        stack.push(half);
    }

    earliest
}

/// One-dimensional convenience wrapper around [`interval_root_finder`].
///
/// The domain-validity predicate is trivially true; the constraint predicate
/// still applies.
pub fn interval_root_finder_1d(
    f: impl Fn(Interval) -> Interval,
    constraint: impl Fn(Interval) -> bool,
    x0: Interval,
    tol: f64,
    max_iterations: usize,
) -> Option<Interval> {
    interval_root_finder::<1>(
        |x| SVector::<Interval, 1>::new(f(x[0])),
        |x| constraint(x[0]),
        |_| true,
        &SVector::<Interval, 1>::new(x0),
        &SVector::<f64, 1>::new(tol),
        max_iterations,
    )
    .map(|x| x[0])
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const MAX_ITERATIONS: usize = 1_000_000;

    #[test]
    fn test_finds_simple_root() {
        // x^2 - 1 has its only root in [0, 2] at x = 1.
        let root = interval_root_finder_1d(
            |x| x * x - 1.0,
            |_| true,
            Interval::new(0.0, 2.0),
            1e-8,
            MAX_ITERATIONS,
        )
        .expect("root should be found");
        assert_relative_eq!(root.lo(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_no_root_reported_when_none_exists() {
        let root = interval_root_finder_1d(
            |x| x * x + 1.0,
            |_| true,
            Interval::new(-2.0, 2.0),
            1e-8,
            MAX_ITERATIONS,
        );
        assert!(root.is_none());
    }

    #[test]
    fn test_earliest_of_two_roots() {
        // (x - 0.25)(x - 0.75): both roots in [0, 1]; the earliest wins.
        let root = interval_root_finder_1d(
            |x| (x - 0.25) * (x - 0.75),
            |_| true,
            Interval::UNIT,
            1e-8,
            MAX_ITERATIONS,
        )
        .expect("root should be found");
        assert_relative_eq!(root.lo(), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn test_constraint_rejects_earlier_root() {
        // Same function, but the constraint only admits boxes past 0.5.
        let root = interval_root_finder_1d(
            |x| (x - 0.25) * (x - 0.75),
            |x| x.lo() > 0.5,
            Interval::UNIT,
            1e-8,
            MAX_ITERATIONS,
        )
        .expect("constrained root should be found");
        assert_relative_eq!(root.lo(), 0.75, epsilon = 1e-6);
    }

    #[test]
    fn test_root_at_domain_origin() {
        // f(x) = x has its root exactly at the start of the domain. The
        // origin preflight tightens the tolerance instead of stalling.
        let root = interval_root_finder_1d(
            |x| x,
            |_| true,
            Interval::UNIT,
            1e-6,
            MAX_ITERATIONS,
        )
        .expect("root at origin should be found");
        assert!(root.lo() <= 1e-8);
    }

    #[test]
    fn test_iteration_cap_aborts_conservatively() {
        let root = interval_root_finder_1d(
            |x| x * x - 1.0,
            |_| true,
            Interval::new(0.0, 2.0),
            1e-12,
            4,
        );
        assert!(root.is_none(), "exceeding the cap must report no root");
    }

    #[test]
    fn test_two_dimensional_root() {
        // f(t, a) = (t - a, t + a - 1) vanishes at t = a = 0.5.
        let root = interval_root_finder::<2>(
            |x| SVector::<Interval, 2>::new(x[0] - x[1], x[0] + x[1] - 1.0),
            |_| true,
            |_| true,
            &SVector::<Interval, 2>::new(Interval::UNIT, Interval::UNIT),
            &SVector::<f64, 2>::new(1e-8, 1e-8),
            MAX_ITERATIONS,
        )
        .expect("2-d root should be found");
        assert_relative_eq!(root[0].lo(), 0.5, epsilon = 1e-6);
        assert_relative_eq!(root[1].lo(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_domain_validity_prunes_subtree() {
        // The root at t = a = 0.5 is excluded by the domain predicate; with
        // the whole diagonal band invalid there is no admissible root.
        let root = interval_root_finder::<2>(
            |x| SVector::<Interval, 2>::new(x[0] - x[1], x[0] + x[1] - 1.0),
            |_| true,
            |x| x[0].hi() + x[1].hi() < 0.9,
            &SVector::<Interval, 2>::new(Interval::UNIT, Interval::UNIT),
            &SVector::<f64, 2>::new(1e-8, 1e-8),
            MAX_ITERATIONS,
        );
        assert!(root.is_none());
    }
}
