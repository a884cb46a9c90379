//! Point-to-edge distance, generic over the autodiff scalar.

use num_dual::DualNum;

/// Squared distance from point `a` to the segment `(b, c)` in 2D.
///
/// The projection parameter is clamped to the segment, so outside the
/// segment's span this is the squared distance to the nearest endpoint.
/// Clamping branches on the real part, which keeps the derivative piecewise
/// correct. A degenerate (zero-length) edge reduces to point-point distance.
pub fn point_to_edge_sq_distance<D: DualNum<f64> + Copy>(a: [D; 2], b: [D; 2], c: [D; 2]) -> D {
    let e = [c[0] - b[0], c[1] - b[1]];
    let ap = [a[0] - b[0], a[1] - b[1]];
    let e_sq = e[0] * e[0] + e[1] * e[1];

    let mut t = if e_sq.re() > 0.0 {
        (ap[0] * e[0] + ap[1] * e[1]) / e_sq
    } else {
        D::zero()
    };
    if t.re() <= 0.0 {
        t = D::zero();
    } else if t.re() >= 1.0 {
        t = D::one();
    }

    let dx = ap[0] - e[0] * t;
    let dy = ap[1] - e[1] * t;
    dx * dx + dy * dy
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sq_distance(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
        point_to_edge_sq_distance(a, b, c)
    }

    #[test]
    fn test_interior_projection() {
        // Point above the middle of a horizontal segment.
        assert_relative_eq!(sq_distance([0.0, 2.0], [-1.0, 0.0], [1.0, 0.0]), 4.0);
    }

    #[test]
    fn test_clamped_to_endpoint() {
        // Point beyond the right endpoint projects onto it.
        assert_relative_eq!(sq_distance([3.0, 0.0], [-1.0, 0.0], [1.0, 0.0]), 4.0);
        assert_relative_eq!(sq_distance([-2.0, 1.0], [-1.0, 0.0], [1.0, 0.0]), 2.0);
    }

    #[test]
    fn test_degenerate_edge() {
        assert_relative_eq!(sq_distance([1.0, 1.0], [0.0, 0.0], [0.0, 0.0]), 2.0);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let x = nalgebra::SVector::<f64, 6>::from([0.3, 1.2, -1.0, 0.1, 1.0, -0.2]);
        let (_, grad) = num_dual::gradient(
            |v| {
                point_to_edge_sq_distance([v[0], v[1]], [v[2], v[3]], [v[4], v[5]])
            },
            x,
        );

        let h = 1e-6;
        for i in 0..6 {
            let mut plus = x;
            plus[i] += h;
            let mut minus = x;
            minus[i] -= h;
            let fd = (point_to_edge_sq_distance(
                [plus[0], plus[1]],
                [plus[2], plus[3]],
                [plus[4], plus[5]],
            ) - point_to_edge_sq_distance(
                [minus[0], minus[1]],
                [minus[2], minus[3]],
                [minus[4], minus[5]],
            )) / (2.0 * h);
            assert_relative_eq!(grad[i], fd, epsilon = 1e-6);
        }
    }
}
