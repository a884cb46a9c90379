//! Axis-aligned bounding boxes for the broad phase.

use nalgebra::DVector;

/// An axis-aligned bounding box in 2 or 3 dimensions.
///
/// Invariants: `min <= max` componentwise and
/// `center = min + half_extent = (min + max) / 2`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aabb {
    min: DVector<f64>,
    max: DVector<f64>,
    center: DVector<f64>,
    half_extent: DVector<f64>,
}

impl Aabb {
    /// Create a box from ordered corners.
    ///
    /// # Panics
    ///
    /// Panics if `min > max` on any axis or the corners disagree in length.
    #[must_use]
    pub fn new(min: DVector<f64>, max: DVector<f64>) -> Self {
        assert_eq!(min.len(), max.len());
        assert!(
            min.iter().zip(max.iter()).all(|(lo, hi)| lo <= hi),
            "invalid AABB corners"
        );
        let half_extent = (&max - &min) / 2.0;
        let center = &min + &half_extent;
        Self {
            min,
            max,
            center,
            half_extent,
        }
    }

    /// The componentwise hull of a set of points, inflated by `inflation`.
    ///
    /// This is the AABB of a time-swept primitive: pass the primitive's
    /// vertex positions at both endpoints of the step.
    ///
    /// # Panics
    ///
    /// Panics if `points` is empty.
    #[must_use]
    pub fn containing(points: &[DVector<f64>], inflation: f64) -> Self {
        let first = &points[0];
        let mut min = first.clone();
        let mut max = first.clone();
        for p in &points[1..] {
            for i in 0..min.len() {
                min[i] = min[i].min(p[i]);
                max[i] = max[i].max(p[i]);
            }
        }
        Self::new(min.add_scalar(-inflation), max.add_scalar(inflation))
    }

    /// The smallest box containing both operands.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Whether two boxes overlap (shared boundaries count).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min
            .iter()
            .zip(other.max.iter())
            .all(|(lo, hi)| lo <= hi)
            && other
                .min
                .iter()
                .zip(self.max.iter())
                .all(|(lo, hi)| lo <= hi)
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> &DVector<f64> {
        &self.min
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> &DVector<f64> {
        &self.max
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> &DVector<f64> {
        &self.center
    }

    /// Half extents.
    #[must_use]
    pub fn half_extent(&self) -> &DVector<f64> {
        &self.half_extent
    }

    /// Spatial dimension (2 or 3).
    #[must_use]
    pub fn dim(&self) -> usize {
        self.min.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn vec2(x: f64, y: f64) -> DVector<f64> {
        DVector::from_vec(vec![x, y])
    }

    #[test]
    fn test_center_and_half_extent() {
        let aabb = Aabb::new(vec2(0.0, -1.0), vec2(2.0, 1.0));
        assert_relative_eq!(aabb.center()[0], 1.0);
        assert_relative_eq!(aabb.center()[1], 0.0);
        assert_relative_eq!(aabb.half_extent()[0], 1.0);
        assert_eq!(aabb.dim(), 2);
    }

    #[test]
    fn test_overlap() {
        let a = Aabb::new(vec2(0.0, 0.0), vec2(1.0, 1.0));
        let b = Aabb::new(vec2(0.5, 0.5), vec2(2.0, 2.0));
        let c = Aabb::new(vec2(1.5, 1.5), vec2(3.0, 3.0));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
        // Shared boundary counts as overlapping.
        let d = Aabb::new(vec2(1.0, 0.0), vec2(2.0, 1.0));
        assert!(a.overlaps(&d));
    }

    #[test]
    fn test_union_is_componentwise_hull() {
        let a = Aabb::new(vec2(0.0, 0.0), vec2(1.0, 1.0));
        let b = Aabb::new(vec2(-1.0, 0.5), vec2(0.5, 2.0));
        let u = a.union(&b);
        assert_eq!(u.min(), &vec2(-1.0, 0.0));
        assert_eq!(u.max(), &vec2(1.0, 2.0));
    }

    #[test]
    fn test_containing_sweep_with_inflation() {
        let aabb = Aabb::containing(&[vec2(0.0, 1.0), vec2(0.0, -1.0)], 0.1);
        assert_relative_eq!(aabb.min()[1], -1.1);
        assert_relative_eq!(aabb.max()[1], 1.1);
        assert_relative_eq!(aabb.min()[0], -0.1);
    }

    #[test]
    #[should_panic(expected = "invalid AABB")]
    fn test_reversed_corners_panic() {
        let _ = Aabb::new(vec2(1.0, 0.0), vec2(0.0, 1.0));
    }
}
