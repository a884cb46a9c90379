//! Rigid body poses in 2D and 3D.

use nalgebra::{DMatrix, DVector, UnitQuaternion, Vector3};

/// Position and rotation of a rigid body.
///
/// The rotation is an angle (one component) in 2D and an axis-angle vector
/// (three components) in 3D. A `Pose` is also used for velocities, where
/// `position` holds the linear and `rotation` the angular velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Translation (or linear velocity), `dim` components.
    pub position: DVector<f64>,
    /// Rotation as angle / axis-angle (or angular velocity).
    pub rotation: DVector<f64>,
}

impl Pose {
    /// Create a pose from position and rotation.
    ///
    /// # Panics
    ///
    /// Panics if the rotation length does not match the position dimension
    /// (1 for 2D, 3 for 3D).
    #[must_use]
    pub fn new(position: DVector<f64>, rotation: DVector<f64>) -> Self {
        assert!(
            rotation.len() == Self::angular_dim(position.len()),
            "rotation has {} components, expected {}",
            rotation.len(),
            Self::angular_dim(position.len())
        );
        Self { position, rotation }
    }

    /// The zero pose (identity transform / zero velocity) for a dimension.
    #[must_use]
    pub fn zeros(dim: usize) -> Self {
        Self {
            position: DVector::zeros(dim),
            rotation: DVector::zeros(Self::angular_dim(dim)),
        }
    }

    /// Number of rotational components for a spatial dimension.
    #[must_use]
    pub fn angular_dim(dim: usize) -> usize {
        if dim == 2 {
            1
        } else {
            3
        }
    }

    /// Number of degrees of freedom for a spatial dimension (3 in 2D, 6 in 3D).
    #[must_use]
    pub fn dim_to_ndof(dim: usize) -> usize {
        dim + Self::angular_dim(dim)
    }

    /// Spatial dimension of this pose.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.position.len()
    }

    /// Degrees of freedom of this pose.
    #[must_use]
    pub fn ndof(&self) -> usize {
        self.position.len() + self.rotation.len()
    }

    /// Componentwise linear interpolation towards `other`.
    ///
    /// In 2D this interpolates the rotation angle exactly; in 3D the
    /// axis-angle components are blended componentwise (rigid 3D rotation
    /// interpolation over a time step is handled by the screw-motion
    /// decomposition, not by this helper).
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Self {
            position: &self.position + (&other.position - &self.position) * t,
            rotation: &self.rotation + (&other.rotation - &self.rotation) * t,
        }
    }

    /// The rotation matrix of this pose (2x2 in 2D, 3x3 in 3D).
    #[must_use]
    pub fn rotation_matrix(&self) -> DMatrix<f64> {
        match self.dim() {
            2 => {
                let (s, c) = self.rotation[0].sin_cos();
                DMatrix::from_row_slice(2, 2, &[c, -s, s, c])
            }
            _ => {
                let q = UnitQuaternion::from_scaled_axis(Vector3::new(
                    self.rotation[0],
                    self.rotation[1],
                    self.rotation[2],
                ));
                let m = q.to_rotation_matrix();
                DMatrix::from_fn(3, 3, |i, j| m[(i, j)])
            }
        }
    }

    /// Flatten to a DoF vector `[position; rotation]`.
    #[must_use]
    pub fn dof(&self) -> DVector<f64> {
        let mut x = DVector::zeros(self.ndof());
        x.rows_mut(0, self.dim()).copy_from(&self.position);
        x.rows_mut(self.dim(), self.rotation.len())
            .copy_from(&self.rotation);
        x
    }

    /// Rebuild a pose from a DoF vector produced by [`Pose::dof`].
    ///
    /// # Panics
    ///
    /// Panics if `x.len() != Pose::dim_to_ndof(dim)`.
    #[must_use]
    pub fn from_dof(x: &DVector<f64>, dim: usize) -> Self {
        assert_eq!(x.len(), Self::dim_to_ndof(dim));
        Self {
            position: x.rows(0, dim).into_owned(),
            rotation: x.rows(dim, Self::angular_dim(dim)).into_owned(),
        }
    }
}

/// Convert a vector of degrees to radians.
#[must_use]
pub fn degrees_to_radians(v: &DVector<f64>) -> DVector<f64> {
    v * (std::f64::consts::PI / 180.0)
}

/// Convert a vector of radians to degrees.
#[must_use]
pub fn radians_to_degrees(v: &DVector<f64>) -> DVector<f64> {
    v * (180.0 / std::f64::consts::PI)
}
