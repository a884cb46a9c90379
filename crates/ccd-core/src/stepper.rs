//! Time steppers for advancing rigid-body states between CCD queries.

use nalgebra::{DVector, UnitQuaternion, Vector3};
use rayon::prelude::*;

use ccd_types::{CcdError, Pose, Result, RigidBody, RigidBodyAssembler};

/// Integration scheme, selected by scene dimension.
///
/// The 2D/3D fork lives in this variant: a 2D scene steps with symplectic
/// Euler (scalar angle integration), a 3D scene with exponential Euler
/// (rotation integrated on the quaternion manifold). Stepping a body of the
/// wrong dimension is an unimplemented-configuration error, reported
/// immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStepper {
    /// Symplectic Euler for 2D bodies.
    SymplecticEuler,
    /// Exponential Euler for 3D bodies.
    ExponentialEuler,
}

impl TimeStepper {
    /// The stepper for a scene dimension.
    pub fn for_dim(dim: usize) -> Result<Self> {
        match dim {
            2 => Ok(Self::SymplecticEuler),
            3 => Ok(Self::ExponentialEuler),
            d => Err(CcdError::UnsupportedDimension(d)),
        }
    }

    /// Scheme name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SymplecticEuler => "symplectic_euler",
            Self::ExponentialEuler => "exponential_euler",
        }
    }

    /// Advance one body by `time_step` under `gravity`.
    ///
    /// Velocity is updated before position (both schemes are
    /// velocity-first). Fixed degrees of freedom keep a zero velocity and
    /// their position components are left untouched.
    pub fn step_body(
        &self,
        body: &mut RigidBody,
        gravity: &DVector<f64>,
        time_step: f64,
    ) -> Result<()> {
        match (self, body.dim()) {
            (Self::SymplecticEuler, 2) => {
                step_linear(body, gravity, time_step);
                if body.is_dof_fixed[2] {
                    body.velocity.rotation[0] = 0.0;
                } else {
                    body.pose.rotation[0] += time_step * body.velocity.rotation[0];
                }
                Ok(())
            }
            (Self::ExponentialEuler, 3) => {
                step_linear(body, gravity, time_step);
                let dim = body.dim();
                for j in 0..3 {
                    if body.is_dof_fixed[dim + j] {
                        body.velocity.rotation[j] = 0.0;
                    }
                }
                let omega = Vector3::new(
                    body.velocity.rotation[0],
                    body.velocity.rotation[1],
                    body.velocity.rotation[2],
                );
                let rotation = UnitQuaternion::from_scaled_axis(omega * time_step)
                    * UnitQuaternion::from_scaled_axis(Vector3::new(
                        body.pose.rotation[0],
                        body.pose.rotation[1],
                        body.pose.rotation[2],
                    ));
                let axis_angle = rotation.scaled_axis();
                for j in 0..3 {
                    body.pose.rotation[j] = axis_angle[j];
                }
                Ok(())
            }
            (_, d) => Err(CcdError::UnsupportedDimension(d)),
        }
    }

    /// Advance all bodies in parallel, returning poses before and after.
    pub fn step_all(
        &self,
        bodies: &mut RigidBodyAssembler,
        gravity: &DVector<f64>,
        time_step: f64,
    ) -> Result<(Vec<Pose>, Vec<Pose>)> {
        let poses_t0 = bodies.poses();
        bodies
            .bodies_mut()
            .par_iter_mut()
            .try_for_each(|body| self.step_body(body, gravity, time_step))?;
        Ok((poses_t0, bodies.poses()))
    }
}

/// Shared velocity-then-position update of the linear degrees of freedom.
fn step_linear(body: &mut RigidBody, gravity: &DVector<f64>, time_step: f64) {
    for i in 0..body.dim() {
        if body.is_dof_fixed[i] {
            body.velocity.position[i] = 0.0;
        } else {
            body.velocity.position[i] += time_step * gravity[i];
            body.pose.position[i] += time_step * body.velocity.position[i];
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn free_body_2d() -> RigidBody {
        RigidBody::new(
            DMatrix::from_row_slice(1, 2, &[0.0, 0.0]),
            vec![],
            vec![],
            Pose::zeros(2),
            Pose::zeros(2),
            1.0,
            vec![false; 3],
            false,
        )
        .expect("body should be valid")
    }

    #[test]
    fn test_stepper_selection() {
        assert_eq!(
            TimeStepper::for_dim(2).unwrap(),
            TimeStepper::SymplecticEuler
        );
        assert_eq!(
            TimeStepper::for_dim(3).unwrap(),
            TimeStepper::ExponentialEuler
        );
        assert!(TimeStepper::for_dim(4).is_err());
    }

    #[test]
    fn test_dimension_mismatch_is_an_error() {
        let mut body = free_body_2d();
        let gravity = DVector::zeros(3);
        let err = TimeStepper::ExponentialEuler
            .step_body(&mut body, &gravity, 0.01)
            .expect_err("2d body under the 3d stepper must fail");
        assert_eq!(err, CcdError::UnsupportedDimension(2));
    }

    #[test]
    fn test_symplectic_free_fall() {
        let mut body = free_body_2d();
        let gravity = DVector::from_vec(vec![0.0, -10.0]);
        let h = 0.01;
        for _ in 0..100 {
            TimeStepper::SymplecticEuler
                .step_body(&mut body, &gravity, h)
                .expect("step should succeed");
        }
        // Symplectic Euler after n steps: x = -g h^2 n (n + 1) / 2.
        assert_relative_eq!(body.velocity.position[1], -10.0, epsilon = 1e-12);
        assert_relative_eq!(body.pose.position[1], -5.05, epsilon = 1e-9);
    }

    #[test]
    fn test_fixed_dof_does_not_move() {
        let mut body = free_body_2d();
        body.is_dof_fixed = vec![false, true, false];
        body.velocity.position[1] = 5.0;
        let gravity = DVector::from_vec(vec![0.0, -10.0]);
        TimeStepper::SymplecticEuler
            .step_body(&mut body, &gravity, 0.01)
            .expect("step should succeed");
        assert_eq!(body.pose.position[1], 0.0);
        assert_eq!(body.velocity.position[1], 0.0);
    }

    #[test]
    fn test_exponential_euler_rotation_integration() {
        let mut body = RigidBody::new(
            DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 0.0]),
            vec![],
            vec![],
            Pose::zeros(3),
            Pose::new(
                DVector::zeros(3),
                DVector::from_vec(vec![0.0, 0.0, std::f64::consts::PI]),
            ),
            1.0,
            vec![false; 6],
            false,
        )
        .expect("body should be valid");

        let gravity = DVector::zeros(3);
        // Half a second at pi rad/s is a quarter turn about z.
        for _ in 0..50 {
            TimeStepper::ExponentialEuler
                .step_body(&mut body, &gravity, 0.01)
                .expect("step should succeed");
        }
        let expected = std::f64::consts::FRAC_PI_2;
        assert_relative_eq!(body.pose.rotation[2], expected, epsilon = 1e-9);
        assert_relative_eq!(body.pose.rotation[0], 0.0, epsilon = 1e-12);
    }
}
