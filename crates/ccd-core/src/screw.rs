//! Screw-motion decomposition of a rigid rotation over a time step.
//!
//! A 3D rigid step from rotation `R0` to `R1` is factored through the
//! relative rotation `R1 * R0^T = P^T * Rz(omega) * P`, where `P` is the
//! orthonormal change of basis taking the rotation axis to the z-axis. The
//! rotation at time `t` is then `P^T * Rz(t * omega) * P * R0`, which
//! interval arithmetic can evaluate with a single transcendental argument
//! `t * omega`.

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};

use ccd_interval::Interval;
use ccd_types::Pose;

/// The 3D rotation matrix of a pose's axis-angle rotation.
#[must_use]
pub(crate) fn pose_rotation3(pose: &Pose) -> Rotation3<f64> {
    UnitQuaternion::from_scaled_axis(Vector3::new(
        pose.rotation[0],
        pose.rotation[1],
        pose.rotation[2],
    ))
    .to_rotation_matrix()
}

/// Factor the step from `pose_t0` to `pose_t1` into `(R0, P, omega)` with
/// `R1 * R0^T = P^T * Rz(omega) * P`.
///
/// For an identity relative rotation, `omega = 0` and `P` is arbitrary
/// (the identity is returned).
#[must_use]
pub fn decompose_to_z_screwing(pose_t0: &Pose, pose_t1: &Pose) -> (Matrix3<f64>, Matrix3<f64>, f64) {
    let r0 = pose_rotation3(pose_t0);
    let r1 = pose_rotation3(pose_t1);
    let relative = r1 * r0.inverse();

    let (axis, omega) = match relative.axis_angle() {
        Some((axis, angle)) => (axis.into_inner(), angle),
        None => (Vector3::z(), 0.0),
    };

    // P maps the rotation axis onto the z-axis; when the axis is opposite
    // to z, `rotation_between` has no unique answer and any half-turn
    // through a perpendicular axis works.
    let p = Rotation3::rotation_between(&axis, &Vector3::z()).unwrap_or_else(|| {
        Rotation3::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI)
    });

    (r0.into_inner(), p.into_inner(), omega)
}

/// The interval rotation matrix about the z-axis by `theta`.
#[must_use]
pub fn rotate_around_z(theta: Interval) -> Matrix3<Interval> {
    let c = theta.cos();
    let s = theta.sin();
    let zero = Interval::point(0.0);
    let one = Interval::point(1.0);
    Matrix3::new(c, -s, zero, s, c, zero, zero, zero, one)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use nalgebra::DVector;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn pose_with_rotation(axis_angle: [f64; 3]) -> Pose {
        Pose::new(DVector::zeros(3), DVector::from_row_slice(&axis_angle))
    }

    #[test]
    fn test_screw_reconstructs_relative_rotation() {
        let mut rng = StdRng::seed_from_u64(0x5c1e);
        for _ in 0..50 {
            let mut sample = || {
                pose_with_rotation([
                    rng.random_range(-3.0..3.0),
                    rng.random_range(-3.0..3.0),
                    rng.random_range(-3.0..3.0),
                ])
            };
            let (pose_t0, pose_t1) = (sample(), sample());
            let (r0, p, omega) = decompose_to_z_screwing(&pose_t0, &pose_t1);

            let rz = Rotation3::from_axis_angle(&Vector3::z_axis(), omega).into_inner();
            let reconstructed = p.transpose() * rz * p;
            let relative =
                pose_rotation3(&pose_t1).into_inner() * pose_rotation3(&pose_t0).into_inner().transpose();

            assert!(
                (reconstructed - relative).norm() < 1e-12,
                "screw reconstruction error {:e}",
                (reconstructed - relative).norm()
            );
            // R0 comes back unchanged.
            assert!((r0 - pose_rotation3(&pose_t0).into_inner()).norm() < 1e-14);
        }
    }

    #[test]
    fn test_identity_step_has_zero_omega() {
        let pose = pose_with_rotation([0.4, -0.1, 0.2]);
        let (_, _, omega) = decompose_to_z_screwing(&pose, &pose);
        assert_eq!(omega, 0.0);
    }

    #[test]
    fn test_rotate_around_z_contains_pointwise_rotation() {
        let theta = Interval::new(0.1, 0.4);
        let rz = rotate_around_z(theta);
        for &t in &[0.1, 0.25, 0.4] {
            let exact = Rotation3::from_axis_angle(&Vector3::z_axis(), t).into_inner();
            for i in 0..3 {
                for j in 0..3 {
                    assert!(
                        rz[(i, j)].contains(exact[(i, j)]),
                        "entry ({i}, {j}) at angle {t}"
                    );
                }
            }
        }
    }
}
