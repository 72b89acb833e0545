//! Cartesian error twist

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DVector, Vector3};

use crate::kin_model::CartesianPose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Linear and angular displacement of a frame, both in the base frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Twist {
    /// Units: meters
    pub linear: Vector3<f64>,

    /// Rotation vector, axis scaled by angle.
    ///
    /// Units: radians
    pub angular: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Twist {
    pub fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }

    /// The displacement taking `current` onto `target`.
    ///
    /// The angular part is the smallest rotation from the current to the target attitude.
    pub fn between(current: &CartesianPose, target: &CartesianPose) -> Self {
        Self {
            linear: target.position_m - current.position_m,
            angular: (target.attitude_q * current.attitude_q.inverse()).scaled_axis(),
        }
    }

    /// Combined norm of the linear and angular parts.
    pub fn norm(&self) -> f64 {
        (self.linear.norm_squared() + self.angular.norm_squared()).sqrt()
    }

    /// Stack as `[linear; angular]`.
    pub fn to_vector(&self) -> DVector<f64> {
        DVector::from_iterator(6, self.linear.iter().chain(self.angular.iter()).cloned())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::PI;

    #[test]
    fn test_between() {
        let current = CartesianPose::new(
            Vector3::new(0.1, 0.2, 0.3),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.2),
        );
        let target = CartesianPose::new(
            Vector3::new(0.4, 0.2, 0.7),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -0.3),
        );

        let twist = Twist::between(&current, &target);

        assert!((twist.linear - Vector3::new(0.3, 0.0, 0.4)).norm() < 1e-12);
        assert!((twist.angular - Vector3::new(0.0, 0.0, -0.5)).norm() < 1e-12);
        assert!((twist.norm() - (0.25f64 + 0.25).sqrt()).abs() < 1e-12);

        let v = twist.to_vector();
        assert_eq!(v.len(), 6);
        assert!((v[2] - 0.4).abs() < 1e-12);
        assert!((v[5] + 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_shortest_rotation() {
        // 350 degrees one way is 10 degrees the other
        let current = CartesianPose::default();
        let target = CartesianPose::new(
            Vector3::zeros(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 350.0 * PI / 180.0),
        );

        let twist = Twist::between(&current, &target);
        assert!((twist.angular.norm() - 10.0 * PI / 180.0).abs() < 1e-9);
        assert!(twist.angular.x < 0.0);
    }
}
