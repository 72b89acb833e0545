//! Joint space and Cartesian space value types

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DVector, Isometry3, Rotation3, Translation3, UnitQuaternion, Vector3};
use std::ops::Index;

use comms_if::eqpt::arm::{EefPose, JointCommand};

use super::MeasurementError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A position for every movable joint of the chain, in chain order.
///
/// Units: radians for revolute joints, meters for prismatic joints.
#[derive(Debug, Clone, PartialEq)]
pub struct JointConfiguration {
    positions: Vec<f64>,
}

/// A frame pose expressed in the base frame of the chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CartesianPose {
    /// Position of the frame origin.
    ///
    /// Units: meters,
    /// Frame: Base
    pub position_m: Vector3<f64>,

    /// Attitude of the frame.
    ///
    /// Frame: Base
    pub attitude_q: UnitQuaternion<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JointConfiguration {
    /// A configuration with every joint at zero.
    pub fn zeros(num_joints: usize) -> Self {
        Self {
            positions: vec![0.0; num_joints],
        }
    }

    /// Build a configuration of exactly `num_joints` positions, rejecting any other length or
    /// any non-finite value.
    pub fn new(positions: Vec<f64>, num_joints: usize) -> Result<Self, MeasurementError> {
        if positions.len() != num_joints {
            return Err(MeasurementError::WrongLength {
                expected: num_joints,
                actual: positions.len(),
            });
        }

        check_finite(&positions)?;

        Ok(Self { positions })
    }

    /// Build a configuration from a joint state measurement.
    ///
    /// The first `num_joints` values are used and any further values are ignored. A measurement
    /// with fewer values is rejected.
    pub fn from_measurement(values: &[f64], num_joints: usize) -> Result<Self, MeasurementError> {
        if values.len() < num_joints {
            return Err(MeasurementError::TooFewJoints {
                expected: num_joints,
                actual: values.len(),
            });
        }

        let positions = values[..num_joints].to_vec();
        check_finite(&positions)?;

        Ok(Self { positions })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.positions
    }

    /// The largest absolute per-joint difference to another configuration, or `None` if the
    /// configurations have different lengths.
    pub fn max_abs_error(&self, other: &JointConfiguration) -> Option<f64> {
        util::maths::max_abs_diff(&self.positions, &other.positions)
    }

    /// Apply a correction to every joint.
    ///
    /// The correction must have the same dimension as the configuration.
    pub(crate) fn add_correction(&mut self, correction: &DVector<f64>) {
        for (q, dq) in self.positions.iter_mut().zip(correction.iter()) {
            *q += dq;
        }
    }

    /// Split the configuration into one command per joint.
    pub fn to_commands(&self) -> Vec<JointCommand> {
        self.positions
            .iter()
            .map(|p| JointCommand { position_rad: *p })
            .collect()
    }
}

impl Index<usize> for JointConfiguration {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.positions[index]
    }
}

impl CartesianPose {
    pub fn new(position_m: Vector3<f64>, attitude_q: UnitQuaternion<f64>) -> Self {
        Self {
            position_m,
            attitude_q,
        }
    }

    /// Build a pose from a position and a rotation matrix.
    pub fn from_rotation(position_m: Vector3<f64>, rotation: &Rotation3<f64>) -> Self {
        Self {
            position_m,
            attitude_q: UnitQuaternion::from_rotation_matrix(rotation),
        }
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self {
            position_m: iso.translation.vector,
            attitude_q: iso.rotation,
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position_m), self.attitude_q)
    }

    /// The attitude of the pose as a rotation matrix.
    pub fn rotation(&self) -> Rotation3<f64> {
        self.attitude_q.to_rotation_matrix()
    }

    /// Straight line distance between the two frame origins.
    ///
    /// Units: meters
    pub fn position_error(&self, other: &CartesianPose) -> f64 {
        (self.position_m - other.position_m).norm()
    }

    /// Angle of the smallest rotation between the two attitudes.
    ///
    /// Units: radians
    pub fn attitude_error(&self, other: &CartesianPose) -> f64 {
        self.attitude_q.angle_to(&other.attitude_q)
    }

    /// Convert into the pose message, quaternion ordered x, y, z, w.
    pub fn to_msg(&self) -> EefPose {
        let q = self.attitude_q.quaternion();

        EefPose {
            position_m: [self.position_m.x, self.position_m.y, self.position_m.z],
            orientation_q: [q.i, q.j, q.k, q.w],
        }
    }
}

impl Default for CartesianPose {
    fn default() -> Self {
        Self {
            position_m: Vector3::zeros(),
            attitude_q: UnitQuaternion::identity(),
        }
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn check_finite(positions: &[f64]) -> Result<(), MeasurementError> {
    match positions.iter().position(|p| !p.is_finite()) {
        Some(index) => Err(MeasurementError::NonFinite {
            index,
            value: positions[index],
        }),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
