//! # Arm Equipment Messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Measured state of the robot joints, as published by the joint state source.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct JointState {
    /// Names of the joints, in the same order as the positions. May be empty.
    #[serde(default)]
    pub name: Vec<String>,

    /// Measured position of each joint.
    ///
    /// Units: radians (or meters for prismatic joints)
    pub position_rad: Vec<f64>,
}

/// Position setpoint for a single joint controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct JointCommand {
    /// Demanded position of the joint.
    ///
    /// Units: radians (or meters for prismatic joints)
    pub position_rad: f64,
}

/// Pose of the end-effector in the chain's base frame.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EefPose {
    /// Position of the end-effector.
    ///
    /// Units: meters,
    /// Frame: Chain base
    pub position_m: [f64; 3],

    /// Orientation of the end-effector as a unit quaternion in `[x, y, z, w]` order.
    ///
    /// Frame: Chain base
    pub orientation_q: [f64; 4],
}

/// Telemetry describing the state of arm control, returned by the `Status` telecommand.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ArmStatusTm {
    /// Name of the current control state.
    pub state: String,

    /// Whether trajectory tracking is active.
    pub tracking_active: bool,

    /// Trajectory time elapsed since tracking started.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// Number of tracking cycles executed.
    pub num_tracking_cycles: u64,

    /// Total number of tracking cycles in which inverse kinematics did not converge.
    pub num_no_convergence: u64,

    /// Number of consecutive tracking cycles in which inverse kinematics did not converge.
    pub num_consec_no_convergence: u64,

    /// Iterations used by the most recent inverse kinematics solve.
    pub last_ik_iterations: u32,

    /// Cartesian residual of the most recent inverse kinematics solve.
    pub last_ik_residual: f64,
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Get the topic on which the command for the joint at the given (zero based) index is published.
///
/// Topics are numbered from 1, so index 0 maps to `joint1_position_controller/command`.
pub fn joint_command_topic(joint_index: usize) -> String {
    format!("joint{}_position_controller/command", joint_index + 1)
}
