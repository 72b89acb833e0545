//! # Control loop outputs
//!
//! The loops publish through these traits rather than a socket directly, so the network adapters
//! in [`crate::net`] can be replaced by recording sinks in tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::kin_model::{CartesianPose, JointConfiguration};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Destination of the end-effector pose computed by the forward kinematics loop.
pub trait PoseSink {
    fn publish_pose(&mut self, pose: &CartesianPose) -> Result<(), OutputError>;
}

/// Destination of joint position commands, one setpoint per joint controller.
pub trait CommandSink {
    fn send_commands(&mut self, cmd: &JointConfiguration) -> Result<(), OutputError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Could not serialise the {0}: {1}")]
    SerialiseError(&'static str, serde_json::Error),

    #[error("Could not send the {0}: {1}")]
    SendError(&'static str, String),
}
