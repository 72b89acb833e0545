//! # Arm control library.
//!
//! Kinematic control of a serial manipulator along a Cartesian trajectory. The executable in
//! `main.rs` wires these modules to the network; this library allows the tests and benches to
//! drive them directly.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Kinematic model - the chain of joints and links from the base frame to the tip frame
pub mod kin_model;

/// Kinematic solver - forward kinematics and Newton-Raphson inverse kinematics on a chain
pub mod kin_solver;

/// Shared control state - measurements, poses and gates shared between the control loops
pub mod shared_state;

/// Trajectory generator - circular Cartesian target as a function of time
pub mod traj_gen;

/// Start trigger - the manual gate between initial positioning and tracking
pub mod trigger;

/// Output seams between the control loops and the transport
pub mod io;

/// Initial positioning - drives the joints to a reference configuration before tracking
pub mod init_pos;

/// Forward kinematics loop - publishes the end-effector pose and advances the trajectory clock
pub mod fk_loop;

/// Inverse kinematics control loop - the startup state machine and trajectory tracking
pub mod ik_ctrl;

/// Supervisor - owns the control loop threads
pub mod supervisor;

/// Network adapters for the joint states, pose, commands and telecommands
pub mod net;

/// Parameters for the arm executable
pub mod params;

#[cfg(test)]
pub(crate) mod test_util;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which stop a control loop.
#[derive(Debug, thiserror::Error)]
pub enum CtrlError {
    #[error("Kinematic solver error: {0}")]
    SolverError(#[from] kin_solver::SolverError),

    #[error("Invalid joint configuration: {0}")]
    MeasurementError(#[from] kin_model::MeasurementError),

    #[error("No joint state measurement is available")]
    NoMeasurement,

    #[error("The {0} loop panicked")]
    LoopPanicked(&'static str),
}
