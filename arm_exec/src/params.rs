//! Parameters for the arm executable

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;
use std::time::Duration;

use crate::ik_ctrl::IkCtrlParams;
use crate::init_pos::InitPosParams;
use crate::kin_solver::SolverParams;
use crate::traj_gen::TrajParams;
use crate::trigger::TriggerSource;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Contents of `arm_exec.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ArmExecParams {
    pub model: ModelParams,

    #[serde(default)]
    pub control: ControlParams,

    #[serde(default)]
    pub ik_ctrl: IkCtrlParams,

    #[serde(default)]
    pub init_pos: InitPosParams,

    #[serde(default)]
    pub traj: TrajParams,

    #[serde(default)]
    pub solver: SolverParams,
}

/// Where to find the kinematic chain.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelParams {
    /// Robot description file, relative to the parameter directory.
    pub description_file: String,

    pub base_frame: String,

    pub tip_frame: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlParams {
    /// Rate of the forward kinematics loop and of the trajectory clock.
    ///
    /// Units: hertz
    pub frequency_hz: f64,

    /// Measurements older than this are reported as stale. Not checked if unset.
    ///
    /// Units: seconds
    pub measurement_timeout_s: Option<f64>,

    pub trigger_source: TriggerSource,
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("Parameter {0} must be greater than zero, got {1}")]
    NotPositive(&'static str, f64),

    #[error("The initial reference has {actual} positions but the chain has {expected} joints")]
    ReferenceLength { expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            frequency_hz: 50.0,
            measurement_timeout_s: Some(0.5),
            trigger_source: TriggerSource::Console,
        }
    }
}

impl ArmExecParams {
    /// Check the parameters against each other and against a chain of `num_joints` joints.
    pub fn validate(&self, num_joints: usize) -> Result<(), ParamsError> {
        let positive = [
            ("control.frequency_hz", self.control.frequency_hz),
            ("ik_ctrl.rate_multiplier", self.ik_ctrl.rate_multiplier as f64),
            ("init_pos.threshold_rad", self.init_pos.threshold_rad),
            ("init_pos.poll_frequency_hz", self.init_pos.poll_frequency_hz),
            ("solver.max_iterations", self.solver.max_iterations as f64),
            ("solver.tolerance", self.solver.tolerance),
        ];

        for &(name, value) in positive.iter() {
            // Also rejects NaN
            if !(value > 0.0) {
                return Err(ParamsError::NotPositive(name, value));
            }
        }

        if self.init_pos.reference_rad.len() != num_joints {
            return Err(ParamsError::ReferenceLength {
                expected: num_joints,
                actual: self.init_pos.reference_rad.len(),
            });
        }

        Ok(())
    }

    /// Rate of the inverse kinematics tracking loop.
    ///
    /// Units: hertz
    pub fn ik_frequency_hz(&self) -> f64 {
        self.control.frequency_hz * self.ik_ctrl.rate_multiplier as f64
    }

    pub fn measurement_timeout(&self) -> Option<Duration> {
        self.control
            .measurement_timeout_s
            .filter(|t| t.is_finite() && *t > 0.0)
            .map(Duration::from_secs_f64)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
