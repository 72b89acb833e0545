//! # Initial positioning
//!
//! Before tracking can start the arm is driven to a known reference configuration. The reference
//! is commanded directly to the joint controllers at a low rate until every measured joint is
//! within the convergence threshold of it in the same cycle, after which the controller waits a
//! settle time so the arm comes to rest.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::Deserialize;
use std::time::Duration;

use util::{module::State, time::Rate};

use crate::io::CommandSink;
use crate::kin_model::{JointConfiguration, MeasurementError};
use crate::shared_state::SharedControlState;
use crate::CtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InitPosParams {
    /// Configuration the arm is moved to before tracking.
    ///
    /// Units: radians
    pub reference_rad: Vec<f64>,

    /// Largest per-joint error at which the arm is considered to be at the reference.
    ///
    /// Units: radians
    pub threshold_rad: f64,

    /// Rate at which the reference is commanded and convergence is checked.
    ///
    /// Units: hertz
    pub poll_frequency_hz: f64,

    /// Wait after convergence before tracking may start.
    ///
    /// Units: seconds
    pub settle_time_s: f64,
}

/// Drives the arm to the reference configuration.
#[derive(Debug, Clone)]
pub struct InitialPositioning {
    reference: JointConfiguration,
    threshold_rad: f64,
    poll_frequency_hz: f64,
    settle_time: Duration,
    state: InitPosState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitPosState {
    Running,
    Converged,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitPosStatus {
    pub state: InitPosState,

    /// Largest per-joint error this cycle.
    ///
    /// Units: radians
    pub max_error_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for InitPosParams {
    fn default() -> Self {
        Self {
            reference_rad: vec![0.0, 1.57, 0.0, 1.57, 0.0, 0.0, 0.0],
            threshold_rad: 0.002,
            poll_frequency_hz: 10.0,
            settle_time_s: 2.0,
        }
    }
}

impl InitialPositioning {
    /// Create the controller for a chain of `num_joints` joints.
    ///
    /// Fails if the reference does not have one finite position per joint.
    pub fn new(params: &InitPosParams, num_joints: usize) -> Result<Self, MeasurementError> {
        Ok(Self {
            reference: JointConfiguration::new(params.reference_rad.clone(), num_joints)?,
            threshold_rad: params.threshold_rad,
            poll_frequency_hz: params.poll_frequency_hz,
            settle_time: Duration::from_secs_f64(params.settle_time_s.max(0.0)),
            state: InitPosState::Running,
        })
    }

    pub fn reference(&self) -> &JointConfiguration {
        &self.reference
    }

    pub fn state(&self) -> InitPosState {
        self.state
    }

    /// Command the reference until converged, then settle.
    ///
    /// Returns `Ok(false)` if shutdown was requested before positioning completed.
    pub fn run<C: CommandSink>(
        &mut self,
        shared: &SharedControlState,
        sink: &mut C,
    ) -> Result<bool, CtrlError> {
        info!(
            "Moving to the initial configuration {:?}",
            self.reference.as_slice()
        );

        let mut rate = Rate::new(self.poll_frequency_hz);

        while !shared.is_shutdown() {
            let measured = shared.get_measurement().ok_or(CtrlError::NoMeasurement)?;

            let (cmd, status) = self.proc(&measured)?;

            if let Err(e) = sink.send_commands(&cmd) {
                warn!("{}", e);
            }

            debug!("Initial positioning error: {:.5} rad", status.max_error_rad);

            if status.state == InitPosState::Converged {
                info!(
                    "Initial configuration reached (max error {:.5} rad), settling for {:.1} s",
                    status.max_error_rad,
                    self.settle_time.as_secs_f64()
                );
                return Ok(shared.sleep_unless_shutdown(self.settle_time));
            }

            rate.sleep();
        }

        Ok(false)
    }
}

impl State for InitialPositioning {
    type InputData = JointConfiguration;
    type OutputData = JointConfiguration;
    type StatusReport = InitPosStatus;
    type ProcError = CtrlError;

    /// Compare a measurement against the reference. The output is always the reference
    /// configuration, to be sent to the joint controllers.
    fn proc(
        &mut self,
        measured: &JointConfiguration,
    ) -> Result<(JointConfiguration, InitPosStatus), CtrlError> {
        let max_error_rad = self.reference.max_abs_error(measured).ok_or(
            MeasurementError::WrongLength {
                expected: self.reference.len(),
                actual: measured.len(),
            },
        )?;

        if max_error_rad < self.threshold_rad {
            self.state = InitPosState::Converged;
        }

        Ok((
            self.reference.clone(),
            InitPosStatus {
                state: self.state,
                max_error_rad,
            },
        ))
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn offset(reference: &JointConfiguration, offsets: &[f64]) -> JointConfiguration {
        let values = reference
            .as_slice()
            .iter()
            .zip(offsets.iter())
            .map(|(r, o)| r + o)
            .collect::<Vec<_>>();
        JointConfiguration::new(values, reference.len()).unwrap()
    }

    #[test]
    fn test_convergence_gate() {
        let mut ctrl = InitialPositioning::new(&InitPosParams::default(), 7).unwrap();
        let reference = ctrl.reference().clone();

        // One joint still outside the threshold
        let far = offset(&reference, &[0.001, -0.001, 0.0, 0.0, 0.003, 0.0, 0.0]);
        let (cmd, status) = ctrl.proc(&far).unwrap();
        assert_eq!(cmd, reference);
        assert_eq!(status.state, InitPosState::Running);
        assert!((status.max_error_rad - 0.003).abs() < 1e-9);

        // Exactly at the threshold is not converged
        let edge = offset(&reference, &[0.0, 0.0, 0.002, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(ctrl.proc(&edge).unwrap().1.state, InitPosState::Running);

        let near = offset(&reference, &[0.0019, -0.0019, 0.001, 0.0, 0.0, 0.0005, 0.0]);
        let (_, status) = ctrl.proc(&near).unwrap();
        assert_eq!(status.state, InitPosState::Converged);
        assert_eq!(ctrl.state(), InitPosState::Converged);
    }

    #[test]
    fn test_bad_reference() {
        let params = InitPosParams {
            reference_rad: vec![0.0; 6],
            ..Default::default()
        };

        assert!(InitialPositioning::new(&params, 7).is_err());
    }

    #[test]
    fn test_measurement_wrong_length() {
        let mut ctrl = InitialPositioning::new(&InitPosParams::default(), 7).unwrap();

        assert!(matches!(
            ctrl.proc(&JointConfiguration::zeros(6)),
            Err(CtrlError::MeasurementError(_))
        ));
    }
}
