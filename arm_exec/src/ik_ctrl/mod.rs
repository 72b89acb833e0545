//! # Inverse kinematics control loop
//!
//! Runs the startup sequence and then tracks the trajectory. The loop moves through four states,
//! in order and never backwards:
//!
//! - `WaitForPose` - block until the forward kinematics loop has computed a first pose.
//! - `InitialPositioning` - drive the arm to the reference configuration and let it settle.
//! - `WaitForTrigger` - arm the start trigger and block until it is fired.
//! - `Tracking` - every cycle, solve inverse kinematics for the trajectory target at the
//!   current trajectory time, seeded with the latest measurement, and command the result.
//!
//! Tracking runs at a multiple of the base control frequency. Shutdown is honoured in every
//! state.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod tracking;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};

use comms_if::eqpt::arm::ArmStatusTm;
use util::{module::State, time::Rate};

use crate::init_pos::InitialPositioning;
use crate::io::CommandSink;
use crate::shared_state::SharedControlState;
use crate::trigger::StartTrigger;
use crate::CtrlError;

pub use tracking::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct IkCtrlParams {
    /// Tracking runs this many times faster than the base control frequency.
    pub rate_multiplier: u32,

    pub no_convergence_policy: NoConvergencePolicy,
}

/// Progress of the control loop, readable by the telecommand server.
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub state: IkCtrlState,
    pub num_tracking_cycles: u64,
    pub num_no_convergence: u64,
    pub num_consec_no_convergence: u64,
    pub last_ik_iterations: u32,
    pub last_ik_residual: f64,
}

/// Status report shared between the control loop and its readers.
pub type StatusHandle = Arc<Mutex<StatusReport>>;

pub struct IkCtrlLoop<C: CommandSink> {
    shared: Arc<SharedControlState>,
    trigger: Arc<StartTrigger>,
    init_pos: InitialPositioning,
    tracking: TrackingController,
    sink: C,
    frequency_hz: f64,
    state: IkCtrlState,
    status: StatusHandle,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IkCtrlState {
    WaitForPose,
    InitialPositioning,
    WaitForTrigger,
    Tracking,
}

/// Command sent when inverse kinematics does not converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum NoConvergencePolicy {
    /// Send the solver's last estimate anyway.
    PublishSolverOutput,

    /// Send the last converged solution again, or the solver's estimate if there is none yet.
    HoldLastGood,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for IkCtrlParams {
    fn default() -> Self {
        Self {
            rate_multiplier: 4,
            no_convergence_policy: NoConvergencePolicy::PublishSolverOutput,
        }
    }
}

impl Default for IkCtrlState {
    fn default() -> Self {
        IkCtrlState::WaitForPose
    }
}

impl IkCtrlState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IkCtrlState::WaitForPose => "WaitForPose",
            IkCtrlState::InitialPositioning => "InitialPositioning",
            IkCtrlState::WaitForTrigger => "WaitForTrigger",
            IkCtrlState::Tracking => "Tracking",
        }
    }
}

impl StatusReport {
    /// Convert into the telemetry message, adding the trajectory clock.
    pub fn to_tm(&self, shared: &SharedControlState) -> ArmStatusTm {
        ArmStatusTm {
            state: self.state.as_str().to_string(),
            tracking_active: shared.tracking_active(),
            elapsed_s: shared.elapsed(),
            num_tracking_cycles: self.num_tracking_cycles,
            num_no_convergence: self.num_no_convergence,
            num_consec_no_convergence: self.num_consec_no_convergence,
            last_ik_iterations: self.last_ik_iterations,
            last_ik_residual: self.last_ik_residual,
        }
    }

    fn record(&mut self, report: &TrackingReport) {
        self.num_tracking_cycles += 1;
        self.last_ik_iterations = report.iterations;
        self.last_ik_residual = report.residual;

        if report.converged {
            self.num_consec_no_convergence = 0;
        } else {
            self.num_no_convergence += 1;
            self.num_consec_no_convergence += 1;
        }
    }
}

impl<C: CommandSink> IkCtrlLoop<C> {
    pub fn new(
        shared: Arc<SharedControlState>,
        trigger: Arc<StartTrigger>,
        init_pos: InitialPositioning,
        tracking: TrackingController,
        sink: C,
        frequency_hz: f64,
    ) -> Self {
        Self {
            shared,
            trigger,
            init_pos,
            tracking,
            sink,
            frequency_hz,
            state: IkCtrlState::WaitForPose,
            status: Arc::new(Mutex::new(StatusReport::default())),
        }
    }

    pub fn state(&self) -> IkCtrlState {
        self.state
    }

    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    /// Run the startup sequence and then track until shutdown.
    pub fn run(mut self) -> Result<(), CtrlError> {
        loop {
            let proceed = match self.state {
                IkCtrlState::WaitForPose => {
                    info!("Waiting for the first end-effector pose");
                    self.shared.wait_for_pose()
                }
                IkCtrlState::InitialPositioning => {
                    self.init_pos.run(&self.shared, &mut self.sink)?
                }
                IkCtrlState::WaitForTrigger => self.wait_for_trigger(),
                IkCtrlState::Tracking => {
                    self.track()?;
                    false
                }
            };

            if !proceed {
                break;
            }

            let next = match self.state {
                IkCtrlState::WaitForPose => IkCtrlState::InitialPositioning,
                IkCtrlState::InitialPositioning => IkCtrlState::WaitForTrigger,
                _ => IkCtrlState::Tracking,
            };
            self.set_state(next);
        }

        info!("Inverse kinematics loop stopped in state {}", self.state.as_str());

        Ok(())
    }

    /// Run one tracking cycle: solve for the current target and send the command.
    pub fn tracking_cycle(&mut self) -> Result<TrackingReport, CtrlError> {
        let input = TrackingInput {
            elapsed_s: self.shared.elapsed(),
            measured: self
                .shared
                .get_measurement()
                .ok_or(CtrlError::NoMeasurement)?,
        };

        let (cmd, report) = self.tracking.proc(&input)?;

        if let Err(e) = self.sink.send_commands(&cmd) {
            warn!("{}", e);
        }

        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(&report);

        Ok(report)
    }

    fn wait_for_trigger(&mut self) -> bool {
        self.trigger.arm();

        if !self.trigger.wait(&self.shared) {
            return false;
        }

        info!("Starting trajectory tracking");
        self.tracking.start(self.shared.get_pose().as_ref());
        self.shared.set_tracking_active(true);

        true
    }

    fn track(&mut self) -> Result<(), CtrlError> {
        let mut rate = Rate::new(self.frequency_hz);

        while !self.shared.is_shutdown() {
            let report = self.tracking_cycle()?;
            debug!(
                "Target {:?}, {} iterations",
                report.target.position_m.as_slice(),
                report.iterations
            );
            rate.sleep();
        }

        Ok(())
    }

    fn set_state(&mut self, state: IkCtrlState) {
        info!("IK control: {} -> {}", self.state.as_str(), state.as_str());
        self.state = state;
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state = state;
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::kin_model::JointConfiguration;
    use crate::traj_gen::TrajectoryGenerator;
    use crate::{init_pos::InitPosParams, io::OutputError, test_util, traj_gen::TrajParams};

    #[derive(Default)]
    struct Recorder(Vec<JointConfiguration>);

    impl CommandSink for Recorder {
        fn send_commands(&mut self, cmd: &JointConfiguration) -> Result<(), OutputError> {
            self.0.push(cmd.clone());
            Ok(())
        }
    }

    fn ik_loop(radius_m: f64) -> IkCtrlLoop<Recorder> {
        let solver = Arc::new(test_util::iiwa_solver());
        IkCtrlLoop::new(
            Arc::new(SharedControlState::new(7)),
            Arc::new(StartTrigger::new()),
            InitialPositioning::new(&InitPosParams::default(), 7).unwrap(),
            TrackingController::new(
                solver,
                TrajectoryGenerator::new(TrajParams {
                    radius_m,
                    ..Default::default()
                }),
                NoConvergencePolicy::PublishSolverOutput,
            ),
            Recorder::default(),
            200.0,
        )
    }

    #[test]
    fn test_cycle_without_measurement() {
        let mut ik = ik_loop(0.3);
        assert!(matches!(ik.tracking_cycle(), Err(CtrlError::NoMeasurement)));
        assert!(ik.sink.0.is_empty());
    }

    #[test]
    fn test_status_counts() {
        let mut ik = ik_loop(5.0);
        let status = ik.status_handle();
        ik.shared
            .set_measurement(ik.init_pos.reference().clone())
            .unwrap();

        for _ in 0..2 {
            assert!(!ik.tracking_cycle().unwrap().converged);
        }

        // Commands still go out when the solver fails
        assert_eq!(ik.sink.0.len(), 2);

        let status = status.lock().unwrap();
        assert_eq!(status.num_tracking_cycles, 2);
        assert_eq!(status.num_no_convergence, 2);
        assert_eq!(status.num_consec_no_convergence, 2);
        assert_eq!(status.last_ik_iterations, 100);

        let tm = status.to_tm(&ik.shared);
        assert_eq!(tm.state, "WaitForPose");
        assert_eq!(tm.num_no_convergence, 2);
    }

    #[test]
    fn test_consecutive_count_resets() {
        let mut status = StatusReport::default();
        let failed = TrackingReport {
            target: Default::default(),
            converged: false,
            iterations: 100,
            residual: 1.0,
        };
        let good = TrackingReport {
            converged: true,
            iterations: 3,
            residual: 1e-9,
            ..failed.clone()
        };

        status.record(&failed);
        status.record(&failed);
        status.record(&good);

        assert_eq!(status.num_tracking_cycles, 3);
        assert_eq!(status.num_no_convergence, 2);
        assert_eq!(status.num_consec_no_convergence, 0);
        assert_eq!(status.last_ik_iterations, 3);
    }

    #[test]
    fn test_shutdown_while_waiting_for_pose() {
        let ik = ik_loop(0.3);
        let shared = ik.shared.clone();
        let status = ik.status_handle();

        shared.request_shutdown();
        ik.run().unwrap();

        assert_eq!(status.lock().unwrap().state, IkCtrlState::WaitForPose);
        assert!(!shared.tracking_active());
    }
}
