//! Simulated robot and helpers shared by the scenario tests

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arm_lib::{
    fk_loop::FkLoop,
    ik_ctrl::{IkCtrlLoop, NoConvergencePolicy, StatusHandle, TrackingController},
    init_pos::{InitPosParams, InitialPositioning},
    io::{CommandSink, OutputError, PoseSink},
    kin_model::{CartesianPose, Chain, JointConfiguration, RobotDescription},
    kin_solver::{KinematicSolver, SolverParams},
    shared_state::SharedControlState,
    supervisor::Supervisor,
    traj_gen::{TrajParams, TrajectoryGenerator},
    trigger::StartTrigger,
};

pub const IIWA_DESCRIPTION: &str = include_str!("../../../params/lbr_iiwa.toml");

pub const FK_FREQUENCY_HZ: f64 = 100.0;

pub fn iiwa_solver() -> KinematicSolver {
    let desc = RobotDescription::from_toml_str(IIWA_DESCRIPTION).unwrap();
    let chain = Chain::build(&desc, "lbr_iiwa_link_0", "lbr_iiwa_link_7").unwrap();
    KinematicSolver::new(chain, SolverParams::default())
}

/// Joint controllers which reach every commanded position immediately, by writing the command
/// straight back as the next measurement.
pub struct SimRobot {
    shared: Arc<SharedControlState>,
    pub log: Arc<Mutex<Vec<(bool, JointConfiguration)>>>,
}

impl CommandSink for SimRobot {
    fn send_commands(&mut self, cmd: &JointConfiguration) -> Result<(), OutputError> {
        let tracking = self.shared.tracking_active();
        self.log.lock().unwrap().push((tracking, cmd.clone()));
        self.shared.set_measurement(cmd.clone()).unwrap();
        Ok(())
    }
}

pub struct PoseLog(pub Arc<Mutex<Vec<CartesianPose>>>);

impl PoseSink for PoseLog {
    fn publish_pose(&mut self, pose: &CartesianPose) -> Result<(), OutputError> {
        self.0.lock().unwrap().push(*pose);
        Ok(())
    }
}

/// A running pair of control loops driving the simulated robot.
pub struct Scenario {
    pub shared: Arc<SharedControlState>,
    pub trigger: Arc<StartTrigger>,
    pub status: StatusHandle,
    pub commands: Arc<Mutex<Vec<(bool, JointConfiguration)>>>,
    pub poses: Arc<Mutex<Vec<CartesianPose>>>,
    pub supervisor: Supervisor,
}

impl Scenario {
    pub fn start(traj: TrajParams, ik_frequency_hz: f64) -> Self {
        let solver = Arc::new(iiwa_solver());
        let shared = Arc::new(SharedControlState::new(7));
        let trigger = Arc::new(StartTrigger::new());
        let commands = Arc::new(Mutex::new(Vec::new()));
        let poses = Arc::new(Mutex::new(Vec::new()));

        let fk_loop = FkLoop::new(
            solver.clone(),
            shared.clone(),
            PoseLog(poses.clone()),
            FK_FREQUENCY_HZ,
            Some(Duration::from_millis(500)),
        );

        let init_params = InitPosParams {
            poll_frequency_hz: 50.0,
            settle_time_s: 0.0,
            ..Default::default()
        };

        let ik_loop = IkCtrlLoop::new(
            shared.clone(),
            trigger.clone(),
            InitialPositioning::new(&init_params, 7).unwrap(),
            TrackingController::new(
                solver,
                TrajectoryGenerator::new(traj),
                NoConvergencePolicy::PublishSolverOutput,
            ),
            SimRobot {
                shared: shared.clone(),
                log: commands.clone(),
            },
            ik_frequency_hz,
        );
        let status = ik_loop.status_handle();

        let supervisor = Supervisor::start(shared.clone(), fk_loop, ik_loop).unwrap();

        Self {
            shared,
            trigger,
            status,
            commands,
            poses,
            supervisor,
        }
    }

    /// Stop both loops and check they stopped cleanly.
    pub fn stop(self) {
        self.shared.request_shutdown();
        self.supervisor.join().unwrap();
    }
}

/// Poll `cond` until it holds, failing the test after `timeout`.
pub fn wait_until<F: Fn() -> bool>(timeout: Duration, cond: F) {
    let deadline = Instant::now() + timeout;

    while !cond() {
        assert!(Instant::now() < deadline, "Timed out waiting for condition");
        std::thread::sleep(Duration::from_millis(5));
    }
}

pub fn reference() -> JointConfiguration {
    JointConfiguration::new(vec![0.0, 1.57, 0.0, 1.57, 0.0, 0.0, 0.0], 7).unwrap()
}
