//! # Forward kinematics loop
//!
//! Runs at the base control frequency. Each cycle computes the end-effector pose from the latest
//! measurement, publishes it, advances the trajectory clock by one period and stores the pose in
//! the shared state, which opens the pose gate after the first cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

use util::time::Rate;

use crate::io::PoseSink;
use crate::kin_model::CartesianPose;
use crate::kin_solver::KinematicSolver;
use crate::shared_state::{SharedControlState, StalenessMonitor};
use crate::CtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct FkLoop<P: PoseSink> {
    solver: Arc<KinematicSolver>,
    shared: Arc<SharedControlState>,
    sink: P,
    frequency_hz: f64,
    staleness: StalenessMonitor,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<P: PoseSink> FkLoop<P> {
    pub fn new(
        solver: Arc<KinematicSolver>,
        shared: Arc<SharedControlState>,
        sink: P,
        frequency_hz: f64,
        measurement_timeout: Option<Duration>,
    ) -> Self {
        Self {
            solver,
            shared,
            sink,
            frequency_hz,
            staleness: StalenessMonitor::new(measurement_timeout),
        }
    }

    /// Run one cycle. Does nothing and returns `None` if no measurement has been received yet.
    pub fn cycle(&mut self) -> Option<CartesianPose> {
        let q = self.shared.get_measurement()?;

        self.staleness.check(self.shared.measurement_age());

        let pose = self.solver.forward(&q);

        if let Err(e) = self.sink.publish_pose(&pose) {
            warn!("{}", e);
        }

        self.shared.tick_clock(1.0 / self.frequency_hz);
        self.shared.set_pose(pose);

        Some(pose)
    }

    /// Wait for the first measurement then cycle until shutdown.
    pub fn run(mut self) -> Result<(), CtrlError> {
        info!("Waiting for the first joint state");

        if !self.shared.wait_for_measurement() {
            return Ok(());
        }

        info!("Joint states received, forward kinematics running");

        let mut rate = Rate::new(self.frequency_hz);

        while !self.shared.is_shutdown() {
            self.cycle();
            rate.sleep();
        }

        info!("Forward kinematics loop stopped");

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
