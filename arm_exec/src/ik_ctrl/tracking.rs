//! Trajectory tracking controller

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use std::sync::Arc;

use util::module::State;

use super::NoConvergencePolicy;
use crate::kin_model::{CartesianPose, JointConfiguration};
use crate::kin_solver::{KinematicSolver, SolverError};
use crate::traj_gen::TrajectoryGenerator;
use crate::CtrlError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Solves inverse kinematics for the trajectory target once per cycle.
pub struct TrackingController {
    solver: Arc<KinematicSolver>,
    traj: TrajectoryGenerator,
    policy: NoConvergencePolicy,

    /// Output of the last converged solve.
    last_good: Option<JointConfiguration>,
}

#[derive(Debug, Clone)]
pub struct TrackingInput {
    /// Trajectory time.
    ///
    /// Units: seconds
    pub elapsed_s: f64,

    /// Latest measured configuration, used to seed the solver.
    pub measured: JointConfiguration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingReport {
    pub target: CartesianPose,
    pub converged: bool,
    pub iterations: u32,
    pub residual: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrackingController {
    pub fn new(
        solver: Arc<KinematicSolver>,
        traj: TrajectoryGenerator,
        policy: NoConvergencePolicy,
    ) -> Self {
        Self {
            solver,
            traj,
            policy,
            last_good: None,
        }
    }

    /// Prepare the trajectory for tracking from the given end-effector pose.
    pub fn start(&mut self, pose: Option<&CartesianPose>) {
        self.traj.start(pose);
    }
}

impl State for TrackingController {
    type InputData = TrackingInput;
    type OutputData = JointConfiguration;
    type StatusReport = TrackingReport;
    type ProcError = CtrlError;

    /// Compute the joint command for the current trajectory time.
    ///
    /// A solve which does not converge is not an error: the command is chosen by the
    /// no-convergence policy and the report records the failure.
    fn proc(
        &mut self,
        input: &TrackingInput,
    ) -> Result<(JointConfiguration, TrackingReport), CtrlError> {
        let target = self.traj.target_at(input.elapsed_s);

        match self.solver.inverse_position(&input.measured, &target) {
            Ok(sol) => {
                self.last_good = Some(sol.configuration.clone());

                Ok((
                    sol.configuration,
                    TrackingReport {
                        target,
                        converged: true,
                        iterations: sol.iterations,
                        residual: sol.residual,
                    },
                ))
            }
            Err(SolverError::NoConvergence {
                partial,
                iterations,
                residual,
            }) => {
                warn!(
                    "IK failed to converge at t = {:.3} s after {} iterations (residual {:.3e})",
                    input.elapsed_s, iterations, residual
                );

                let cmd = match (self.policy, &self.last_good) {
                    (NoConvergencePolicy::HoldLastGood, Some(q)) => q.clone(),
                    _ => partial,
                };

                Ok((
                    cmd,
                    TrackingReport {
                        target,
                        converged: false,
                        iterations,
                        residual,
                    },
                ))
            }
            Err(e) => Err(e.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util;
    use crate::traj_gen::TrajParams;

    fn reference() -> JointConfiguration {
        JointConfiguration::new(vec![0.0, 1.57, 0.0, 1.57, 0.0, 0.0, 0.0], 7).unwrap()
    }

    fn controller(radius_m: f64, policy: NoConvergencePolicy) -> TrackingController {
        TrackingController::new(
            Arc::new(test_util::iiwa_solver()),
            TrajectoryGenerator::new(TrajParams {
                radius_m,
                ..Default::default()
            }),
            policy,
        )
    }

    #[test]
    fn test_tracks_target() {
        let mut ctrl = controller(0.3, NoConvergencePolicy::PublishSolverOutput);
        let input = TrackingInput {
            elapsed_s: 0.0,
            measured: reference(),
        };

        let (cmd, report) = ctrl.proc(&input).unwrap();

        assert!(report.converged);
        assert!(report.residual < 1e-6);
        let reached = ctrl.solver.forward(&cmd);
        assert!(reached.position_error(&report.target) < 1e-6);
        assert_eq!(ctrl.last_good, Some(cmd));
    }

    #[test]
    fn test_no_convergence_publishes_partial() {
        let mut ctrl = controller(5.0, NoConvergencePolicy::PublishSolverOutput);
        let input = TrackingInput {
            elapsed_s: 0.0,
            measured: reference(),
        };

        let (cmd, report) = ctrl.proc(&input).unwrap();

        assert!(!report.converged);
        assert_eq!(report.iterations, 100);
        assert_eq!(cmd.len(), 7);
        assert_ne!(cmd, reference());
    }

    #[test]
    fn test_no_convergence_holds_last_good() {
        let mut ctrl = controller(0.3, NoConvergencePolicy::HoldLastGood);
        let input = TrackingInput {
            elapsed_s: 0.0,
            measured: reference(),
        };
        let (good, _) = ctrl.proc(&input).unwrap();

        // Move the circle out of reach
        ctrl.traj = TrajectoryGenerator::new(TrajParams {
            radius_m: 5.0,
            ..Default::default()
        });

        let (cmd, report) = ctrl.proc(&input).unwrap();
        assert!(!report.converged);
        assert_eq!(cmd, good);
    }
}
