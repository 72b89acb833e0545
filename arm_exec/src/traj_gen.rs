//! # Trajectory generator
//!
//! Produces the Cartesian target followed during tracking: a horizontal circle of fixed radius
//! at a fixed height above the base, traversed at a constant angular rate. The target depends
//! only on trajectory time, never on the state of the arm.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::info;
use nalgebra::{UnitQuaternion, Vector3};
use serde::Deserialize;
use std::f64::consts::PI;

use crate::kin_model::CartesianPose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the circular trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrajParams {
    /// Units: meters
    pub radius_m: f64,

    /// Height of the circle above the base frame origin.
    ///
    /// Units: meters
    pub height_m: f64,

    /// Units: radians/second
    pub angular_rate_rads: f64,

    pub orientation: OrientationMode,
}

/// Attitude demanded along the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum OrientationMode {
    /// Hold the attitude of the base frame.
    Identity,

    /// Hold the attitude the end-effector had when tracking started.
    HoldInitial,
}

#[derive(Debug, Clone)]
pub struct TrajectoryGenerator {
    params: TrajParams,
    attitude_q: UnitQuaternion<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrajParams {
    fn default() -> Self {
        Self {
            radius_m: 0.3,
            height_m: 1.0,
            angular_rate_rads: 1.0 / (2.0 * PI),
            orientation: OrientationMode::Identity,
        }
    }
}

impl TrajectoryGenerator {
    pub fn new(params: TrajParams) -> Self {
        Self {
            params,
            attitude_q: UnitQuaternion::identity(),
        }
    }

    pub fn params(&self) -> &TrajParams {
        &self.params
    }

    /// Called once as tracking starts, with the end-effector pose at that moment.
    ///
    /// In `HoldInitial` mode the attitude of `pose` is used for every later target, otherwise
    /// this has no effect.
    pub fn start(&mut self, pose: Option<&CartesianPose>) {
        if let (OrientationMode::HoldInitial, Some(p)) = (self.params.orientation, pose) {
            self.attitude_q = p.attitude_q;
            info!(
                "Trajectory will hold the initial end-effector attitude {:?}",
                self.attitude_q.euler_angles()
            );
        }
    }

    /// Target pose at trajectory time `elapsed_s`.
    pub fn target_at(&self, elapsed_s: f64) -> CartesianPose {
        let angle = self.params.angular_rate_rads * elapsed_s;

        CartesianPose::new(
            Vector3::new(
                self.params.radius_m * angle.cos(),
                self.params.radius_m * angle.sin(),
                self.params.height_m,
            ),
            self.attitude_q,
        )
    }

    /// Time taken to go once round the circle, or infinity if the rate is zero.
    ///
    /// Units: seconds
    pub fn period_s(&self) -> f64 {
        2.0 * PI / self.params.angular_rate_rads.abs()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_start_point() {
        let gen = TrajectoryGenerator::new(TrajParams::default());
        let target = gen.target_at(0.0);

        assert!((target.position_m - Vector3::new(0.3, 0.0, 1.0)).norm() < 1e-12);
        assert_eq!(target.attitude_q, UnitQuaternion::identity());
    }

    #[test]
    fn test_periodic() {
        let gen = TrajectoryGenerator::new(TrajParams::default());
        let period = gen.period_s();

        // One revolution takes 4 pi^2 seconds at the default rate
        assert!((period - 4.0 * PI * PI).abs() < 1e-12);

        for &t in &[0.0, 1.3, 7.7, 20.0] {
            let a = gen.target_at(t);
            let b = gen.target_at(t + period);
            assert!((a.position_m - b.position_m).norm() < 1e-12);
        }
    }

    #[test]
    fn test_on_circle() {
        let gen = TrajectoryGenerator::new(TrajParams::default());

        for i in 0..50 {
            let p = gen.target_at(i as f64 * 0.5).position_m;
            assert!((p.xy().norm() - 0.3).abs() < 1e-12);
            assert_eq!(p.z, 1.0);
        }

        // Quarter of a revolution
        let quarter = gen.target_at(gen.period_s() / 4.0).position_m;
        assert!(quarter.x.abs() < 1e-12);
        assert!((quarter.y - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_hold_initial() {
        let held = UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3);
        let pose = CartesianPose::new(Vector3::zeros(), held);

        let mut identity = TrajectoryGenerator::new(TrajParams::default());
        identity.start(Some(&pose));
        assert_eq!(identity.target_at(1.0).attitude_q, UnitQuaternion::identity());

        let mut hold = TrajectoryGenerator::new(TrajParams {
            orientation: OrientationMode::HoldInitial,
            ..Default::default()
        });
        hold.start(Some(&pose));
        assert_eq!(hold.target_at(1.0).attitude_q, held);
    }
}
