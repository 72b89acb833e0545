//! # Shared control state
//!
//! All data exchanged between the joint state source, the forward kinematics loop and the inverse
//! kinematics loop lives in a single record behind one mutex. Every accessor takes the lock for
//! the duration of the access only, so readers always see a complete value. The condition
//! variable is notified whenever a readiness gate opens or shutdown is requested, which lets the
//! loops block on a gate instead of polling it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::kin_model::{CartesianPose, JointConfiguration, MeasurementError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// State shared by the control loops.
#[derive(Debug)]
pub struct SharedControlState {
    num_joints: usize,
    record: Mutex<ControlRecord>,
    changed: Condvar,
}

#[derive(Debug, Default)]
struct ControlRecord {
    /// Latest measured configuration and the time it was received.
    measurement: Option<(JointConfiguration, Instant)>,

    /// Latest end-effector pose computed from a measurement.
    pose: Option<CartesianPose>,

    /// Trajectory time, only advanced while tracking is active.
    ///
    /// Units: seconds
    elapsed_s: f64,

    tracking_active: bool,

    shutdown: bool,
}

/// Warns once when measurements stop arriving, and once when they resume.
#[derive(Debug)]
pub struct StalenessMonitor {
    timeout: Option<Duration>,
    stale: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SharedControlState {
    /// Create an empty state for a chain with `num_joints` joints. Both readiness gates start
    /// closed, the clock at zero and tracking inactive.
    pub fn new(num_joints: usize) -> Self {
        Self {
            num_joints,
            record: Mutex::new(ControlRecord::default()),
            changed: Condvar::new(),
        }
    }

    pub fn num_joints(&self) -> usize {
        self.num_joints
    }

    /// Store a new measurement, replacing the previous one and opening the measurement gate.
    pub fn set_measurement(&self, q: JointConfiguration) -> Result<(), MeasurementError> {
        if q.len() != self.num_joints {
            return Err(MeasurementError::WrongLength {
                expected: self.num_joints,
                actual: q.len(),
            });
        }

        let mut record = self.lock();
        let first = record.measurement.is_none();
        record.measurement = Some((q, Instant::now()));
        drop(record);

        if first {
            self.changed.notify_all();
        }

        Ok(())
    }

    /// The most recent measurement, or `None` if none has been received yet.
    pub fn get_measurement(&self) -> Option<JointConfiguration> {
        self.lock().measurement.as_ref().map(|(q, _)| q.clone())
    }

    /// Time since the most recent measurement was received.
    pub fn measurement_age(&self) -> Option<Duration> {
        self.lock().measurement.as_ref().map(|(_, t)| t.elapsed())
    }

    pub fn has_measurement(&self) -> bool {
        self.lock().measurement.is_some()
    }

    /// Store a new end-effector pose, opening the pose gate.
    pub fn set_pose(&self, pose: CartesianPose) {
        let mut record = self.lock();
        let first = record.pose.is_none();
        record.pose = Some(pose);
        drop(record);

        if first {
            self.changed.notify_all();
        }
    }

    pub fn get_pose(&self) -> Option<CartesianPose> {
        self.lock().pose
    }

    pub fn has_pose(&self) -> bool {
        self.lock().pose.is_some()
    }

    /// Advance the trajectory clock by `dt_s` if tracking is active, returning the new time.
    pub fn tick_clock(&self, dt_s: f64) -> f64 {
        let mut record = self.lock();
        if record.tracking_active {
            record.elapsed_s += dt_s;
        }
        record.elapsed_s
    }

    /// Trajectory time since tracking started.
    ///
    /// Units: seconds
    pub fn elapsed(&self) -> f64 {
        self.lock().elapsed_s
    }

    pub fn set_tracking_active(&self, active: bool) {
        self.lock().tracking_active = active;
    }

    pub fn tracking_active(&self) -> bool {
        self.lock().tracking_active
    }

    /// Ask every loop to stop and wake any thread waiting on a gate.
    pub fn request_shutdown(&self) {
        let mut record = self.lock();
        if !record.shutdown {
            info!("Shutdown requested");
        }
        record.shutdown = true;
        drop(record);

        self.changed.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    /// Block until the first measurement has been received.
    ///
    /// Returns `false` if shutdown was requested first.
    pub fn wait_for_measurement(&self) -> bool {
        self.wait_until(|r| r.measurement.is_some())
    }

    /// Block until the first pose has been computed.
    ///
    /// Returns `false` if shutdown was requested first.
    pub fn wait_for_pose(&self) -> bool {
        self.wait_until(|r| r.pose.is_some())
    }

    /// Sleep for `duration`, waking early on shutdown.
    ///
    /// Returns `false` if shutdown was requested.
    pub fn sleep_unless_shutdown(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let mut record = self.lock();

        while !record.shutdown {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }

            record = self
                .changed
                .wait_timeout(record, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        false
    }

    fn wait_until<F>(&self, ready: F) -> bool
    where
        F: Fn(&ControlRecord) -> bool,
    {
        let mut record = self.lock();

        while !record.shutdown {
            if ready(&*record) {
                return true;
            }

            record = self
                .changed
                .wait(record)
                .unwrap_or_else(PoisonError::into_inner);
        }

        false
    }

    /// Poisoning is ignored, fields are only ever replaced whole.
    fn lock(&self) -> MutexGuard<'_, ControlRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StalenessMonitor {
    /// A monitor with no timeout never reports stale measurements.
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            stale: false,
        }
    }

    /// Check the age of the latest measurement, returning whether it is stale.
    pub fn check(&mut self, age: Option<Duration>) -> bool {
        let (timeout, age) = match (self.timeout, age) {
            (Some(t), Some(a)) => (t, a),
            _ => return false,
        };

        if age > timeout && !self.stale {
            warn!(
                "No joint state received for {:.2} s, continuing with the last measurement",
                age.as_secs_f64()
            );
            self.stale = true;
        } else if age <= timeout && self.stale {
            info!("Joint states resumed");
            self.stale = false;
        }

        self.stale
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_initial_state() {
        let state = SharedControlState::new(7);

        assert!(!state.has_measurement());
        assert!(!state.has_pose());
        assert!(state.get_measurement().is_none());
        assert!(state.get_pose().is_none());
        assert!(!state.tracking_active());
        assert_eq!(state.elapsed(), 0.0);
        assert!(!state.is_shutdown());
    }

    #[test]
    fn test_measurement_replaced() {
        let state = SharedControlState::new(2);

        state.set_measurement(JointConfiguration::zeros(2)).unwrap();
        let q = JointConfiguration::new(vec![0.1, 0.2], 2).unwrap();
        state.set_measurement(q.clone()).unwrap();

        assert_eq!(state.get_measurement(), Some(q));
        assert!(state.measurement_age().unwrap() < Duration::from_secs(1));
    }

    #[test]
    fn test_measurement_wrong_length() {
        let state = SharedControlState::new(7);

        assert_eq!(
            state.set_measurement(JointConfiguration::zeros(6)),
            Err(MeasurementError::WrongLength {
                expected: 7,
                actual: 6
            })
        );
        assert!(!state.has_measurement());
    }

    #[test]
    fn test_clock_only_runs_while_tracking() {
        let state = SharedControlState::new(7);

        assert_eq!(state.tick_clock(0.02), 0.0);
        assert_eq!(state.tick_clock(0.02), 0.0);

        state.set_tracking_active(true);
        state.tick_clock(0.02);
        state.tick_clock(0.02);

        assert!((state.elapsed() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn test_gate_wakes_waiter() {
        let state = Arc::new(SharedControlState::new(7));

        let waiter = {
            let state = state.clone();
            thread::spawn(move || state.wait_for_pose())
        };

        thread::sleep(Duration::from_millis(20));
        state.set_pose(CartesianPose::default());

        assert!(waiter.join().unwrap());
    }

    #[test]
    fn test_shutdown_wakes_waiters() {
        let state = Arc::new(SharedControlState::new(7));

        let waiters: Vec<_> = (0..2)
            .map(|i| {
                let state = state.clone();
                thread::spawn(move || {
                    if i == 0 {
                        state.wait_for_measurement()
                    } else {
                        state.sleep_unless_shutdown(Duration::from_secs(60))
                    }
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(20));
        state.request_shutdown();

        for w in waiters {
            assert!(!w.join().unwrap());
        }
    }

    #[test]
    fn test_sleep_runs_to_deadline() {
        let state = SharedControlState::new(7);
        let start = Instant::now();

        assert!(state.sleep_unless_shutdown(Duration::from_millis(30)));
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_staleness_monitor() {
        let mut monitor = StalenessMonitor::new(Some(Duration::from_millis(100)));

        assert!(!monitor.check(None));
        assert!(!monitor.check(Some(Duration::from_millis(50))));
        assert!(monitor.check(Some(Duration::from_millis(150))));
        assert!(monitor.check(Some(Duration::from_millis(200))));
        assert!(!monitor.check(Some(Duration::from_millis(10))));

        let mut disabled = StalenessMonitor::new(None);
        assert!(!disabled.check(Some(Duration::from_secs(100))));
    }
}
