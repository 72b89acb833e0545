//! # Start trigger
//!
//! Tracking only begins once an operator confirms it. The inverse kinematics loop arms the
//! trigger when the arm has reached its initial configuration and then waits for it to be fired,
//! either from the console or by a `StartTrajectory` telecommand. A trigger which has not been
//! armed rejects any attempt to fire it, so a start request sent early is not remembered.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Deserialize;
use std::io::BufRead;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::shared_state::SharedControlState;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// How often a waiting thread checks for shutdown.
const SHUTDOWN_POLL_PERIOD: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct StartTrigger {
    flags: Mutex<TriggerFlags>,
    changed: Condvar,
}

#[derive(Debug, Default, Clone, Copy)]
struct TriggerFlags {
    armed: bool,
    fired: bool,
}

/// Where the start trigger comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum TriggerSource {
    /// A line entered on standard input.
    Console,

    /// Only the `StartTrajectory` telecommand.
    Remote,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StartTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow the trigger to be fired.
    pub fn arm(&self) {
        self.lock().armed = true;
        self.changed.notify_all();
    }

    pub fn is_armed(&self) -> bool {
        self.lock().armed
    }

    pub fn is_fired(&self) -> bool {
        self.lock().fired
    }

    /// Fire the trigger, returning `false` if it was not armed or has already fired.
    pub fn fire(&self) -> bool {
        let mut flags = self.lock();

        if !flags.armed || flags.fired {
            return false;
        }

        flags.fired = true;
        drop(flags);

        self.changed.notify_all();
        true
    }

    /// Block until the trigger has been armed.
    ///
    /// Returns `false` if shutdown was requested first.
    pub fn wait_armed(&self, shared: &SharedControlState) -> bool {
        self.wait_until(shared, |f| f.armed)
    }

    /// Block until the trigger has been fired.
    ///
    /// Returns `false` if shutdown was requested first.
    pub fn wait(&self, shared: &SharedControlState) -> bool {
        self.wait_until(shared, |f| f.fired)
    }

    fn wait_until<F>(&self, shared: &SharedControlState, ready: F) -> bool
    where
        F: Fn(&TriggerFlags) -> bool,
    {
        let mut flags = self.lock();

        loop {
            if ready(&*flags) {
                return true;
            }

            if shared.is_shutdown() {
                return false;
            }

            flags = self
                .changed
                .wait_timeout(flags, SHUTDOWN_POLL_PERIOD)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    fn lock(&self) -> MutexGuard<'_, TriggerFlags> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Start a thread which waits for the trigger to be armed, prompts the operator, and fires the
/// trigger on the first line read from `input`.
///
/// The thread is not joined; it may stay blocked on the input after shutdown.
pub fn spawn_console_trigger<R>(
    trigger: Arc<StartTrigger>,
    shared: Arc<SharedControlState>,
    input: R,
) -> std::io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("console_trigger".into())
        .spawn(move || console_trigger(&trigger, &shared, input))
}

fn console_trigger<R: BufRead>(trigger: &StartTrigger, shared: &SharedControlState, mut input: R) {
    if !trigger.wait_armed(shared) {
        return;
    }

    info!("Press enter to start the trajectory execution");

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => warn!("Console closed, the trajectory can only be started remotely"),
        Ok(_) => {
            if trigger.fire() {
                info!("Start trigger received from the console");
            }
        }
        Err(e) => warn!("Could not read from the console: {}", e),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_fire_requires_arm() {
        let trigger = StartTrigger::new();

        assert!(!trigger.fire());
        assert!(!trigger.is_fired());

        trigger.arm();
        assert!(trigger.fire());
        assert!(trigger.is_fired());

        // Only the first fire is accepted
        assert!(!trigger.fire());
    }

    #[test]
    fn test_wait_cancelled_by_shutdown() {
        let trigger = Arc::new(StartTrigger::new());
        let shared = Arc::new(SharedControlState::new(7));
        trigger.arm();

        let waiter = {
            let (trigger, shared) = (trigger.clone(), shared.clone());
            thread::spawn(move || trigger.wait(&shared))
        };

        thread::sleep(Duration::from_millis(20));
        shared.request_shutdown();

        assert!(!waiter.join().unwrap());
        assert!(!trigger.is_fired());
    }

    #[test]
    fn test_console_fires_after_arm() {
        let trigger = Arc::new(StartTrigger::new());
        let shared = Arc::new(SharedControlState::new(7));

        let jh = spawn_console_trigger(trigger.clone(), shared.clone(), Cursor::new("\n")).unwrap();

        // Not fired before being armed, even though input is ready
        thread::sleep(Duration::from_millis(20));
        assert!(!trigger.is_fired());

        trigger.arm();
        assert!(trigger.wait(&shared));
        jh.join().unwrap();
    }

    #[test]
    fn test_console_closed() {
        let trigger = Arc::new(StartTrigger::new());
        let shared = Arc::new(SharedControlState::new(7));
        trigger.arm();

        spawn_console_trigger(trigger.clone(), shared, Cursor::new(""))
            .unwrap()
            .join()
            .unwrap();

        assert!(!trigger.is_fired());
    }
}
