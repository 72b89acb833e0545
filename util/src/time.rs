//! General time utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Fixed frequency cycle timer.
///
/// Call [`Rate::sleep`] at the end of each cycle to block until the start of
/// the next one. Deadlines advance by exactly one period so the loop does not
/// drift; after an overrun the schedule restarts from the current instant.
#[derive(Debug)]
pub struct Rate {
    period: Duration,
    cycle_start: Instant,

    /// Number of consecutive cycles which took longer than the period.
    pub num_consec_overruns: u64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Rate {
    /// Create a new rate running at the given frequency.
    ///
    /// # Panics
    /// - If `frequency_hz` is not strictly positive and finite.
    pub fn new(frequency_hz: f64) -> Self {
        assert!(
            frequency_hz.is_finite() && frequency_hz > 0.0,
            "Rate frequency must be positive, got {}",
            frequency_hz
        );

        Self {
            period: Duration::from_secs_f64(1.0 / frequency_hz),
            cycle_start: Instant::now(),
            num_consec_overruns: 0,
        }
    }

    /// The target period of one cycle.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Sleep until the start of the next cycle.
    pub fn sleep(&mut self) {
        let now = Instant::now();
        let cycle_dur = now - self.cycle_start;

        match self.period.checked_sub(cycle_dur) {
            Some(d) => {
                self.num_consec_overruns = 0;
                thread::sleep(d);
                self.cycle_start += self.period;
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - self.period.as_secs_f64()
                );
                self.num_consec_overruns += 1;
                self.cycle_start = now;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}
