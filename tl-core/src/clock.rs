//! Time source for the sampling loop
//!
//! Timestamps are seconds since the UNIX epoch as `f64`, the same shape the
//! persistence sink stores. The wall clock can step backwards (NTP), so every
//! elapsed-time computation in the crate goes through [`elapsed_between`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of "now" and of the pause between ticks
pub trait Clock {
    /// Current time in seconds since the UNIX epoch
    fn now(&self) -> f64;

    /// Block until the next tick is due
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `SystemTime`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Manually driven clock. Clones share the same time, so a test can keep one
/// handle while the loop owns another. `sleep` advances the time instead of
/// blocking.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, t: f64) {
        self.now.set(t);
    }

    pub fn advance(&self, secs: f64) {
        self.now.set(self.now.get() + secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.advance(duration.as_secs_f64());
    }
}

/// Seconds from `earlier` to `later`, never negative
pub fn elapsed_between(earlier: f64, later: f64) -> f64 {
    (later - earlier).max(0.0)
}
