//! Slew-rate filter for rejecting spikes
//!
//! Temperature can legitimately drift further the longer it has been since
//! the last sample, so the allowed change grows linearly with elapsed time:
//! `|curr - prev| <= tolerance * period * elapsed`.

use crate::constants::variance as defaults;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarianceFilter {
    tolerance: f64,
    period: f64,
}

impl VarianceFilter {
    /// Negative inputs are clamped to zero.
    pub fn new(tolerance: f64, period: f64) -> Self {
        Self {
            tolerance: tolerance.max(0.0),
            period: period.max(0.0),
        }
    }

    /// Filter that accepts every change
    pub fn disabled() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn is_disabled(&self) -> bool {
        self.tolerance == 0.0 && self.period == 0.0
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// True when moving from `prev` to `curr` in `elapsed` seconds is within bounds
    pub fn check(&self, prev: f64, curr: f64, elapsed: f64) -> bool {
        if self.is_disabled() {
            return true;
        }
        let diff = (curr - prev).abs();
        diff <= self.tolerance * self.period * elapsed.max(0.0)
    }
}

impl Default for VarianceFilter {
    fn default() -> Self {
        Self::new(defaults::DEFAULT_TOLERANCE, defaults::DEFAULT_PERIOD)
    }
}
