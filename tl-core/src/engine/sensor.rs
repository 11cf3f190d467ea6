//! Read-and-validate state machine for a single sensor
//!
//! Every read attempt ends in exactly one [`ReadingStatus`]:
//!
//! - `LostSensor` - the data record could not be fetched
//! - `CrcError` - the driver flagged a CRC mismatch, or no temperature field
//! - `VarianceError` - the change since the last valid sample is too steep
//! - `Valid` - accepted; the new sample becomes `current`
//!
//! Rejected attempts only change `current`'s status. The value stays the old
//! one, and because the status is no longer `Valid` the decoded value is
//! served from the last-valid snapshot. A stale value never looks fresh.

use std::time::Duration;
use tracing::{debug, trace};

use crate::clock::elapsed_between;
use crate::hw::{DeviceBus, SensorKind};
use crate::reading::{Reading, ReadingStatus};
use crate::variance::VarianceFilter;

#[derive(Debug, Clone)]
pub struct Sensor {
    device_id: String,
    kind: SensorKind,
    scale_factor: f64,
    /// Latest accepted sample, with the verdict of the latest attempt
    pub current: Reading,
    /// What `current` was before the latest successful fetch
    pub previous: Reading,
    variance: VarianceFilter,
    min_read_interval: Option<Duration>,
    last_attempt: Option<f64>,
}

impl Sensor {
    /// New sensor with no reading yet. `created_at` stamps the empty slots.
    pub fn new(device_id: impl Into<String>, kind: SensorKind, created_at: f64) -> Self {
        let scale_factor = kind.scale_factor();
        Self {
            device_id: device_id.into(),
            kind,
            scale_factor,
            current: Reading::empty(scale_factor, created_at),
            previous: Reading::empty(scale_factor, created_at),
            variance: VarianceFilter::default(),
            min_read_interval: None,
            last_attempt: None,
        }
    }

    pub fn with_variance(mut self, variance: VarianceFilter) -> Self {
        self.variance = variance;
        self
    }

    pub fn with_min_read_interval(mut self, interval: Option<Duration>) -> Self {
        self.min_read_interval = interval;
        self
    }

    /// Allow `tolerance` degrees per `period` seconds. `(0, 0)` disables the filter.
    pub fn set_variance(&mut self, tolerance: f64, period: f64) {
        self.variance = VarianceFilter::new(tolerance, period);
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn variance(&self) -> &VarianceFilter {
        &self.variance
    }

    /// Status of the latest attempt
    pub fn status(&self) -> ReadingStatus {
        self.current.status()
    }

    pub fn is_valid(&self) -> bool {
        self.current.status().is_valid()
    }

    /// Current temperature in degrees, or the last valid one
    pub fn temperature(&self) -> Option<f64> {
        self.current.decoded_value()
    }

    /// Fetch and validate a new sample. Returns the verdict of this attempt,
    /// or `None` if the read was throttled and nothing changed.
    ///
    /// Unless `force` is set, a sensor that has been read before is left
    /// alone until `min_read_interval` has passed since the last attempt.
    pub fn read<B: DeviceBus + ?Sized>(&mut self, bus: &B, now: f64, force: bool) -> Option<ReadingStatus> {
        if !force && self.is_throttled(now) {
            trace!(device = %self.device_id, "Read throttled");
            return None;
        }
        Some(self.attempt(bus, now))
    }

    fn attempt<B: DeviceBus + ?Sized>(&mut self, bus: &B, now: f64) -> ReadingStatus {
        self.last_attempt = Some(now);

        let record = match bus.read_data(&self.device_id) {
            Ok(record) => record,
            Err(e) => {
                debug!(device = %self.device_id, error = %e, "Sensor lost");
                self.current.set_status(ReadingStatus::LostSensor);
                return ReadingStatus::LostSensor;
            }
        };

        // Shift before judging: the variance check compares against what was current
        self.previous = self.current.clone();

        let raw = match (record.crc_ok(), record.raw_temperature()) {
            (true, Some(raw)) => raw,
            (crc_ok, raw) => {
                debug!(device = %self.device_id, crc_ok, raw = ?raw, "Rejected record");
                self.current.set_status(ReadingStatus::CrcError);
                return ReadingStatus::CrcError;
            }
        };

        let candidate = Reading::new(raw, self.scale_factor, ReadingStatus::Valid, now);
        if let (Some(prev), Some(curr)) = (self.valid_previous(), candidate.decoded_value()) {
            let elapsed = elapsed_between(self.previous.timestamp(), candidate.timestamp());
            if !self.variance.check(prev, curr, elapsed) {
                debug!(
                    device = %self.device_id,
                    previous = prev,
                    candidate = curr,
                    elapsed,
                    "Rejected sample outside variance bound"
                );
                self.current.set_status(ReadingStatus::VarianceError);
                return ReadingStatus::VarianceError;
            }
        }

        trace!(device = %self.device_id, value = ?candidate.decoded_value(), "Valid sample");
        self.current = candidate;
        ReadingStatus::Valid
    }

    fn is_throttled(&self, now: f64) -> bool {
        if self.current.status() == ReadingStatus::NoReading {
            return false;
        }
        match (self.min_read_interval, self.last_attempt) {
            // A clock that stepped back does not hold the sensor off
            (Some(interval), Some(last)) => {
                now >= last && elapsed_between(last, now) < interval.as_secs_f64()
            }
            _ => false,
        }
    }

    fn valid_previous(&self) -> Option<f64> {
        if self.previous.status().is_valid() {
            self.previous.decoded_value()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{record, FakeBus};

    const ID: &str = "28-000001";

    fn setup(raw: i64) -> (FakeBus, Sensor) {
        let bus = FakeBus::new();
        bus.add(ID, "28", raw);
        let sensor = Sensor::new(ID, SensorKind::Ds18b20, 0.0);
        (bus, sensor)
    }

    #[test]
    fn test_starts_with_no_reading() {
        let (_, sensor) = setup(0);
        assert_eq!(sensor.status(), ReadingStatus::NoReading);
        assert_eq!(sensor.temperature(), None);
    }

    #[test]
    fn test_first_read_is_valid() {
        let (bus, mut sensor) = setup(23997);
        assert_eq!(sensor.read(&bus, 1.0, false), Some(ReadingStatus::Valid));
        assert_eq!(sensor.temperature(), Some(23.997));
    }

    #[test]
    fn test_crc_error_keeps_snapshot() {
        let (bus, mut sensor) = setup(20000);
        sensor.read(&bus, 1.0, false);
        let snapshot = sensor.current.last_valid();

        bus.set_record(ID, record(85000, false));
        assert_eq!(sensor.read(&bus, 2.0, false), Some(ReadingStatus::CrcError));
        assert_eq!(sensor.status(), ReadingStatus::CrcError);
        assert_eq!(sensor.current.last_valid(), snapshot);
        assert_eq!(sensor.temperature(), Some(20.0));
    }

    #[test]
    fn test_crc_error_on_first_read_has_no_value() {
        let (bus, mut sensor) = setup(0);
        bus.set_record(ID, record(21000, false));
        assert_eq!(sensor.read(&bus, 1.0, false), Some(ReadingStatus::CrcError));
        assert_eq!(sensor.temperature(), None);
    }

    #[test]
    fn test_variance_error_rejects_spike() {
        let (bus, mut sensor) = setup(20000);
        sensor.set_variance(1.0, 1.0);
        assert_eq!(sensor.read(&bus, 0.0, false), Some(ReadingStatus::Valid));

        bus.set_raw(ID, 23000);
        assert_eq!(sensor.read(&bus, 1.0, false), Some(ReadingStatus::VarianceError));
        assert_eq!(sensor.current.raw_value(), 20000);
        assert_eq!(sensor.temperature(), Some(20.0));
    }

    #[test]
    fn test_variance_relaxes_with_time() {
        let (bus, mut sensor) = setup(20000);
        sensor.read(&bus, 0.0, false);
        bus.set_raw(ID, 23000);
        assert_eq!(sensor.read(&bus, 3.0, false), Some(ReadingStatus::Valid));
        assert_eq!(sensor.temperature(), Some(23.0));
    }

    #[test]
    fn test_variance_skipped_after_failed_attempt() {
        let (bus, mut sensor) = setup(20000);
        sensor.read(&bus, 0.0, false);
        bus.set_raw(ID, 30000);
        assert_eq!(sensor.read(&bus, 1.0, false), Some(ReadingStatus::VarianceError));
        // Previous is no longer valid, so the next sample is accepted as a fresh start
        assert_eq!(sensor.read(&bus, 2.0, false), Some(ReadingStatus::Valid));
        assert_eq!(sensor.temperature(), Some(30.0));
    }

    #[test]
    fn test_disabled_variance_accepts_any_change() {
        let (bus, mut sensor) = setup(20000);
        sensor.set_variance(0.0, 0.0);
        sensor.read(&bus, 0.0, false);
        bus.set_raw(ID, 90000);
        assert_eq!(sensor.read(&bus, 0.1, false), Some(ReadingStatus::Valid));
    }

    #[test]
    fn test_lost_sensor_leaves_previous_untouched() {
        let (bus, mut sensor) = setup(20000);
        sensor.read(&bus, 0.0, false);
        bus.set_raw(ID, 20500);
        sensor.read(&bus, 1.0, false);
        let previous = sensor.previous.clone();

        bus.make_unreadable(ID);
        assert_eq!(sensor.read(&bus, 2.0, false), Some(ReadingStatus::LostSensor));
        assert_eq!(sensor.previous, previous);
        assert_eq!(sensor.temperature(), Some(20.5));
    }

    #[test]
    fn test_recovers_after_lost() {
        let (bus, mut sensor) = setup(20000);
        sensor.read(&bus, 0.0, false);
        bus.make_unreadable(ID);
        sensor.read(&bus, 1.0, false);
        bus.set_raw(ID, 21000);
        assert_eq!(sensor.read(&bus, 2.0, false), Some(ReadingStatus::Valid));
    }

    #[test]
    fn test_throttle_skips_until_interval() {
        let (bus, sensor) = setup(20000);
        let mut sensor = sensor.with_min_read_interval(Some(Duration::from_millis(750)));

        sensor.read(&bus, 10.0, false);
        assert_eq!(bus.data_reads(), 1);
        sensor.read(&bus, 10.5, false);
        assert_eq!(bus.data_reads(), 1);
        sensor.read(&bus, 10.5, true);
        assert_eq!(bus.data_reads(), 2);
        sensor.read(&bus, 11.3, false);
        assert_eq!(bus.data_reads(), 3);
    }

    #[test]
    fn test_throttle_released_when_clock_steps_back() {
        let (bus, sensor) = setup(20000);
        let mut sensor = sensor.with_min_read_interval(Some(Duration::from_secs(60)));

        sensor.read(&bus, 1000.0, false);
        assert_eq!(sensor.read(&bus, 10.0, false), Some(ReadingStatus::Valid));
        assert_eq!(bus.data_reads(), 2);
        assert_eq!(sensor.read(&bus, 20.0, false), None);
    }

    #[test]
    fn test_throttle_ignored_before_first_reading() {
        let (bus, sensor) = setup(20000);
        let mut sensor = sensor.with_min_read_interval(Some(Duration::from_secs(60)));
        bus.make_unreadable(ID);
        sensor.read(&bus, 0.0, false);
        // LostSensor is a status, so the throttle now applies
        sensor.read(&bus, 1.0, false);
        assert_eq!(bus.data_reads(), 1);

        let (bus, sensor) = setup(20000);
        let mut sensor = sensor.with_min_read_interval(Some(Duration::from_secs(60)));
        assert_eq!(sensor.status(), ReadingStatus::NoReading);
        sensor.read(&bus, 0.0, false);
        assert_eq!(bus.data_reads(), 1);
    }
}
