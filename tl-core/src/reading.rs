//! Sensor readings with a verdict and a last-known-good snapshot
//!
//! Devices report integers with an implied decimal point (23997 at a scale
//! of 1000 is 23.997). A [`Reading`] keeps that raw value together with the
//! time it was taken and a [`ReadingStatus`] saying whether it can be trusted.
//!
//! When the status is anything but `Valid` the decoded value falls back to
//! the last value that was valid, so callers never see a rejected sample.
//! A reading that has never been valid has no decoded value at all.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Verdict attached to a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    Valid,
    CrcError,
    VarianceError,
    NoReading,
    LostSensor,
    Unknown,
}

impl ReadingStatus {
    /// Numeric code, stable across releases
    pub fn code(self) -> u8 {
        match self {
            Self::Valid => 0x01,
            Self::CrcError => 0x02,
            Self::VarianceError => 0x03,
            Self::NoReading => 0x04,
            Self::LostSensor => 0x05,
            Self::Unknown => 0xF6,
        }
    }

    /// Map a numeric code back to a status. Unrecognised codes become
    /// `Unknown` rather than an error so a bad code never stops sampling.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => Self::Valid,
            0x02 => Self::CrcError,
            0x03 => Self::VarianceError,
            0x04 => Self::NoReading,
            0x05 => Self::LostSensor,
            _ => Self::Unknown,
        }
    }

    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

impl std::fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Valid => "valid",
            Self::CrcError => "crc error",
            Self::VarianceError => "variance error",
            Self::NoReading => "no reading",
            Self::LostSensor => "lost sensor",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Decoded value and time of the most recent valid reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LastValid {
    pub value: f64,
    pub timestamp: f64,
}

/// One sample from a device
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    raw_value: i64,
    scale_factor: f64,
    timestamp: f64,
    status: ReadingStatus,
    last_valid: Option<LastValid>,
}

impl Reading {
    /// Create a reading taken at `timestamp`. A `Valid` reading seeds its own
    /// last-valid snapshot.
    pub fn new(raw_value: i64, scale_factor: f64, status: ReadingStatus, timestamp: f64) -> Self {
        let mut reading = Self {
            raw_value,
            scale_factor,
            timestamp,
            status,
            last_valid: None,
        };
        if status.is_valid() {
            reading.last_valid = Some(reading.snapshot());
        }
        reading
    }

    /// Placeholder for a sensor that has not been read yet
    pub fn empty(scale_factor: f64, timestamp: f64) -> Self {
        Self::new(0, scale_factor, ReadingStatus::NoReading, timestamp)
    }

    /// Replace the raw value. The old value is kept as the last-valid
    /// snapshot if it was valid. The new value has no verdict yet, so the
    /// status drops to `Unknown` until the caller sets one.
    pub fn set_raw_value(&mut self, raw_value: i64, timestamp: f64) {
        if self.status.is_valid() {
            self.last_valid = Some(self.snapshot());
        }
        self.raw_value = raw_value;
        self.timestamp = timestamp;
        self.status = ReadingStatus::Unknown;
    }

    pub fn set_status(&mut self, status: ReadingStatus) {
        self.status = status;
    }

    /// Set the status from its numeric code, coercing unknown codes
    pub fn set_status_code(&mut self, code: u8) {
        self.status = ReadingStatus::from_code(code);
    }

    /// `raw / scale` while valid, otherwise the last valid value
    pub fn decoded_value(&self) -> Option<f64> {
        if self.status.is_valid() {
            Some(self.raw_value as f64 / self.scale_factor)
        } else {
            self.last_valid.map(|lv| lv.value)
        }
    }

    pub fn raw_value(&self) -> i64 {
        self.raw_value
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn status(&self) -> ReadingStatus {
        self.status
    }

    pub fn last_valid(&self) -> Option<LastValid> {
        self.last_valid
    }

    /// Reading time as a UTC date-time
    pub fn utc(&self) -> Option<DateTime<Utc>> {
        let secs = self.timestamp.floor();
        let nanos = ((self.timestamp - secs) * 1e9) as u32;
        Utc.timestamp_opt(secs as i64, nanos).single()
    }

    fn snapshot(&self) -> LastValid {
        LastValid {
            value: self.raw_value as f64 / self.scale_factor,
            timestamp: self.timestamp,
        }
    }
}
