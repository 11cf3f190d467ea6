//! Device bus abstraction
//!
//! The collector only needs three things from the bus: the ids currently
//! present, the family code of a device, and its raw data record. Each call
//! opens and closes whatever it needs; nothing is held across ticks.

use std::collections::BTreeSet;

use crate::constants::w1;
use crate::error::Result;

/// Source of device ids, metadata and data records
pub trait DeviceBus {
    /// Ids of every slave device currently on the bus
    fn enumerate(&self) -> Result<BTreeSet<String>>;

    /// Family code (hex, upper-case) of a device
    fn read_family(&self, device_id: &str) -> Result<String>;

    /// Raw two-line data record of a device
    fn read_data(&self, device_id: &str) -> Result<DeviceRecord>;
}

/// Two-line record from a w1 thermal slave:
///
/// ```text
/// 72 01 4b 46 7f ff 0e 10 57 : crc=57 YES
/// 72 01 4b 46 7f ff 0e 10 57 t=23125
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub crc_line: String,
    pub data_line: String,
}

impl DeviceRecord {
    pub fn new(crc_line: impl Into<String>, data_line: impl Into<String>) -> Self {
        Self {
            crc_line: crc_line.into(),
            data_line: data_line.into(),
        }
    }

    /// Split a raw file body. Missing lines become empty strings, which then
    /// fail the CRC or temperature parse instead of the read itself.
    pub fn parse(text: &str) -> Self {
        let mut lines = text.lines();
        let crc_line = lines.next().unwrap_or_default();
        let data_line = lines.next().unwrap_or_default();
        Self::new(crc_line, data_line)
    }

    /// Line 1 carries the driver's CRC verdict token
    pub fn crc_ok(&self) -> bool {
        self.crc_line
            .split_whitespace()
            .any(|token| token == w1::CRC_OK_TOKEN)
    }

    /// Raw integer from the `t=` field of line 2
    pub fn raw_temperature(&self) -> Option<i64> {
        self.data_line
            .split_whitespace()
            .nth(w1::TEMPERATURE_FIELD_INDEX)?
            .strip_prefix(w1::TEMPERATURE_PREFIX)?
            .parse::<i64>()
            .ok()
    }
}

/// Pull `key` out of a `KEY=VALUE` per-line metadata record
pub fn metadata_value<'a>(text: &'a str, key: &str) -> Option<&'a str> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
}
