//! Test utilities: an in-memory 1-Wire bus
//!
//! Clones share state, so a test can hand one `FakeBus` to a sensor,
//! topology or loop and keep another to plug, unplug and edit devices.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::error::{Result, ThermologError};
use crate::hw::{DeviceBus, DeviceRecord};

#[derive(Debug, Clone)]
struct FakeDevice {
    family: String,
    record: Option<DeviceRecord>,
}

#[derive(Debug, Default)]
struct FakeBusState {
    devices: BTreeMap<String, FakeDevice>,
    enumeration_fails: bool,
    family_probes: Vec<String>,
    data_reads: usize,
}

#[derive(Debug, Clone, Default)]
pub struct FakeBus {
    state: Rc<RefCell<FakeBusState>>,
}

/// Record the w1_therm driver would produce for `raw` millidegrees
pub fn record(raw: i64, crc_ok: bool) -> DeviceRecord {
    let verdict = if crc_ok { "YES" } else { "NO" };
    DeviceRecord::new(
        format!("72 01 4b 46 7f ff 0e 10 57 : crc=57 {}", verdict),
        format!("72 01 4b 46 7f ff 0e 10 57 t={}", raw),
    )
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plug in a device reporting `raw` millidegrees with a good CRC
    pub fn add(&self, id: &str, family: &str, raw: i64) {
        self.state.borrow_mut().devices.insert(
            id.to_string(),
            FakeDevice { family: family.to_string(), record: Some(record(raw, true)) },
        );
    }

    pub fn remove(&self, id: &str) {
        self.state.borrow_mut().devices.remove(id);
    }

    pub fn set_raw(&self, id: &str, raw: i64) {
        self.set_record(id, record(raw, true));
    }

    pub fn set_record(&self, id: &str, rec: DeviceRecord) {
        if let Some(dev) = self.state.borrow_mut().devices.get_mut(id) {
            dev.record = Some(rec);
        }
    }

    /// Keep the device enumerated but make its data file unreadable
    pub fn make_unreadable(&self, id: &str) {
        if let Some(dev) = self.state.borrow_mut().devices.get_mut(id) {
            dev.record = None;
        }
    }

    pub fn fail_enumeration(&self, fail: bool) {
        self.state.borrow_mut().enumeration_fails = fail;
    }

    /// Ids whose family was probed, in order
    pub fn family_probes(&self) -> Vec<String> {
        self.state.borrow().family_probes.clone()
    }

    pub fn data_reads(&self) -> usize {
        self.state.borrow().data_reads
    }
}

impl DeviceBus for FakeBus {
    fn enumerate(&self) -> Result<BTreeSet<String>> {
        let state = self.state.borrow();
        if state.enumeration_fails {
            return Err(ThermologError::BusEnumeration {
                path: "/fake".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "bus gone"),
            });
        }
        Ok(state.devices.keys().cloned().collect())
    }

    fn read_family(&self, device_id: &str) -> Result<String> {
        let mut state = self.state.borrow_mut();
        state.family_probes.push(device_id.to_string());
        state
            .devices
            .get(device_id)
            .map(|d| d.family.to_ascii_uppercase())
            .ok_or_else(|| ThermologError::metadata_read(device_id, "not present"))
    }

    fn read_data(&self, device_id: &str) -> Result<DeviceRecord> {
        let mut state = self.state.borrow_mut();
        state.data_reads += 1;
        state
            .devices
            .get(device_id)
            .and_then(|d| d.record.clone())
            .ok_or_else(|| ThermologError::device_read(device_id, "not readable"))
    }
}
