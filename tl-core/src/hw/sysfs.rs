//! 1-Wire bus backed by the w1 sysfs tree
//!
//! Layout under the bus root (`/sys/bus/w1/devices` by default):
//!
//! - `<id>/w1_slave` - two-line data record, read triggers a conversion
//! - `<id>/uevent` - `KEY=VALUE` lines, `W1_FAMILY` holds the family code
//! - `w1_bus_masterN` - bus master entries, skipped

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use crate::constants::{paths, w1};
use crate::data::{family_prefix, is_device_id, validate_device_id};
use crate::error::{Result, ThermologError};
use crate::hw::bus::{metadata_value, DeviceBus, DeviceRecord};

#[derive(Debug, Clone)]
pub struct SysfsBus {
    root: PathBuf,
}

impl SysfsBus {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn device_file(&self, device_id: &str, file: &str) -> Result<PathBuf> {
        let id = validate_device_id(device_id)?;
        Ok(self.root.join(id).join(file))
    }
}

impl Default for SysfsBus {
    fn default() -> Self {
        Self::new(paths::W1_DEVICES)
    }
}

impl DeviceBus for SysfsBus {
    fn enumerate(&self) -> Result<BTreeSet<String>> {
        let entries = fs::read_dir(&self.root).map_err(|e| ThermologError::BusEnumeration {
            path: self.root.clone(),
            source: e,
        })?;

        let mut ids = BTreeSet::new();
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if is_device_id(&name) {
                ids.insert(name.into_owned());
            } else {
                trace!("Skipping non-device bus entry {}", name);
            }
        }

        debug!(bus = %self.root.display(), devices = ids.len(), "Enumerated w1 bus");
        Ok(ids)
    }

    fn read_family(&self, device_id: &str) -> Result<String> {
        let path = self.device_file(device_id, paths::UEVENT_FILE)?;
        let text = read_file(&path)
            .map_err(|e| ThermologError::metadata_read(device_id, e.to_string()))?;

        if let Some(family) = metadata_value(&text, w1::FAMILY_KEY) {
            return Ok(family.to_ascii_uppercase());
        }

        // The id starts with the family code, fall back to it
        debug!(device = device_id, "No {} in {}, using id prefix", w1::FAMILY_KEY, path.display());
        family_prefix(device_id).ok_or_else(|| {
            ThermologError::metadata_read(device_id, format!("no {} in {}", w1::FAMILY_KEY, path.display()))
        })
    }

    fn read_data(&self, device_id: &str) -> Result<DeviceRecord> {
        let path = self.device_file(device_id, paths::DATA_FILE)?;
        let text = read_file(&path).map_err(|e| ThermologError::device_read(device_id, e.to_string()))?;
        Ok(DeviceRecord::parse(&text))
    }
}

fn read_file(path: &Path) -> io::Result<String> {
    let mut s = String::new();
    fs::File::open(path)?.read_to_string(&mut s)?;
    Ok(s)
}
