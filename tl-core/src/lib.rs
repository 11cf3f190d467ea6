//! Thermolog Core Library
//!
//! Sampling, validation and aggregation of 1-Wire temperature sensors.
//!
//! # Module Structure
//!
//! - `hw/` - bus access (sysfs w1 tree, device families, data records)
//! - `engine/` - per-sensor read state machine, hot-plug topology, sampling loop
//! - `data/` - id validation, reading store, daily snapshot feed
//!
//! # Example
//!
//! ```no_run
//! use tl_core::{ReadingStore, SamplingLoop, Settings, SystemClock, SysfsBus};
//! use std::sync::atomic::AtomicBool;
//!
//! let settings = Settings::default();
//! let store = ReadingStore::open(&settings.storage.store_path).unwrap();
//! let mut sampler = SamplingLoop::new(
//!     SysfsBus::new(&settings.bus.devices_path),
//!     store,
//!     SystemClock,
//!     settings.loop_settings(),
//!     settings.sensor_defaults(),
//! )
//! .unwrap();
//! sampler.run(&AtomicBool::new(false)).unwrap();
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod clock;
pub mod constants;
pub mod error;
pub mod reading;
pub mod settings;
pub mod variance;

#[cfg(test)]
mod test_utils;

pub use clock::{elapsed_between, Clock, ManualClock, SystemClock};
pub use data::{
    is_device_id, validate_device_id, JsonSnapshotFeed, PersistenceSink, ReadingStore,
    SnapshotFeed, SnapshotFile, StoredReading,
};
pub use engine::{
    BusTopology, LoopSettings, ReconcileReport, SamplingLoop, Sensor, SensorDefaults, TickOutcome,
};
pub use error::{Result, ThermologError};
pub use hw::{DeviceBus, DeviceRecord, SensorKind, SysfsBus};
pub use reading::{LastValid, Reading, ReadingStatus};
pub use settings::{load_settings, load_settings_from, resolve_config_path, save_settings, Settings};
pub use variance::VarianceFilter;
