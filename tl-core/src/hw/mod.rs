//! Hardware interaction modules
//!
//! The bus trait, its sysfs implementation and the family table.

mod bus;
mod family;
mod sysfs;

pub use bus::{metadata_value, DeviceBus, DeviceRecord};
pub use family::SensorKind;
pub use sysfs::SysfsBus;
