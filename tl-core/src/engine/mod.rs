//! Sampling engine: per-sensor validation, bus reconciliation and the loop

mod sampler;
mod sensor;
mod topology;

pub use sampler::{LoopSettings, SamplingLoop, TickOutcome};
pub use sensor::Sensor;
pub use topology::{diff_ids, BusTopology, ReconcileReport, SensorDefaults, TopologyDiff};
