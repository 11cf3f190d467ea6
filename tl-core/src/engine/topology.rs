//! Hot-plug reconciliation of the sensors on a bus
//!
//! The topology maps device id to the [`Sensor`] it owns. On every refresh
//! the freshly enumerated id set is diffed against the known ids: retained
//! sensors keep their state, new ids are probed for their family and get a
//! sensor if the family is supported, and vanished ids are dropped together
//! with their history. A device that comes back later starts from scratch.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::Sensor;
use crate::error::{Result, ThermologError};
use crate::hw::{DeviceBus, SensorKind};
use crate::variance::VarianceFilter;

/// Outcome of diffing known ids against a fresh enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyDiff {
    pub retained: BTreeSet<String>,
    pub added: BTreeSet<String>,
    pub removed: BTreeSet<String>,
}

impl TopologyDiff {
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Pure set diff between known and freshly enumerated ids
pub fn diff_ids<'a, K>(known: K, fresh: &BTreeSet<String>) -> TopologyDiff
where
    K: IntoIterator<Item = &'a String>,
{
    let known: BTreeSet<&String> = known.into_iter().collect();
    let mut diff = TopologyDiff::default();
    for id in &known {
        if fresh.contains(*id) {
            diff.retained.insert((*id).clone());
        } else {
            diff.removed.insert((*id).clone());
        }
    }
    for id in fresh {
        if !known.contains(id) {
            diff.added.insert(id.clone());
        }
    }
    diff
}

/// Settings applied to every sensor the topology creates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorDefaults {
    pub variance: VarianceFilter,
    pub min_read_interval: Option<Duration>,
}

impl Default for SensorDefaults {
    fn default() -> Self {
        Self {
            variance: VarianceFilter::default(),
            min_read_interval: None,
        }
    }
}

/// Report of one reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Ids that got a new sensor
    pub created: BTreeSet<String>,
    /// Ids that were dropped
    pub dropped: BTreeSet<String>,
    /// New ids that were present but not instantiable
    pub ignored: BTreeSet<String>,
}

#[derive(Debug, Default)]
pub struct BusTopology {
    sensors: BTreeMap<String, Sensor>,
    defaults: SensorDefaults,
}

impl BusTopology {
    pub fn new(defaults: SensorDefaults) -> Self {
        Self {
            sensors: BTreeMap::new(),
            defaults,
        }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn get(&self, device_id: &str) -> Option<&Sensor> {
        self.sensors.get(device_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.sensors.keys()
    }

    pub fn sensors(&self) -> impl Iterator<Item = &Sensor> {
        self.sensors.values()
    }

    pub fn sensors_mut(&mut self) -> impl Iterator<Item = &mut Sensor> {
        self.sensors.values_mut()
    }

    /// Enumerate the bus and reconcile against the result
    pub fn refresh<B: DeviceBus + ?Sized>(&mut self, bus: &B, now: f64) -> Result<ReconcileReport> {
        let ids = bus.enumerate()?;
        self.reconcile(bus, &ids, now)
    }

    /// Bring the sensor map in line with `new_ids`
    pub fn reconcile<B: DeviceBus + ?Sized>(
        &mut self,
        bus: &B,
        new_ids: &BTreeSet<String>,
        now: f64,
    ) -> Result<ReconcileReport> {
        let diff = diff_ids(self.sensors.keys(), new_ids);
        if diff.is_unchanged() {
            return Ok(ReconcileReport::default());
        }

        let mut report = ReconcileReport::default();

        for id in &diff.removed {
            self.sensors.remove(id);
            info!(device = %id, "Sensor removed from bus");
            report.dropped.insert(id.clone());
        }

        for id in &diff.added {
            match self.instantiate(bus, id, now) {
                Some(sensor) => {
                    info!(device = %id, model = %sensor.kind(), "Sensor added");
                    self.sensors.insert(id.clone(), sensor);
                    report.created.insert(id.clone());
                }
                None => {
                    report.ignored.insert(id.clone());
                }
            }
        }

        self.check_consistency(new_ids, &diff, &report)?;
        Ok(report)
    }

    fn instantiate<B: DeviceBus + ?Sized>(&self, bus: &B, id: &str, now: f64) -> Option<Sensor> {
        let family = match bus.read_family(id) {
            Ok(family) => family,
            Err(e) => {
                warn!(device = %id, error = %e, "Could not probe device family, ignoring");
                return None;
            }
        };
        match SensorKind::from_family_code(&family) {
            Some(kind) => Some(
                Sensor::new(id, kind, now)
                    .with_variance(self.defaults.variance)
                    .with_min_read_interval(self.defaults.min_read_interval),
            ),
            None => {
                debug!(device = %id, family = %family, "Unsupported device family, ignoring");
                None
            }
        }
    }

    /// The map must hold exactly the retained and created ids, all of them
    /// present in the enumeration.
    fn check_consistency(
        &self,
        new_ids: &BTreeSet<String>,
        diff: &TopologyDiff,
        report: &ReconcileReport,
    ) -> Result<()> {
        let expected = diff.retained.len() + report.created.len();
        let stray = self.sensors.keys().any(|id| !new_ids.contains(id));
        if self.sensors.len() != expected || stray {
            return Err(ThermologError::TopologyInconsistent {
                expected,
                actual: self.sensors.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::ReadingStatus;
    use crate::test_utils::FakeBus;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_ids() {
        let known = ids(&["28-00000a", "28-00000b"]);
        let diff = diff_ids(known.iter(), &ids(&["28-00000b", "28-00000c"]));
        assert_eq!(diff.retained, ids(&["28-00000b"]));
        assert_eq!(diff.added, ids(&["28-00000c"]));
        assert_eq!(diff.removed, ids(&["28-00000a"]));
        assert!(!diff.is_unchanged());
    }

    #[test]
    fn test_retain_add_drop() {
        let bus = FakeBus::new();
        bus.add("28-00000a", "28", 20000);
        bus.add("28-00000b", "28", 21000);
        let mut topo = BusTopology::default();
        topo.refresh(&bus, 0.0).unwrap();
        assert_eq!(topo.len(), 2);

        for sensor in topo.sensors_mut() {
            sensor.read(&bus, 1.0, true);
        }

        bus.remove("28-00000a");
        bus.add("28-00000c", "28", 22000);
        let report = topo.refresh(&bus, 2.0).unwrap();

        assert_eq!(report.created, ids(&["28-00000c"]));
        assert_eq!(report.dropped, ids(&["28-00000a"]));
        assert_eq!(topo.ids().cloned().collect::<BTreeSet<_>>(), ids(&["28-00000b", "28-00000c"]));

        // Retained sensor kept its state, the new one has none
        let b = topo.get("28-00000b").unwrap();
        assert_eq!(b.status(), ReadingStatus::Valid);
        assert_eq!(b.temperature(), Some(21.0));
        assert_eq!(topo.get("28-00000c").unwrap().status(), ReadingStatus::NoReading);
    }

    #[test]
    fn test_retained_sensors_not_reprobed() {
        let bus = FakeBus::new();
        bus.add("28-00000a", "28", 20000);
        let mut topo = BusTopology::default();
        topo.refresh(&bus, 0.0).unwrap();
        bus.add("28-00000b", "28", 20000);
        topo.refresh(&bus, 1.0).unwrap();
        assert_eq!(bus.family_probes(), vec!["28-00000a", "28-00000b"]);
    }

    #[test]
    fn test_unsupported_family_ignored() {
        let bus = FakeBus::new();
        bus.add("28-00000a", "28", 20000);
        bus.add("1d-00000e", "1D", 0);
        bus.add("3b-00000f", "3b", 19000);
        let mut topo = BusTopology::default();
        let report = topo.refresh(&bus, 0.0).unwrap();
        assert_eq!(report.created, ids(&["28-00000a", "3b-00000f"]));
        assert_eq!(report.ignored, ids(&["1d-00000e"]));
        assert_eq!(topo.get("3b-00000f").unwrap().kind(), SensorKind::Ds1825);
    }

    #[test]
    fn test_reappearing_device_starts_fresh() {
        let bus = FakeBus::new();
        bus.add("28-00000a", "28", 20000);
        let mut topo = BusTopology::default();
        topo.refresh(&bus, 0.0).unwrap();
        for sensor in topo.sensors_mut() {
            sensor.read(&bus, 0.5, true);
        }

        bus.remove("28-00000a");
        topo.refresh(&bus, 1.0).unwrap();
        assert!(topo.is_empty());

        bus.add("28-00000a", "28", 20000);
        topo.refresh(&bus, 2.0).unwrap();
        assert_eq!(topo.get("28-00000a").unwrap().status(), ReadingStatus::NoReading);
    }

    #[test]
    fn test_defaults_applied_to_new_sensors() {
        let bus = FakeBus::new();
        bus.add("28-00000a", "28", 20000);
        let defaults = SensorDefaults {
            variance: VarianceFilter::new(0.25, 2.0),
            min_read_interval: Some(Duration::from_millis(750)),
        };
        let mut topo = BusTopology::new(defaults);
        topo.refresh(&bus, 0.0).unwrap();
        assert_eq!(*topo.get("28-00000a").unwrap().variance(), VarianceFilter::new(0.25, 2.0));
    }

    #[test]
    fn test_enumeration_failure_propagates() {
        let bus = FakeBus::new();
        bus.fail_enumeration(true);
        let mut topo = BusTopology::default();
        assert!(matches!(topo.refresh(&bus, 0.0), Err(ThermologError::BusEnumeration { .. })));
    }

    #[test]
    fn test_stray_sensor_is_inconsistent() {
        let bus = FakeBus::new();
        bus.add("28-00000a", "28", 20000);
        let mut topo = BusTopology::default();
        topo.sensors.insert(
            "28-0000ff".to_string(),
            Sensor::new("28-0000ff", SensorKind::Ds18b20, 0.0),
        );
        let diff = diff_ids(std::iter::empty(), &ids(&["28-00000a"]));
        let report = ReconcileReport { created: ids(&["28-00000a"]), ..Default::default() };
        topo.sensors.insert(
            "28-00000a".to_string(),
            Sensor::new("28-00000a", SensorKind::Ds18b20, 0.0),
        );
        let err = topo.check_consistency(&ids(&["28-00000a"]), &diff, &report).unwrap_err();
        assert!(matches!(err, ThermologError::TopologyInconsistent { expected: 1, actual: 2 }));
    }
}
