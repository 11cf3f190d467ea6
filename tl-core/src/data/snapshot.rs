//! Today's interval means as a plot-ready JSON file
//!
//! The file holds `{"version": 1, "plotdata": [[ms, value], ...]}` for the
//! current UTC day. Points for any other day are refused. When the day rolls
//! over, or the feed starts up empty, it is reseeded from the reading store so
//! a restart does not leave a gap in the plot.

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::constants::storage;
use crate::data::store::ReadingStore;
use crate::error::{Result, ThermologError};

/// Secondary output for interval means. Returns whether the point was taken.
#[cfg_attr(test, mockall::automock)]
pub trait SnapshotFeed {
    fn append(&mut self, timestamp: f64, value: f64) -> Result<bool>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub plotdata: Vec<(i64, f64)>,
}

impl SnapshotFile {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ThermologError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// UTC calendar day of a UNIX timestamp
pub fn utc_day(timestamp: f64) -> Option<NaiveDate> {
    let secs = timestamp.floor();
    let nanos = ((timestamp - secs) * 1e9) as u32;
    Utc.timestamp_opt(secs as i64, nanos)
        .single()
        .map(|dt| dt.date_naive())
}

fn day_bounds(day: NaiveDate) -> Option<(f64, f64)> {
    let start = day.and_hms_opt(0, 0, 0)?.and_utc().timestamp() as f64;
    Some((start, start + 86_400.0 - 0.001))
}

#[derive(Debug)]
pub struct JsonSnapshotFeed<C: Clock> {
    path: PathBuf,
    store_path: Option<PathBuf>,
    clock: C,
    day: Option<NaiveDate>,
    points: Vec<(i64, f64)>,
}

impl<C: Clock> JsonSnapshotFeed<C> {
    pub fn new(path: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            path: path.into(),
            store_path: None,
            clock,
            day: None,
            points: Vec::new(),
        }
    }

    /// Reseed from this store file when the feed is empty
    pub fn with_store(mut self, store_path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(store_path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn points(&self) -> &[(i64, f64)] {
        &self.points
    }

    fn roll_over(&mut self, today: NaiveDate) -> Result<()> {
        if self.day != Some(today) {
            if self.day.is_some() {
                info!("New UTC day {}, clearing snapshot", today);
            }
            self.points.clear();
            self.day = Some(today);
        }
        if self.points.is_empty() {
            self.reseed(today)?;
        }
        Ok(())
    }

    fn reseed(&mut self, day: NaiveDate) -> Result<()> {
        let Some(store_path) = self.store_path.clone() else {
            return Ok(());
        };
        let Some((from, to)) = day_bounds(day) else {
            return Ok(());
        };
        let store = ReadingStore::open(&store_path)?;
        for reading in store.readings_between(from, to) {
            self.upsert(reading.key(), reading.value);
        }
        debug!("Reseeded snapshot with {} points from {:?}", self.points.len(), store_path);
        Ok(())
    }

    fn upsert(&mut self, ms: i64, value: f64) {
        match self.points.binary_search_by_key(&ms, |(t, _)| *t) {
            Ok(i) => self.points[i].1 = value,
            Err(i) => self.points.insert(i, (ms, value)),
        }
    }

    fn write(&self) -> Result<()> {
        let file = SnapshotFile {
            version: storage::SNAPSHOT_VERSION,
            plotdata: self.points.clone(),
        };
        let json = serde_json::to_string(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let mut out = fs::File::create(&temp_path)
            .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
        out.write_all(json.as_bytes())
            .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
        out.sync_all()
            .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
        drop(out);

        fs::rename(&temp_path, &self.path)
            .map_err(|e| ThermologError::FileWrite { path: self.path.clone(), source: e })?;
        Ok(())
    }
}

impl<C: Clock> SnapshotFeed for JsonSnapshotFeed<C> {
    fn append(&mut self, timestamp: f64, value: f64) -> Result<bool> {
        let today = utc_day(self.clock.now())
            .ok_or_else(|| ThermologError::generic("clock is outside the representable range"))?;
        if utc_day(timestamp) != Some(today) {
            debug!(timestamp, "Snapshot point is not from today, ignoring");
            return Ok(false);
        }

        self.roll_over(today)?;
        self.upsert((timestamp * 1000.0).round() as i64, value);
        self.write()?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::data::store::PersistenceSink;
    use tempfile::TempDir;

    // 2024-03-01T12:00:00Z
    const NOON: f64 = 1_709_294_400.0;
    const DAY: f64 = 86_400.0;

    #[test]
    fn test_utc_day() {
        assert_eq!(utc_day(NOON), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(utc_day(NOON + 12.0 * 3600.0), NaiveDate::from_ymd_opt(2024, 3, 2));
    }

    #[test]
    fn test_appends_todays_points() {
        let tmp = TempDir::new().unwrap();
        let clock = ManualClock::new(NOON);
        let mut feed = JsonSnapshotFeed::new(tmp.path().join("today.json"), clock);

        assert!(feed.append(NOON, 20.0).unwrap());
        assert!(feed.append(NOON + 60.0, 20.5).unwrap());

        let file = SnapshotFile::load(feed.path()).unwrap();
        assert_eq!(file.version, storage::SNAPSHOT_VERSION);
        assert_eq!(
            file.plotdata,
            vec![(1_709_294_400_000, 20.0), (1_709_294_460_000, 20.5)]
        );
    }

    #[test]
    fn test_refuses_other_days() {
        let tmp = TempDir::new().unwrap();
        let clock = ManualClock::new(NOON);
        let mut feed = JsonSnapshotFeed::new(tmp.path().join("today.json"), clock);

        assert!(!feed.append(NOON - DAY, 20.0).unwrap());
        assert!(!feed.path().exists());
    }

    #[test]
    fn test_day_change_clears() {
        let tmp = TempDir::new().unwrap();
        let clock = ManualClock::new(NOON);
        let mut feed = JsonSnapshotFeed::new(tmp.path().join("today.json"), clock.clone());

        feed.append(NOON, 20.0).unwrap();
        clock.advance(DAY);
        feed.append(NOON + DAY, 18.0).unwrap();

        assert_eq!(feed.points(), &[(1_709_380_800_000, 18.0)]);
    }

    #[test]
    fn test_reseeds_from_store_without_duplicates() {
        let tmp = TempDir::new().unwrap();
        let store_path = tmp.path().join("readings.jsonl");
        let mut store = ReadingStore::open(&store_path).unwrap();
        store.record(NOON - DAY, 15.0).unwrap();
        store.record(NOON - 60.0, 19.5).unwrap();
        store.record(NOON, 20.0).unwrap();

        let clock = ManualClock::new(NOON);
        let mut feed = JsonSnapshotFeed::new(tmp.path().join("today.json"), clock)
            .with_store(&store_path);
        feed.append(NOON, 20.0).unwrap();

        assert_eq!(
            feed.points(),
            &[(1_709_294_340_000, 19.5), (1_709_294_400_000, 20.0)]
        );
    }
}
