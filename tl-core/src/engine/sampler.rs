//! Two-timescale sampling loop
//!
//! Every `poll_interval` the loop reads all sensors and buffers the value of
//! each sensor that is valid after the read. Once `log_interval` has passed since the last emission, the
//! next tick is a boundary tick instead: the buffered values are averaged and
//! the mean goes to the persistence sink (and the snapshot feed, if any), the
//! buffer is cleared and the bus topology is refreshed.
//!
//! An interval without a single valid sample is skipped. No value is made up
//! for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::clock::{elapsed_between, Clock};
use crate::constants::timing;
use crate::data::{PersistenceSink, SnapshotFeed};
use crate::engine::{BusTopology, SensorDefaults};
use crate::error::{Result, ThermologError};
use crate::hw::DeviceBus;
use crate::reading::ReadingStatus;

/// The two timescales of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub poll_interval: Duration,
    pub log_interval: Duration,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(timing::DEFAULT_POLL_INTERVAL_MS),
            log_interval: Duration::from_secs(timing::DEFAULT_LOG_INTERVAL_SECS),
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Sensors were polled; `valid` values went into the buffer
    Polled { attempted: usize, valid: usize },
    /// Interval closed with a mean of `samples` values
    Emitted {
        timestamp: f64,
        mean: f64,
        samples: usize,
        persisted: bool,
    },
    /// Interval closed without any valid sample
    Skipped { timestamp: f64 },
}

pub struct SamplingLoop<B: DeviceBus, S: PersistenceSink, C: Clock> {
    bus: B,
    sink: S,
    clock: C,
    snapshot: Option<Box<dyn SnapshotFeed>>,
    topology: BusTopology,
    settings: LoopSettings,
    buffer: Vec<f64>,
    last_emit: f64,
    empty_ticks: u32,
}

impl<B: DeviceBus, S: PersistenceSink, C: Clock> SamplingLoop<B, S, C> {
    /// Discover the bus and start the first interval. Fails with
    /// `NoSupportedDevices` if there is nothing to sample.
    pub fn new(
        bus: B,
        sink: S,
        clock: C,
        settings: LoopSettings,
        defaults: SensorDefaults,
    ) -> Result<Self> {
        let now = clock.now();
        let mut topology = BusTopology::new(defaults);
        topology.refresh(&bus, now)?;
        if topology.is_empty() {
            return Err(ThermologError::NoSupportedDevices);
        }
        info!("Sampling {} sensors", topology.len());

        Ok(Self {
            bus,
            sink,
            clock,
            snapshot: None,
            topology,
            settings,
            buffer: Vec::new(),
            last_emit: now,
            empty_ticks: 0,
        })
    }

    pub fn with_snapshot_feed(mut self, feed: Box<dyn SnapshotFeed>) -> Self {
        self.snapshot = Some(feed);
        self
    }

    pub fn topology(&self) -> &BusTopology {
        &self.topology
    }

    /// Values collected since the last boundary tick
    pub fn buffered(&self) -> &[f64] {
        &self.buffer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn settings(&self) -> LoopSettings {
        self.settings
    }

    /// Run one tick. Only topology faults are returned as errors.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let now = self.clock.now();
        if now < self.last_emit {
            // Wall clock stepped back, restart the interval from here
            warn!(
                "Clock went back {:.1}s, restarting the current interval",
                self.last_emit - now
            );
            self.last_emit = now;
        }
        if elapsed_between(self.last_emit, now) >= self.settings.log_interval.as_secs_f64() {
            self.close_interval(now)
        } else {
            Ok(self.poll(now))
        }
    }

    /// Tick until `shutdown` is set, sleeping `poll_interval` in between
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        info!(
            "Sampling loop started (poll every {:?}, log every {:?})",
            self.settings.poll_interval, self.settings.log_interval
        );
        while !shutdown.load(Ordering::SeqCst) {
            self.tick()?;
            self.clock.sleep(self.settings.poll_interval);
        }
        info!("Sampling loop stopped, {} buffered samples discarded", self.buffer.len());
        Ok(())
    }

    fn poll(&mut self, now: f64) -> TickOutcome {
        let mut attempted = 0;
        let mut valid = 0;

        for sensor in self.topology.sensors_mut() {
            let before = sensor.status();
            let status = sensor.read(&self.bus, now, false);
            if status.is_some() {
                attempted += 1;
            }
            // Warn on the transition only
            if status == Some(ReadingStatus::LostSensor) && before != ReadingStatus::LostSensor {
                warn!(device = %sensor.device_id(), "Sensor stopped responding");
            }
            // A throttled sensor still counts with its current value
            if sensor.is_valid() {
                if let Some(value) = sensor.temperature() {
                    self.buffer.push(value);
                    valid += 1;
                }
            }
        }

        if attempted > 0 && valid == 0 {
            self.empty_ticks += 1;
            if self.empty_ticks == 1 || self.empty_ticks % timing::REPEAT_LOG_EVERY == 0 {
                warn!(
                    "No valid sample from {} sensors ({} ticks in a row)",
                    attempted, self.empty_ticks
                );
            }
        } else if valid > 0 && self.empty_ticks > 0 {
            info!("Valid samples again after {} empty ticks", self.empty_ticks);
            self.empty_ticks = 0;
        }

        TickOutcome::Polled { attempted, valid }
    }

    fn close_interval(&mut self, now: f64) -> Result<TickOutcome> {
        let outcome = if self.buffer.is_empty() {
            info!("No valid samples this interval, skipping emission");
            TickOutcome::Skipped { timestamp: now }
        } else {
            let samples = self.buffer.len();
            let mean = self.buffer.iter().sum::<f64>() / samples as f64;
            let persisted = self.emit(now, mean);
            TickOutcome::Emitted {
                timestamp: now,
                mean,
                samples,
                persisted,
            }
        };

        self.buffer.clear();
        self.last_emit = now;
        self.refresh_topology(now)?;
        Ok(outcome)
    }

    fn emit(&mut self, timestamp: f64, mean: f64) -> bool {
        let persisted = match self.sink.record(timestamp, mean) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to persist interval mean {:.3}: {}", mean, e);
                false
            }
        };

        if let Some(feed) = self.snapshot.as_mut() {
            match feed.append(timestamp, mean) {
                Ok(true) => {}
                Ok(false) => debug!(timestamp, "Snapshot feed refused point"),
                Err(e) => warn!("Snapshot feed update failed: {}", e),
            }
        }

        info!(timestamp, mean, "Interval mean {:.3}", mean);
        persisted
    }

    fn refresh_topology(&mut self, now: f64) -> Result<()> {
        match self.topology.refresh(&self.bus, now) {
            Ok(report) => {
                if !report.created.is_empty() || !report.dropped.is_empty() {
                    info!(
                        "Bus changed: {} added, {} removed, {} sensors now",
                        report.created.len(),
                        report.dropped.len(),
                        self.topology.len()
                    );
                }
                if self.topology.is_empty() {
                    warn!("No supported sensors left on the bus");
                }
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Bus refresh failed, keeping {} known sensors: {}", self.topology.len(), e);
                Ok(())
            }
        }
    }
}
