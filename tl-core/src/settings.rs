//! Collector settings
//!
//! Stored as JSON. Every field has a default, so a partial file (or no file at
//! all) is a valid configuration. Lookup order for the file:
//!
//! 1. an explicit path (the daemon's `--config`)
//! 2. `$THERMOLOG_CONFIG`
//! 3. `/etc/thermolog/config.json`
//! 4. `~/.config/thermolog/config.json`

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::{paths, storage, timing, variance};
use crate::data::validate_file_size;
use crate::engine::{LoopSettings, SensorDefaults};
use crate::error::{Result, ThermologError};
use crate::variance::VarianceFilter;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub bus: BusSettings,

    #[serde(default)]
    pub variance: VarianceSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

/// Loop timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneralSettings {
    /// Sensor polling interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Aggregation interval in seconds
    #[serde(default = "default_log_interval")]
    pub log_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusSettings {
    /// Root of the w1 device tree
    #[serde(default = "default_devices_path")]
    pub devices_path: PathBuf,

    /// Minimum time between two reads of one sensor, 0 disables the throttle
    #[serde(default = "default_min_read_interval")]
    pub min_read_interval_ms: u64,
}

/// Slew-rate filter. `tolerance` degrees per `period` seconds, both 0 to disable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceSettings {
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default = "default_period")]
    pub period: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSettings {
    /// JSON-lines file the interval means are appended to
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Optional plot file with today's means
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

fn default_poll_interval() -> u64 { timing::DEFAULT_POLL_INTERVAL_MS }
fn default_log_interval() -> u64 { timing::DEFAULT_LOG_INTERVAL_SECS }
fn default_devices_path() -> PathBuf { PathBuf::from(paths::W1_DEVICES) }
fn default_min_read_interval() -> u64 { timing::DEFAULT_MIN_READ_INTERVAL_MS }
fn default_tolerance() -> f64 { variance::DEFAULT_TOLERANCE }
fn default_period() -> f64 { variance::DEFAULT_PERIOD }
fn default_store_path() -> PathBuf { PathBuf::from(paths::DEFAULT_STORE) }

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            log_interval_secs: default_log_interval(),
        }
    }
}

impl Default for BusSettings {
    fn default() -> Self {
        Self {
            devices_path: default_devices_path(),
            min_read_interval_ms: default_min_read_interval(),
        }
    }
}

impl Default for VarianceSettings {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            period: default_period(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            snapshot_path: None,
        }
    }
}

impl Settings {
    /// Reject values the loop cannot work with
    pub fn validate(&self) -> Result<()> {
        let v = &self.variance;
        if !v.tolerance.is_finite() || v.tolerance < 0.0 {
            return Err(ThermologError::invalid_config("variance.tolerance", "must be a non-negative number"));
        }
        if !v.period.is_finite() || v.period < 0.0 {
            return Err(ThermologError::invalid_config("variance.period", "must be a non-negative number"));
        }

        let g = &self.general;
        if g.poll_interval_ms < timing::MIN_POLL_INTERVAL_MS {
            return Err(ThermologError::invalid_config(
                "general.poll_interval_ms",
                format!("must be at least {}", timing::MIN_POLL_INTERVAL_MS),
            ));
        }
        if g.log_interval_secs.saturating_mul(1000) < g.poll_interval_ms {
            return Err(ThermologError::invalid_config(
                "general.log_interval_secs",
                "must not be shorter than the poll interval",
            ));
        }

        if self.storage.store_path.as_os_str().is_empty() {
            return Err(ThermologError::invalid_config("storage.store_path", "must not be empty"));
        }
        Ok(())
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            poll_interval: Duration::from_millis(self.general.poll_interval_ms),
            log_interval: Duration::from_secs(self.general.log_interval_secs),
        }
    }

    pub fn sensor_defaults(&self) -> SensorDefaults {
        let min_read_interval = match self.bus.min_read_interval_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        };
        SensorDefaults {
            variance: VarianceFilter::new(self.variance.tolerance, self.variance.period),
            min_read_interval,
        }
    }
}

/// Pick the configuration file to load, if any
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(paths::CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let system = Path::new(paths::CONFIG_DIR).join(paths::CONFIG_FILE);
    if system.exists() {
        return Some(system);
    }

    paths::user_config_dir()
        .map(|dir| dir.join(paths::CONFIG_FILE))
        .filter(|p| p.exists())
}

/// Load and validate settings from `path`. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        info!("No config file at {:?}, using defaults", path);
        return Ok(Settings::default());
    }

    validate_file_size(path, storage::MAX_CONFIG_BYTES)?;
    let content = fs::read_to_string(path).map_err(|e| ThermologError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let settings: Settings = serde_json::from_str(&content).map_err(|e| {
        ThermologError::config(format!("Failed to parse {}: {}", path.display(), e))
    })?;
    settings.validate()?;

    debug!("Loaded settings from {:?}", path);
    Ok(settings)
}

/// Resolve the configuration file and load it
pub fn load_settings(explicit: Option<&Path>) -> Result<Settings> {
    match resolve_config_path(explicit) {
        Some(path) => load_settings_from(&path),
        None => {
            debug!("No config file found, using defaults");
            Ok(Settings::default())
        }
    }
}

/// Save settings to `path`
pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    settings.validate()?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(settings)?;

    // Atomic write - write to temp file then rename
    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path)
        .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
    file.write_all(json.as_bytes())
        .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
    file.sync_all()
        .map_err(|e| ThermologError::FileWrite { path: temp_path.clone(), source: e })?;
    drop(file);

    fs::rename(&temp_path, path)
        .map_err(|e| ThermologError::FileWrite { path: path.to_path_buf(), source: e })?;

    debug!("Saved settings to {:?}", path);
    Ok(())
}
