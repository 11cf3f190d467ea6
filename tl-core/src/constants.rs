//! Constants and configuration defaults for thermolog
//!
//! Centralizes paths, timing defaults and 1-Wire wire-format details.
//! Settings fall back to these values when a field is missing.

/// System paths
pub mod paths {
    /// Directory the w1 kernel driver exposes one entry per slave device in
    pub const W1_DEVICES: &str = "/sys/bus/w1/devices";

    /// Per-device file holding the two-line data record
    pub const DATA_FILE: &str = "w1_slave";

    /// Per-device key/value metadata file
    pub const UEVENT_FILE: &str = "uevent";

    /// System-wide configuration directory
    pub const CONFIG_DIR: &str = "/etc/thermolog";

    /// Configuration file name
    pub const CONFIG_FILE: &str = "config.json";

    /// Default durable store for aggregated readings
    pub const DEFAULT_STORE: &str = "/var/lib/thermolog/readings.jsonl";

    /// Environment variable overriding the configuration path
    pub const CONFIG_ENV: &str = "THERMOLOG_CONFIG";

    /// User configuration directory (`~/.config/thermolog`)
    pub fn user_config_dir() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("thermolog"))
    }
}

/// Loop timing defaults
pub mod timing {
    /// Poll tick interval
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

    /// Aggregation interval
    pub const DEFAULT_LOG_INTERVAL_SECS: u64 = 60;

    /// Minimum time between two reads of the same sensor.
    /// A DS18B20 conversion at 12-bit resolution takes up to 750ms.
    pub const DEFAULT_MIN_READ_INTERVAL_MS: u64 = 750;

    /// Smallest poll interval accepted from configuration
    pub const MIN_POLL_INTERVAL_MS: u64 = 50;

    /// Log repeated per-tick conditions on the first hit and then every Nth
    pub const REPEAT_LOG_EVERY: u32 = 120;
}

/// Slew-rate filter defaults for thermal sensors
pub mod variance {
    /// Allowed change in degrees per period
    pub const DEFAULT_TOLERANCE: f64 = 1.0;

    /// Period in seconds the tolerance applies to
    pub const DEFAULT_PERIOD: f64 = 1.0;
}

/// 1-Wire data record format
pub mod w1 {
    /// Token on line 1 of `w1_slave` when the CRC matched
    pub const CRC_OK_TOKEN: &str = "YES";

    /// Whitespace-separated field on line 2 carrying the temperature
    pub const TEMPERATURE_FIELD_INDEX: usize = 9;

    /// Prefix of the temperature field (`t=23125`)
    pub const TEMPERATURE_PREFIX: &str = "t=";

    /// Key in `uevent` carrying the family code
    pub const FAMILY_KEY: &str = "W1_FAMILY";

    /// Implied-decimal scale of the temperature field (millidegrees)
    pub const MILLIDEGREE_SCALE: f64 = 1000.0;
}

/// Persistence limits
pub mod storage {
    /// Current on-disk format version of the snapshot feed
    pub const SNAPSHOT_VERSION: u32 = 1;

    /// Store lines longer than this are skipped as corrupt
    pub const MAX_RECORD_BYTES: usize = 4096;

    /// Reject config files larger than this (1 MiB)
    pub const MAX_CONFIG_BYTES: u64 = 1024 * 1024;
}
