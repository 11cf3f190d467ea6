//! Unified error handling for thermolog
//!
//! A single error type shared by the core library and the collector daemon.
//! Per-sensor read problems are not errors: they are recorded as reading
//! statuses. Everything here is something a caller has to act on.

use std::io;
use std::path::PathBuf;

/// Result type alias using ThermologError
pub type Result<T> = std::result::Result<T, ThermologError>;

/// Unified error type for all thermolog operations
#[derive(thiserror::Error, Debug)]
pub enum ThermologError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Bus and Device Errors
    // ============================================================================
    #[error("Failed to enumerate bus at {path}: {source}")]
    BusEnumeration {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to read data from device {device}: {reason}")]
    DeviceRead {
        device: String,
        reason: String,
    },

    #[error("Failed to read metadata for device {device}: {reason}")]
    MetadataRead {
        device: String,
        reason: String,
    },

    #[error("Invalid device id: {0}")]
    InvalidDeviceId(String),

    #[error("No supported temperature sensors found on the bus")]
    NoSupportedDevices,

    #[error("Bus topology inconsistent: expected {expected} sensors, found {actual}")]
    TopologyInconsistent {
        expected: usize,
        actual: usize,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    // ============================================================================
    // Storage Errors
    // ============================================================================
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Corrupt record in {path} at line {line}: {reason}")]
    CorruptRecord {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Generic(String),
}

impl ThermologError {
    /// Create a generic error from a string
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic(msg.into())
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid configuration error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a device read error
    pub fn device_read(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeviceRead {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create a metadata read error
    pub fn metadata_read(device: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MetadataRead {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create a persistence error from a string
    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    /// True for faults that must stop the collector instead of being retried
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoSupportedDevices | Self::TopologyInconsistent { .. }
        )
    }
}

impl From<String> for ThermologError {
    fn from(s: String) -> Self {
        Self::Generic(s)
    }
}

impl From<&str> for ThermologError {
    fn from(s: &str) -> Self {
        Self::Generic(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(ThermologError::NoSupportedDevices.is_fatal());
        assert!(ThermologError::TopologyInconsistent { expected: 2, actual: 3 }.is_fatal());
        assert!(!ThermologError::device_read("28-000001", "gone").is_fatal());
        assert!(!ThermologError::persistence("disk full").is_fatal());
    }

    #[test]
    fn test_display_includes_context() {
        let err = ThermologError::invalid_config("variance.tolerance", "must not be negative");
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for variance.tolerance: must not be negative"
        );
    }
}
