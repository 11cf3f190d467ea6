//! Input validation for names read from the bus and for configuration
//!
//! Device ids come straight from a directory listing and end up in paths we
//! open, so they are checked against the 1-Wire id shape before use.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{Result, ThermologError};

lazy_static! {
    /// `<family hex>-<serial hex>`, e.g. `28-0316a2795bff`. Real serials are
    /// 12 hex digits; shorter ones show up on emulated buses, so accept 1..=12.
    static ref DEVICE_ID: Option<Regex> = Regex::new(r"^[0-9A-Fa-f]{2}-[0-9A-Fa-f]{1,12}$").ok();
}

/// True if `name` looks like a 1-Wire slave id
pub fn is_device_id(name: &str) -> bool {
    DEVICE_ID.as_ref().map_or(false, |re| re.is_match(name))
}

/// Validates a device id before it is joined onto a bus path
pub fn validate_device_id(name: &str) -> Result<&str> {
    if is_device_id(name) {
        Ok(name)
    } else {
        Err(ThermologError::InvalidDeviceId(name.to_string()))
    }
}

/// Family prefix of a device id (`28` for `28-0316a2795bff`), upper-cased
pub fn family_prefix(device_id: &str) -> Option<String> {
    device_id
        .split_once('-')
        .map(|(family, _)| family.to_ascii_uppercase())
}

/// Validates a file size against a limit before reading it whole
pub fn validate_file_size(path: &Path, max_bytes: u64) -> Result<()> {
    let size = path
        .metadata()
        .map_err(|e| ThermologError::FileRead { path: path.to_path_buf(), source: e })?
        .len();
    if size > max_bytes {
        return Err(ThermologError::config(format!(
            "{} is {} bytes, limit is {} bytes",
            path.display(),
            size,
            max_bytes
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_device_id_shapes() {
        assert!(is_device_id("28-0316a2795bff"));
        assert!(is_device_id("28-000001"));
        assert!(is_device_id("3B-00000a1b2c3d"));
        assert!(!is_device_id("w1_bus_master1"));
        assert!(!is_device_id("28-"));
        assert!(!is_device_id("28-../../etc"));
        assert!(!is_device_id("280316a2795bff"));
        assert!(!is_device_id(""));
    }

    #[test]
    fn test_validate_device_id() {
        assert_eq!(validate_device_id("10-000802b4ba0e").unwrap(), "10-000802b4ba0e");
        assert!(matches!(
            validate_device_id("../w1_slave"),
            Err(ThermologError::InvalidDeviceId(_))
        ));
    }

    #[test]
    fn test_family_prefix() {
        assert_eq!(family_prefix("3b-0001").as_deref(), Some("3B"));
        assert_eq!(family_prefix("nodash"), None);
    }

    #[test]
    fn test_file_size_limit() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[b'x'; 100]).unwrap();
        assert!(validate_file_size(file.path(), 100).is_ok());
        assert!(validate_file_size(file.path(), 99).is_err());
    }
}
