//! Supported 1-Wire device families
//!
//! Only temperature sensors are instantiated. Every other family on the bus
//! (EEPROMs, counters, switches, battery monitors) is ignored.

use serde::{Deserialize, Serialize};

use crate::constants::w1;

/// Closed set of sensor kinds the collector knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorKind {
    Ds18s20,
    Ds1822,
    Ds18b20,
    Ds1825,
    Ds28ea00,
}

impl SensorKind {
    pub const ALL: [SensorKind; 5] = [
        SensorKind::Ds18s20,
        SensorKind::Ds1822,
        SensorKind::Ds18b20,
        SensorKind::Ds1825,
        SensorKind::Ds28ea00,
    ];

    /// Look up the kind for a family code from `uevent`; `None` means unsupported
    pub fn from_family_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "10" => Some(Self::Ds18s20),
            "22" => Some(Self::Ds1822),
            "28" => Some(Self::Ds18b20),
            "3B" => Some(Self::Ds1825),
            "42" => Some(Self::Ds28ea00),
            _ => None,
        }
    }

    pub fn family_code(self) -> &'static str {
        match self {
            Self::Ds18s20 => "10",
            Self::Ds1822 => "22",
            Self::Ds18b20 => "28",
            Self::Ds1825 => "3B",
            Self::Ds28ea00 => "42",
        }
    }

    pub fn model(self) -> &'static str {
        match self {
            Self::Ds18s20 => "DS18S20",
            Self::Ds1822 => "DS1822",
            Self::Ds18b20 => "DS18B20",
            Self::Ds1825 => "DS1825",
            Self::Ds28ea00 => "DS28EA00",
        }
    }

    /// The w1_therm driver reports every family in millidegrees
    pub fn scale_factor(self) -> f64 {
        w1::MILLIDEGREE_SCALE
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.model())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_families() {
        assert_eq!(SensorKind::from_family_code("28"), Some(SensorKind::Ds18b20));
        assert_eq!(SensorKind::from_family_code("3b"), Some(SensorKind::Ds1825));
        assert_eq!(SensorKind::from_family_code(" 10\n"), Some(SensorKind::Ds18s20));
    }

    #[test]
    fn test_unsupported_families() {
        for code in ["1D", "23", "2D", "29", "3A", "30", "", "XYZ"] {
            assert_eq!(SensorKind::from_family_code(code), None, "family {code}");
        }
    }

    #[test]
    fn test_codes_round_trip_through_table() {
        for kind in SensorKind::ALL {
            assert_eq!(SensorKind::from_family_code(kind.family_code()), Some(kind));
            assert_eq!(kind.scale_factor(), 1000.0);
        }
    }
}
