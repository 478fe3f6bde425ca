//! Reader information.

use grokker_core::constants::MAX_TONES_IN_SOUND;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Firmware version triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u16,
    pub minor: u16,
    pub build: u16,
}

impl FirmwareVersion {
    pub fn new(major: u16, minor: u16, build: u16) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

/// Battery state reported by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BatteryInfo {
    /// Enough charge to scan.
    pub can_scan: bool,

    /// External power is connected.
    pub external_power_connected: bool,

    pub charging: bool,

    /// Minutes of scanning remaining.
    pub minutes_remaining: u32,

    /// Percent of scanning time remaining, 0 to 100.
    pub percent_remaining: u8,

    /// Battery voltage (V).
    pub voltage: f64,
}

/// Information reported by a reader during the connection handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderInfo {
    /// Reader model (e.g., "Grokker 1").
    pub model: String,

    /// Reader serial number.
    pub serial_number: u32,

    /// Firmware version.
    pub firmware_version: FirmwareVersion,

    /// Byte protocol version spoken by the reader.
    pub protocol_version: u16,

    /// Maximum number of tones in a found-item sound.
    pub max_tones_in_sound: usize,

    /// Region the reader operates in.
    pub region_name: Option<String>,
}

impl Default for ReaderInfo {
    fn default() -> Self {
        Self {
            model: "Grokker".to_string(),
            serial_number: 0,
            firmware_version: FirmwareVersion::default(),
            protocol_version: 0,
            max_tones_in_sound: MAX_TONES_IN_SOUND,
            region_name: None,
        }
    }
}

impl ReaderInfo {
    /// Create reader info for a model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set the serial number.
    pub fn with_serial_number(mut self, serial_number: u32) -> Self {
        self.serial_number = serial_number;
        self
    }

    /// Set the firmware version.
    pub fn with_firmware_version(mut self, version: FirmwareVersion) -> Self {
        self.firmware_version = version;
        self
    }

    /// Set the protocol version.
    pub fn with_protocol_version(mut self, version: u16) -> Self {
        self.protocol_version = version;
        self
    }

    /// Set the region name.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region_name = Some(region.into());
        self
    }
}

impl fmt::Display for ReaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} #{} (firmware {}, protocol {})",
            self.model, self.serial_number, self.firmware_version, self.protocol_version
        )
    }
}
