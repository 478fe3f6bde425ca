//! Inventory session configuration.
//!
//! [`InventoryConfig`] carries the history parameters the engine uses plus
//! the reader settings (power, sounds, RSSI) that are passed through to the
//! transport unchanged.
//!
//! # Examples
//!
//! ```
//! use grokker_inventory::config::{InventoryConfig, InventoryType, SoundType};
//!
//! let config = InventoryConfig::for_inventory_type(InventoryType::LocateDistance)
//!     .with_history(250, 8)
//!     .with_report_rssi(true);
//!
//! assert_eq!(config.sound_type, SoundType::GeigerCounter);
//! assert_eq!(config.window_ms(), 2_000);
//! assert!(config.validate().is_ok());
//! ```

use grokker_core::{
    Error, Result,
    constants::{
        DEFAULT_HISTORY_DEPTH, DEFAULT_HISTORY_INTERVAL_MS, DEFAULT_MAX_EPCS_SENT_TO_READER,
        MAX_HISTORY_DEPTH,
    },
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sounds the reader makes when tags are found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundType {
    /// No sounds.
    None,

    /// Clicks at a rate following the find rate.
    #[default]
    GeigerCounter,

    /// Found-item sound once when an EPC is first found.
    FirstFind,

    /// Found-item sound on first find, special sound for the last tag of an
    /// allow-list.
    FirstFindAndLast,
}

impl SoundType {
    /// Wire code used by the reader firmware.
    pub fn code(self) -> u8 {
        match self {
            SoundType::None => 0,
            SoundType::GeigerCounter => 1,
            SoundType::FirstFind => 2,
            SoundType::FirstFindAndLast => 6,
        }
    }
}

/// Predefined inventory profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryType {
    /// Locate a tag at a distance.
    LocateDistance,

    /// Count a large number of tags relatively close.
    InventoryShortRange,

    /// Count tags at a distance.
    InventoryDistance,

    /// Locate a tag at short range.
    LocateShortRange,

    /// Locate a tag at very short range.
    LocateVeryShortRange,
}

impl InventoryType {
    /// All profiles, in firmware order.
    pub const ALL: [InventoryType; 5] = [
        InventoryType::LocateDistance,
        InventoryType::InventoryShortRange,
        InventoryType::InventoryDistance,
        InventoryType::LocateShortRange,
        InventoryType::LocateVeryShortRange,
    ];

    /// Returns `true` for the locate profiles.
    pub fn is_locate(self) -> bool {
        matches!(
            self,
            InventoryType::LocateDistance
                | InventoryType::LocateShortRange
                | InventoryType::LocateVeryShortRange
        )
    }
}

impl fmt::Display for InventoryType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InventoryType::LocateDistance => write!(f, "Locate distance"),
            InventoryType::InventoryShortRange => write!(f, "Inventory short range"),
            InventoryType::InventoryDistance => write!(f, "Inventory distance"),
            InventoryType::LocateShortRange => write!(f, "Locate short range"),
            InventoryType::LocateVeryShortRange => write!(f, "Locate very short range"),
        }
    }
}

/// Configuration of one inventory session.
///
/// Immutable once the session has started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Width of one history interval in milliseconds.
    pub history_interval_ms: u64,

    /// Number of history intervals kept per tag.
    pub history_depth: usize,

    /// Largest allow-list handed to the reader for on-reader filtering.
    pub max_epcs_sent_to_reader: usize,

    /// Feedback sounds.
    pub sound_type: SoundType,

    /// Sound volume, 0.0 to 1.0.
    pub volume: f64,

    /// Run until stopped rather than a single pass.
    pub continual: bool,

    /// Ask the reader to report RSSI with each read.
    pub report_rssi: bool,

    /// Deliver `Updated` for every read of a visible tag. When `false` the
    /// observer only sees `Found` and `Lost`.
    pub report_subsequent_finds: bool,

    /// Initial power level in dBm (0 = max).
    pub initial_power_level: f64,

    /// Minimum power level in dBm (0 = max).
    pub min_power_level: f64,

    /// Maximum power level in dBm (0 = max).
    pub max_power_level: f64,

    /// Inventory rounds per second (0 = no limit).
    pub max_rounds_per_second: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            history_interval_ms: DEFAULT_HISTORY_INTERVAL_MS,
            history_depth: DEFAULT_HISTORY_DEPTH,
            max_epcs_sent_to_reader: DEFAULT_MAX_EPCS_SENT_TO_READER,
            sound_type: SoundType::GeigerCounter,
            volume: 1.0,
            continual: true,
            report_rssi: false,
            report_subsequent_finds: true,
            initial_power_level: 0.0,
            min_power_level: 0.0,
            max_power_level: 0.0,
            max_rounds_per_second: 0,
        }
    }
}

impl InventoryConfig {
    /// Configuration for a predefined inventory profile.
    pub fn for_inventory_type(inventory_type: InventoryType) -> Self {
        let base = Self::default();
        match inventory_type {
            InventoryType::LocateDistance => base,
            InventoryType::InventoryShortRange => base
                .with_sound_type(SoundType::FirstFind)
                .with_power_levels(20.0, 15.0, 20.0),
            InventoryType::InventoryDistance => base.with_sound_type(SoundType::FirstFind),
            InventoryType::LocateShortRange => base.with_power_levels(20.0, 10.0, 20.0),
            InventoryType::LocateVeryShortRange => base
                .with_power_levels(10.0, 5.0, 10.0)
                .with_history(250, DEFAULT_HISTORY_DEPTH),
        }
    }

    /// Set the history interval and depth.
    pub fn with_history(mut self, interval_ms: u64, depth: usize) -> Self {
        self.history_interval_ms = interval_ms;
        self.history_depth = depth;
        self
    }

    /// Set the reader filtering limit.
    pub fn with_max_epcs_sent_to_reader(mut self, max: usize) -> Self {
        self.max_epcs_sent_to_reader = max;
        self
    }

    /// Set the sound type.
    pub fn with_sound_type(mut self, sound_type: SoundType) -> Self {
        self.sound_type = sound_type;
        self
    }

    /// Set the volume.
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Enable or disable RSSI reporting.
    pub fn with_report_rssi(mut self, report_rssi: bool) -> Self {
        self.report_rssi = report_rssi;
        self
    }

    /// Deliver `Updated` for every read of a visible tag, or only `Found`
    /// and `Lost`.
    pub fn with_report_subsequent_finds(mut self, report: bool) -> Self {
        self.report_subsequent_finds = report;
        self
    }

    /// Run continually or a single pass.
    pub fn with_continual(mut self, continual: bool) -> Self {
        self.continual = continual;
        self
    }

    /// Set initial, minimum and maximum power levels.
    pub fn with_power_levels(mut self, initial: f64, min: f64, max: f64) -> Self {
        self.initial_power_level = initial;
        self.min_power_level = min;
        self.max_power_level = max;
        self
    }

    /// Length of the forget window in milliseconds.
    pub fn window_ms(&self) -> u64 {
        self.history_interval_ms
            .saturating_mul(self.history_depth as u64)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `Error::Configuration` if the history interval is zero, the
    /// depth is outside `1..=MAX_HISTORY_DEPTH`, or the volume is outside
    /// `0.0..=1.0`.
    pub fn validate(&self) -> Result<()> {
        if self.history_interval_ms == 0 {
            return Err(Error::configuration("history interval must be non-zero"));
        }
        if !(1..=MAX_HISTORY_DEPTH).contains(&self.history_depth) {
            return Err(Error::configuration(format!(
                "history depth must be 1-{MAX_HISTORY_DEPTH}, got {}",
                self.history_depth
            )));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(Error::configuration(format!(
                "volume must be between 0.0 and 1.0, got {}",
                self.volume
            )));
        }
        Ok(())
    }
}
