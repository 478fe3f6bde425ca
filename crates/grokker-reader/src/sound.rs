//! Reader feedback sound configuration.
//!
//! These values are stored on the connection and handed to the reader; the
//! only computation done here is turning a find rate into a click rate.

use grokker_core::{
    Error, Result,
    constants::{
        DEFAULT_GEIGER_CLICK_RATE, DEFAULT_GEIGER_DURATION_MS, DEFAULT_GEIGER_FREQUENCY_HZ,
        DEFAULT_GEIGER_HISTORY_DEPTH_MS, DEFAULT_GEIGER_MAX_CLICKS_PER_SECOND, MAX_TONES_IN_SOUND,
    },
};
use serde::{Deserialize, Serialize};

/// Geiger counter click configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeigerCounterSound {
    /// Frequency of each click (Hz).
    pub frequency_hz: u32,

    /// Duration of each click (ms).
    pub duration_ms: u32,

    /// Ratio translating finds per second into clicks per second.
    pub click_rate: f64,

    /// Maximum clicks per second.
    pub max_clicks_per_second: u32,

    /// Window used for the find rate (ms).
    pub history_depth_ms: u32,
}

impl Default for GeigerCounterSound {
    fn default() -> Self {
        Self {
            frequency_hz: DEFAULT_GEIGER_FREQUENCY_HZ,
            duration_ms: DEFAULT_GEIGER_DURATION_MS,
            click_rate: DEFAULT_GEIGER_CLICK_RATE,
            max_clicks_per_second: DEFAULT_GEIGER_MAX_CLICKS_PER_SECOND,
            history_depth_ms: DEFAULT_GEIGER_HISTORY_DEPTH_MS,
        }
    }
}

impl GeigerCounterSound {
    /// Clicks per second for a find rate, capped at `max_clicks_per_second`.
    pub fn clicks_per_second(&self, find_rate: f64) -> f64 {
        if !find_rate.is_finite() || find_rate <= 0.0 {
            return 0.0;
        }
        (find_rate * self.click_rate)
            .clamp(0.0, f64::from(self.max_clicks_per_second))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns `Error::Configuration` for a zero frequency or a negative or
    /// non-finite click rate.
    pub fn validate(&self) -> Result<()> {
        if self.frequency_hz == 0 {
            return Err(Error::configuration("geiger click frequency must be non-zero"));
        }
        if !self.click_rate.is_finite() || self.click_rate < 0.0 {
            return Err(Error::configuration(format!(
                "geiger click rate must be a non-negative number, got {}",
                self.click_rate
            )));
        }
        Ok(())
    }
}

/// A single speaker tone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeakerTone {
    /// Frequency (Hz). Zero is a rest.
    pub frequency_hz: u32,

    /// Duration (ms).
    pub duration_ms: u32,
}

impl SpeakerTone {
    pub fn new(frequency_hz: u32, duration_ms: u32) -> Self {
        Self {
            frequency_hz,
            duration_ms,
        }
    }
}

/// Validate a tone sequence.
///
/// # Errors
/// Returns `Error::Configuration` for an empty sequence, more than
/// `max_tones` tones, or a zero-length tone.
pub fn validate_tones(tones: &[SpeakerTone], max_tones: usize) -> Result<()> {
    if tones.is_empty() {
        return Err(Error::configuration("sound must contain at least one tone"));
    }
    if tones.len() > max_tones {
        return Err(Error::configuration(format!(
            "sound has {} tones, reader supports at most {max_tones}",
            tones.len()
        )));
    }
    if tones.iter().any(|tone| tone.duration_ms == 0) {
        return Err(Error::configuration("tone duration must be non-zero"));
    }
    Ok(())
}

/// All sounds configured on a reader connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundSettings {
    /// Geiger counter clicks.
    pub geiger_counter: GeigerCounterSound,

    /// Played when an item is first found.
    pub found_item: Vec<SpeakerTone>,

    /// Played when the last item of an allow-list is found.
    pub found_last_item: Vec<SpeakerTone>,
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            geiger_counter: GeigerCounterSound::default(),
            found_item: vec![SpeakerTone::new(2000, 50), SpeakerTone::new(3000, 50)],
            found_last_item: vec![
                SpeakerTone::new(2000, 100),
                SpeakerTone::new(0, 50),
                SpeakerTone::new(2500, 100),
                SpeakerTone::new(0, 50),
                SpeakerTone::new(3000, 200),
            ],
        }
    }
}

impl SoundSettings {
    /// Validate every sound.
    ///
    /// # Errors
    /// Returns `Error::Configuration` if any sound is invalid.
    pub fn validate(&self) -> Result<()> {
        self.geiger_counter.validate()?;
        validate_tones(&self.found_item, MAX_TONES_IN_SOUND)?;
        validate_tones(&self.found_last_item, MAX_TONES_IN_SOUND)
    }
}
