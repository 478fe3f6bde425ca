//! Engine-wide constants.
//!
//! Defaults mirror the values the Grokker reader firmware ships with. The
//! history window of a tag is `history_depth * history_interval_ms`, which is
//! ten seconds with the defaults below.
//!
//! ```
//! use grokker_core::constants::*;
//!
//! let window_ms = DEFAULT_HISTORY_INTERVAL_MS * DEFAULT_HISTORY_DEPTH as u64;
//! assert_eq!(window_ms, 10_000);
//! ```

// ============================================================================
// EPC
// ============================================================================

/// Minimum EPC length in bytes accepted from the reader.
///
/// Older reader protocols required 8 bytes; protocol 13 lowered it to 4.
pub const MIN_EPC_LENGTH: usize = 4;

/// Maximum EPC length in bytes (496-bit Gen2 EPC memory).
pub const MAX_EPC_LENGTH: usize = 62;

// ============================================================================
// Tag history
// ============================================================================

/// Default width of one history slot, in milliseconds.
pub const DEFAULT_HISTORY_INTERVAL_MS: u64 = 500;

/// Default number of history slots kept per tag.
pub const DEFAULT_HISTORY_DEPTH: usize = 20;

/// Upper bound on history depth.
pub const MAX_HISTORY_DEPTH: usize = 1024;

// ============================================================================
// Filtering
// ============================================================================

/// Default maximum number of allow-listed EPCs handed to the reader.
///
/// Larger allow-lists are filtered on the host.
pub const DEFAULT_MAX_EPCS_SENT_TO_READER: usize = 8;

// ============================================================================
// Sounds
// ============================================================================

/// Default geiger counter click frequency (Hz).
pub const DEFAULT_GEIGER_FREQUENCY_HZ: u32 = 3000;

/// Default geiger counter click duration (ms).
pub const DEFAULT_GEIGER_DURATION_MS: u32 = 2;

/// Default ratio of clicks per second to finds per second.
pub const DEFAULT_GEIGER_CLICK_RATE: f64 = 1.0;

/// Default cap on clicks per second.
pub const DEFAULT_GEIGER_MAX_CLICKS_PER_SECOND: u32 = 40;

/// Default window used to compute the click rate (ms).
pub const DEFAULT_GEIGER_HISTORY_DEPTH_MS: u32 = 1500;

/// Maximum number of tones in a found-item sound.
pub const MAX_TONES_IN_SOUND: usize = 16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epc_length_bounds() {
        assert!(MIN_EPC_LENGTH < MAX_EPC_LENGTH);
        assert_eq!(MIN_EPC_LENGTH, 4);
    }

    #[test]
    fn test_default_history_window() {
        assert_eq!(DEFAULT_HISTORY_INTERVAL_MS * DEFAULT_HISTORY_DEPTH as u64, 10_000);
        assert!(DEFAULT_HISTORY_DEPTH <= MAX_HISTORY_DEPTH);
    }
}
