//! Inventory notifications.

use crate::aggregate::TagAggregate;
use grokker_core::{Epc, Rssi, TagReadState, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One tag state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagEvent {
    /// Tag identifier.
    pub epc: Epc,

    /// New state.
    pub state: TagReadState,

    /// Reads per second at `timestamp`.
    pub find_rate: f64,

    /// Time of the read or sweep that caused the transition.
    pub timestamp: Timestamp,

    /// Reads recorded for this tag so far.
    pub total_reads: u64,

    /// Most recent RSSI, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<Rssi>,
}

impl TagEvent {
    pub(crate) fn from_aggregate(
        aggregate: &TagAggregate,
        state: TagReadState,
        at: Timestamp,
    ) -> Self {
        Self {
            epc: aggregate.epc().clone(),
            state,
            find_rate: aggregate.find_rate(at),
            timestamp: at,
            total_reads: aggregate.total_reads(),
            rssi: aggregate.rssi(),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Stopped by the application.
    Stopped,

    /// The reader could not be told to start or stop scanning.
    ErrorSending,

    /// The reader connection went away.
    LostConnection,
}

impl StopReason {
    /// Completion code reported by the reader SDK.
    pub fn code(self) -> u8 {
        match self {
            StopReason::Stopped => 0,
            StopReason::ErrorSending => 98,
            StopReason::LostConnection => 99,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StopReason::Stopped => write!(f, "stopped"),
            StopReason::ErrorSending => write!(f, "error sending"),
            StopReason::LostConnection => write!(f, "lost connection"),
        }
    }
}

/// Receiver of inventory notifications.
///
/// Callbacks run on whatever thread drives the session (usually the reader
/// driver task) and must not block for long. No session lock is held while
/// a callback runs, but calling back into the same session from a callback
/// is only supported for [`stop`](crate::InventorySession::stop).
pub trait InventoryObserver: Send + Sync {
    /// The session started scanning.
    fn on_inventory_started(&self) {}

    /// A tag was found, read again, or lost.
    fn on_tag_state(&self, event: &TagEvent);

    /// Called after each sweep while at least one tag is visible.
    fn on_history_interval(&self, _at: Timestamp, _visible_tags: usize) {}

    /// The session ended. Called exactly once per session.
    fn on_inventory_stopped(&self, _reason: StopReason) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_reason_codes() {
        assert_eq!(StopReason::Stopped.code(), 0);
        assert_eq!(StopReason::ErrorSending.code(), 98);
        assert_eq!(StopReason::LostConnection.code(), 99);
        assert_eq!(StopReason::LostConnection.to_string(), "lost connection");
    }

    #[test]
    fn test_event_from_aggregate() {
        let epc = Epc::from_hex("0A0B0C0D").unwrap();
        let mut aggregate = TagAggregate::new(epc.clone(), 500, 20);
        aggregate.record_read(0);
        let state = aggregate.record_read(500);

        let event = TagEvent::from_aggregate(&aggregate, state, 500);
        assert_eq!(event.epc, epc);
        assert_eq!(event.state, TagReadState::Updated);
        assert_eq!(event.total_reads, 2);
        assert_eq!(event.find_rate, 2.0);
    }
}
