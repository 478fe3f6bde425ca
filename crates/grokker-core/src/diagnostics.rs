//! Reader diagnostics counters.
//!
//! Counters are incremented by the transport layer and read by applications
//! through [`DiagnosticsCounters::snapshot`]. The whole record lives behind a
//! single mutex, so a snapshot with reset never observes half of a
//! multi-counter update and no increment is lost between the read and the
//! reset.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Point-in-time copy of the reader diagnostic counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticData {
    /// Factor the reader's clock is off by. A measurement, kept on reset.
    pub byte_protocol_skew_factor: f64,
    /// Bytes sent by the reader.
    pub byte_protocol_bytes_sent: u64,
    /// Bytes received by the reader.
    pub byte_protocol_bytes_received: u64,
    /// Reader timeouts waiting for the next byte of a packet.
    pub byte_protocol_subsequent_read_timeouts: u64,
    /// Packets sent by the reader.
    pub packet_protocol_packets_sent: u64,
    /// Packets received by the reader.
    pub packet_protocol_packets_received: u64,
    /// Reader failures sending a packet.
    pub packet_protocol_send_failures: u64,
    /// Reader retries sending packets.
    pub packet_protocol_send_retries: u64,
    /// Reader timeouts sending packets.
    pub packet_protocol_send_timeouts: u64,
    /// Invalid packets received by the reader.
    pub packet_protocol_invalid_packets: u64,
    /// Responses received with an illegal embedded CRC.
    pub packet_protocol_internal_crc_mismatches: u64,
    /// Packets received with a wrong CRC.
    pub packet_protocol_crc_mismatches: u64,
    /// Inventory rounds run.
    pub raw_inventory_rounds: u64,
    /// Raw tag finds.
    pub raw_tag_finds: u64,
    /// Unique tags found.
    pub inventory_unique: u64,
    /// Forgotten tags.
    pub inventory_forgotten: u64,
    /// Forgotten tags not acknowledged by the host.
    pub inventory_forgotten_not_acknowledged: u64,
    /// Forgotten tags not sent to the host.
    pub inventory_forgotten_not_sent: u64,
}

impl DiagnosticData {
    /// Zero every counter, keeping the skew factor.
    pub fn reset_counters(&mut self) {
        *self = DiagnosticData {
            byte_protocol_skew_factor: self.byte_protocol_skew_factor,
            ..DiagnosticData::default()
        };
    }

    /// Apply an incremental update.
    pub fn apply(&mut self, update: &CounterUpdate) {
        if let Some(skew) = update.skew_factor {
            self.byte_protocol_skew_factor = skew;
        }
        let d = &update.deltas;
        for (counter, delta) in [
            (&mut self.byte_protocol_bytes_sent, d.byte_protocol_bytes_sent),
            (&mut self.byte_protocol_bytes_received, d.byte_protocol_bytes_received),
            (&mut self.byte_protocol_subsequent_read_timeouts, d.byte_protocol_subsequent_read_timeouts),
            (&mut self.packet_protocol_packets_sent, d.packet_protocol_packets_sent),
            (&mut self.packet_protocol_packets_received, d.packet_protocol_packets_received),
            (&mut self.packet_protocol_send_failures, d.packet_protocol_send_failures),
            (&mut self.packet_protocol_send_retries, d.packet_protocol_send_retries),
            (&mut self.packet_protocol_send_timeouts, d.packet_protocol_send_timeouts),
            (&mut self.packet_protocol_invalid_packets, d.packet_protocol_invalid_packets),
            (&mut self.packet_protocol_internal_crc_mismatches, d.packet_protocol_internal_crc_mismatches),
            (&mut self.packet_protocol_crc_mismatches, d.packet_protocol_crc_mismatches),
            (&mut self.raw_inventory_rounds, d.raw_inventory_rounds),
            (&mut self.raw_tag_finds, d.raw_tag_finds),
            (&mut self.inventory_unique, d.inventory_unique),
            (&mut self.inventory_forgotten, d.inventory_forgotten),
            (&mut self.inventory_forgotten_not_acknowledged, d.inventory_forgotten_not_acknowledged),
            (&mut self.inventory_forgotten_not_sent, d.inventory_forgotten_not_sent),
        ] {
            *counter = counter.saturating_add(delta);
        }
    }

    /// Returns `true` if every counter is zero. The skew factor is ignored.
    #[must_use]
    pub fn counters_are_zero(&self) -> bool {
        let mut zeroed = *self;
        zeroed.byte_protocol_skew_factor = 0.0;
        zeroed == DiagnosticData::default()
    }
}

/// Counter increments reported by the transport in one batch.
///
/// `deltas` holds the increments (its skew field is ignored); a skew
/// measurement, if present, replaces the stored one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CounterUpdate {
    /// New skew factor measurement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skew_factor: Option<f64>,

    /// Increments for each counter.
    #[serde(flatten)]
    pub deltas: DiagnosticData,
}

impl CounterUpdate {
    /// An update counting one inventory round with `finds` raw tag finds.
    pub fn inventory_round(finds: u64) -> Self {
        Self {
            skew_factor: None,
            deltas: DiagnosticData {
                raw_inventory_rounds: 1,
                raw_tag_finds: finds,
                ..DiagnosticData::default()
            },
        }
    }

    /// Set the skew factor measurement.
    pub fn with_skew_factor(mut self, skew: f64) -> Self {
        self.skew_factor = Some(skew);
        self
    }
}

#[derive(Debug, Default)]
struct CountersInner {
    data: DiagnosticData,
    handshake_completed: bool,
}

/// Shared diagnostics counters.
///
/// Owned by the reader connection and shared with the transport via `Arc`.
#[derive(Debug, Default)]
pub struct DiagnosticsCounters {
    inner: Mutex<CountersInner>,
}

impl DiagnosticsCounters {
    /// Create zeroed counters. Snapshots are unavailable until
    /// [`mark_handshake_completed`](Self::mark_handshake_completed).
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CountersInner> {
        // Counters stay usable even if a recorder panicked mid-update.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that a reader connection handshake completed.
    pub fn mark_handshake_completed(&self) {
        self.lock().handshake_completed = true;
    }

    /// Returns `true` once a handshake has completed.
    pub fn handshake_completed(&self) -> bool {
        self.lock().handshake_completed
    }

    /// Apply a multi-counter update atomically.
    pub fn record<F>(&self, update: F)
    where
        F: FnOnce(&mut DiagnosticData),
    {
        let mut inner = self.lock();
        update(&mut inner.data);
    }

    /// Apply a transport counter batch.
    pub fn apply(&self, update: &CounterUpdate) {
        self.record(|data| data.apply(update));
    }

    /// Copy all counters, optionally zeroing them in the same critical
    /// section.
    ///
    /// Returns `None` if no reader has ever completed a handshake.
    pub fn snapshot(&self, reset: bool) -> Option<DiagnosticData> {
        let mut inner = self.lock();
        if !inner.handshake_completed {
            return None;
        }
        let data = inner.data;
        if reset {
            inner.data.reset_counters();
        }
        Some(data)
    }
}
