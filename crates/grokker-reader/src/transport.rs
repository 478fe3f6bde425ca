//! Reader transport abstraction.
//!
//! A transport delivers everything the reader reports as an ordered stream of
//! [`TransportEvent`]s. Byte-level framing lives below this layer; only its
//! decoded results and counter updates reach the engine.
//!
//! Traits use native `async fn` (Edition 2024), so transports are dispatched
//! through the [`AnyReaderTransport`] enum rather than `Box<dyn _>`.

#![allow(async_fn_in_trait)]

use crate::{
    error::Result,
    mock::MockTransport,
    types::{BatteryInfo, ReaderInfo},
};
use grokker_core::{CounterUpdate, Rssi, Timestamp};

/// Event reported by a reader transport.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TransportEvent {
    /// A reader was plugged in and the handshake started.
    Connecting,

    /// Handshake completed with a compatible reader.
    Connected(ReaderInfo),

    /// Handshake completed but the reader is not supported.
    Incompatible,

    /// The reader went away.
    Disconnected,

    /// Raw tag read, EPC not yet validated.
    TagRead {
        epc: Vec<u8>,
        timestamp: Timestamp,
        rssi: Option<Rssi>,
    },

    /// Heartbeat used to age tags.
    Tick(Timestamp),

    /// Counter deltas from the byte protocol layer.
    Counters(CounterUpdate),

    /// Battery state report.
    Battery(BatteryInfo),
}

impl TransportEvent {
    /// Raw tag read without RSSI.
    pub fn tag_read(epc: impl Into<Vec<u8>>, timestamp: Timestamp) -> Self {
        Self::TagRead {
            epc: epc.into(),
            timestamp,
            rssi: None,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected(_) => "connected",
            Self::Incompatible => "incompatible",
            Self::Disconnected => "disconnected",
            Self::TagRead { .. } => "tag_read",
            Self::Tick(_) => "tick",
            Self::Counters(_) => "counters",
            Self::Battery(_) => "battery",
        }
    }
}

/// Source of reader events.
pub trait ReaderTransport: Send {
    /// Wait for the next event.
    ///
    /// Returns `Ok(None)` once the transport is closed.
    async fn next_event(&mut self) -> Result<Option<TransportEvent>>;

    /// Transport name for logs.
    fn name(&self) -> &str;
}

/// Enum wrapper for transport dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyReaderTransport {
    /// Scripted transport for tests and simulation.
    Mock(MockTransport),
}

impl ReaderTransport for AnyReaderTransport {
    async fn next_event(&mut self) -> Result<Option<TransportEvent>> {
        match self {
            Self::Mock(transport) => transport.next_event().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            Self::Mock(transport) => transport.name(),
        }
    }
}

impl From<MockTransport> for AnyReaderTransport {
    fn from(transport: MockTransport) -> Self {
        Self::Mock(transport)
    }
}
