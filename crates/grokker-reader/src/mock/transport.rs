//! Scripted reader transport.

use crate::{
    error::{ReaderError, Result},
    transport::{ReaderTransport, TransportEvent},
    types::{BatteryInfo, ReaderInfo},
};
use grokker_core::{CounterUpdate, Rssi, Timestamp};
use tokio::sync::mpsc;

/// Capacity of the scripted event channel.
const MOCK_CHANNEL_CAPACITY: usize = 32;

/// Mock transport fed by a [`MockTransportHandle`].
///
/// The transport closes once every handle has been dropped and all queued
/// events have been delivered.
///
/// # Examples
///
/// ```
/// use grokker_reader::mock::MockTransport;
/// use grokker_reader::{ReaderInfo, ReaderTransport, TransportEvent};
///
/// #[tokio::main]
/// async fn main() -> grokker_reader::Result<()> {
///     let (mut transport, handle) = MockTransport::new();
///
///     handle.connect(ReaderInfo::new("Grokker 1")).await?;
///     handle.tag_read(vec![0xE2, 0x00, 0x00, 0x01], 0).await?;
///     drop(handle);
///
///     assert!(matches!(
///         transport.next_event().await?,
///         Some(TransportEvent::Connected(_))
///     ));
///     assert!(matches!(
///         transport.next_event().await?,
///         Some(TransportEvent::TagRead { .. })
///     ));
///     assert_eq!(transport.next_event().await?, None);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockTransport {
    event_rx: mpsc::Receiver<TransportEvent>,
    name: String,
}

impl MockTransport {
    /// Create a mock transport with the default name.
    pub fn new() -> (Self, MockTransportHandle) {
        Self::with_name("Mock Transport")
    }

    /// Create a mock transport with a custom name.
    pub fn with_name(name: impl Into<String>) -> (Self, MockTransportHandle) {
        let (event_tx, event_rx) = mpsc::channel(MOCK_CHANNEL_CAPACITY);
        let name = name.into();
        let transport = Self {
            event_rx,
            name: name.clone(),
        };
        (transport, MockTransportHandle { event_tx, name })
    }

    /// Number of events queued but not yet delivered.
    pub fn pending(&self) -> usize {
        self.event_rx.len()
    }
}

impl ReaderTransport for MockTransport {
    async fn next_event(&mut self) -> Result<Option<TransportEvent>> {
        Ok(self.event_rx.recv().await)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Handle for scripting a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockTransportHandle {
    event_tx: mpsc::Sender<TransportEvent>,
    name: String,
}

impl MockTransportHandle {
    /// Queue an arbitrary event.
    ///
    /// # Errors
    /// Returns `ReaderError::ChannelClosed` if the transport was dropped.
    pub async fn send(&self, event: TransportEvent) -> Result<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| ReaderError::channel_closed(self.name.clone()))
    }

    /// Start a handshake.
    pub async fn connecting(&self) -> Result<()> {
        self.send(TransportEvent::Connecting).await
    }

    /// Complete a handshake with `reader`.
    pub async fn connect(&self, reader: ReaderInfo) -> Result<()> {
        self.send(TransportEvent::Connected(reader)).await
    }

    /// Complete a handshake with an unsupported reader.
    pub async fn incompatible(&self) -> Result<()> {
        self.send(TransportEvent::Incompatible).await
    }

    /// Unplug the reader.
    pub async fn disconnect(&self) -> Result<()> {
        self.send(TransportEvent::Disconnected).await
    }

    /// Report a raw tag read.
    pub async fn tag_read(&self, epc: impl Into<Vec<u8>>, timestamp: Timestamp) -> Result<()> {
        self.send(TransportEvent::tag_read(epc, timestamp)).await
    }

    /// Report a raw tag read with RSSI.
    pub async fn tag_read_with_rssi(
        &self,
        epc: impl Into<Vec<u8>>,
        timestamp: Timestamp,
        rssi: Rssi,
    ) -> Result<()> {
        self.send(TransportEvent::TagRead {
            epc: epc.into(),
            timestamp,
            rssi: Some(rssi),
        })
        .await
    }

    /// Report a heartbeat.
    pub async fn tick(&self, timestamp: Timestamp) -> Result<()> {
        self.send(TransportEvent::Tick(timestamp)).await
    }

    /// Report counter deltas.
    pub async fn counters(&self, update: CounterUpdate) -> Result<()> {
        self.send(TransportEvent::Counters(update)).await
    }

    /// Report the battery state.
    pub async fn battery(&self, battery: BatteryInfo) -> Result<()> {
        self.send(TransportEvent::Battery(battery)).await
    }
}
