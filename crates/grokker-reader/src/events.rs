//! Connection event broadcasting.
//!
//! Every [`ReaderConnection`](crate::ReaderConnection) publishes typed
//! [`ConnectionEvent`]s on a broadcast channel. Each
//! [`ConnectionSubscription`] receives every event published after it was
//! created; dropping it unsubscribes.

use crate::types::ReaderInfo;
use grokker_core::ConnectionState;
use grokker_inventory::StopReason;
use tokio::sync::broadcast;
use tracing::warn;
use uuid::Uuid;

/// Capacity of the connection event channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Event published by a reader connection.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConnectionEvent {
    /// The connection state changed.
    StateChanged {
        previous: ConnectionState,
        current: ConnectionState,
    },

    /// A reader completed the handshake.
    ReaderConnected(ReaderInfo),

    /// An inventory session started.
    InventoryStarted { session_id: Uuid },

    /// An inventory session stopped.
    InventoryStopped { session_id: Uuid, reason: StopReason },
}

/// Receiver for connection events.
#[derive(Debug)]
pub struct ConnectionSubscription {
    rx: broadcast::Receiver<ConnectionEvent>,
}

impl ConnectionSubscription {
    pub(crate) fn new(rx: broadcast::Receiver<ConnectionEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the connection has been dropped. If the
    /// subscriber fell behind, the missed events are skipped.
    pub async fn recv(&mut self) -> Option<ConnectionEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(missed, "Connection subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next event if one is queued.
    pub fn try_recv(&mut self) -> Option<ConnectionEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Connection subscriber lagged, events dropped");
                }
                Err(_) => return None,
            }
        }
    }

    /// Wait for the next state change, skipping other events.
    pub async fn next_state(&mut self) -> Option<ConnectionState> {
        while let Some(event) = self.recv().await {
            if let ConnectionEvent::StateChanged { current, .. } = event {
                return Some(current);
            }
        }
        None
    }
}
