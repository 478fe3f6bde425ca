//! Reader connection manager.
//!
//! A [`ReaderConnection`] owns everything tied to one physical reader: the
//! connection state, the reader's handshake information, the sound
//! configuration, the diagnostics counters and at most one active inventory
//! session. It is constructed explicitly and shared by cloning.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐  TransportEvent  ┌──────────────┐   on_read / on_tick   ┌──────────────────┐
//! │ Transport  │─────────────────►│ ReaderDriver │──────────────────────►│ ReaderConnection │
//! └────────────┘                  └──────────────┘                       │  active session  │
//!                                                                        └────────┬─────────┘
//!                                       ConnectionEvent (broadcast)               │
//!                                 ◄───────────────────────────────────────────────┘
//! ```
//!
//! # Examples
//!
//! ```
//! use grokker_core::ConnectionState;
//! use grokker_inventory::{InventoryConfig, InventoryObserver, TagEvent};
//! use grokker_reader::{ReaderConnection, ReaderInfo};
//! use std::sync::Arc;
//!
//! struct Log;
//! impl InventoryObserver for Log {
//!     fn on_tag_state(&self, event: &TagEvent) {
//!         println!("{} {}", event.epc, event.state);
//!     }
//! }
//!
//! # fn main() -> grokker_reader::Result<()> {
//! let connection = ReaderConnection::new();
//! connection.connection_established(ReaderInfo::new("Grokker 1"));
//! assert_eq!(connection.connection_state(), ConnectionState::Connected);
//!
//! let session = connection.start_inventory(Arc::new(Log), InventoryConfig::default())?;
//! assert!(connection.start_inventory(Arc::new(Log), InventoryConfig::default()).is_err());
//!
//! connection.stop_inventory();
//! assert!(!session.is_active());
//! # Ok(())
//! # }
//! ```

use crate::{
    error::{ReaderError, Result},
    events::{ConnectionEvent, ConnectionSubscription, EVENT_CHANNEL_CAPACITY},
    sound::{GeigerCounterSound, SoundSettings, SpeakerTone, validate_tones},
    types::{BatteryInfo, ReaderInfo},
};
use grokker_core::{
    ConnectionState, DiagnosticData, DiagnosticsCounters, Epc, Error, Rssi, TagRead, TagReadState,
    Timestamp,
};
use grokker_inventory::{
    EpcFilter, InventoryConfig, InventoryObserver, InventorySession, StopReason, TagEvent,
};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

/// Forwards session notifications and publishes the stop on the connection.
struct SessionObserver {
    inner: Arc<dyn InventoryObserver>,
    events: broadcast::Sender<ConnectionEvent>,
    session_id: OnceLock<Uuid>,
}

impl InventoryObserver for SessionObserver {
    fn on_inventory_started(&self) {
        self.inner.on_inventory_started();
    }

    fn on_tag_state(&self, event: &TagEvent) {
        self.inner.on_tag_state(event);
    }

    fn on_history_interval(&self, at: Timestamp, visible_tags: usize) {
        self.inner.on_history_interval(at, visible_tags);
    }

    fn on_inventory_stopped(&self, reason: StopReason) {
        self.inner.on_inventory_stopped(reason);
        if let Some(&session_id) = self.session_id.get() {
            // No subscribers is fine.
            let _ = self
                .events
                .send(ConnectionEvent::InventoryStopped { session_id, reason });
        }
    }
}

#[derive(Debug, Default)]
struct ConnectionInner {
    state: ConnectionState,
    reader: Option<ReaderInfo>,
    battery: Option<BatteryInfo>,
    sounds: Option<SoundSettings>,
    active: Option<InventorySession>,
    /// Set while a session is being started outside the lock.
    starting: bool,
}

impl ConnectionInner {
    /// Active session, dropping one that was stopped directly.
    fn active_session(&mut self) -> Option<&InventorySession> {
        if self.active.as_ref().is_some_and(|s| !s.is_active()) {
            self.active = None;
        }
        self.active.as_ref()
    }
}

struct Shared {
    inner: Mutex<ConnectionInner>,
    counters: Arc<DiagnosticsCounters>,
    events: broadcast::Sender<ConnectionEvent>,
}

/// Connection to one reader.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct ReaderConnection {
    shared: Arc<Shared>,
}

impl Default for ReaderConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderConnection {
    /// Create a connection in the `NotConnected` state.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(ConnectionInner::default()),
                counters: Arc::new(DiagnosticsCounters::new()),
                events,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ConnectionInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: ConnectionEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }

    /// Subscribe to connection events.
    pub fn subscribe(&self) -> ConnectionSubscription {
        ConnectionSubscription::new(self.shared.events.subscribe())
    }

    // ------------------------------------------------------------------
    // Connection state
    // ------------------------------------------------------------------

    /// Current connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.lock().state
    }

    /// Returns `true` if a compatible reader is connected.
    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    /// Handshake information of the connected reader.
    pub fn reader_info(&self) -> Option<ReaderInfo> {
        self.lock().reader.clone()
    }

    /// Last battery state reported by the connected reader.
    pub fn battery_info(&self) -> Option<BatteryInfo> {
        self.lock().battery
    }

    /// Record a battery report. Ignored unless a reader is connected.
    pub fn battery_reported(&self, battery: BatteryInfo) {
        let mut inner = self.lock();
        if inner.state.is_connected() {
            debug!(
                percent_remaining = battery.percent_remaining,
                charging = battery.charging,
                "Battery report"
            );
            inner.battery = Some(battery);
        }
    }

    /// Record a completed handshake with `reader`.
    pub fn connection_established(&self, reader: ReaderInfo) {
        info!(reader = %reader, "Reader connected");
        self.lock().reader = Some(reader.clone());
        self.set_connection_state(ConnectionState::Connected);
        self.publish(ConnectionEvent::ReaderConnected(reader));
    }

    /// Record that the reader went away.
    ///
    /// Stops the active inventory with [`StopReason::LostConnection`].
    pub fn connection_lost(&self) {
        self.set_connection_state(ConnectionState::NotConnected);
    }

    /// Move to `state`, publishing a change event if it differs.
    ///
    /// Entering `Connected` enables diagnostics and default sounds. Leaving
    /// `Connected` stops the active inventory with
    /// [`StopReason::LostConnection`].
    pub fn set_connection_state(&self, state: ConnectionState) {
        let (previous, lost_session) = {
            let mut inner = self.lock();
            let previous = inner.state;
            if previous == state {
                return;
            }
            inner.state = state;

            if state.is_connected() {
                inner.sounds.get_or_insert_with(SoundSettings::default);
            } else {
                inner.reader = None;
                inner.battery = None;
            }

            let lost_session = if previous.is_connected() {
                inner.active.take()
            } else {
                None
            };
            (previous, lost_session)
        };

        if state.is_connected() {
            self.shared.counters.mark_handshake_completed();
        }

        info!(%previous, current = %state, "Connection state changed");
        self.publish(ConnectionEvent::StateChanged {
            previous,
            current: state,
        });

        if let Some(session) = lost_session {
            session.stop_with(StopReason::LostConnection);
        }
    }

    // ------------------------------------------------------------------
    // Inventory
    // ------------------------------------------------------------------

    /// Start an inventory reporting every tag.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` if an inventory is already active and
    /// `Error::Configuration` for an invalid configuration.
    pub fn start_inventory(
        &self,
        observer: Arc<dyn InventoryObserver>,
        config: InventoryConfig,
    ) -> Result<InventorySession> {
        self.start_inventory_filtered(observer, config, EpcFilter::all())
    }

    /// Start an inventory reporting only `epcs`.
    ///
    /// An empty list reports every tag.
    pub fn start_inventory_with_epcs(
        &self,
        observer: Arc<dyn InventoryObserver>,
        config: InventoryConfig,
        epcs: impl IntoIterator<Item = Epc>,
    ) -> Result<InventorySession> {
        self.start_inventory_filtered(observer, config, EpcFilter::allow(epcs))
    }

    /// Start an inventory reporting every tag except `epcs`.
    pub fn start_inventory_ignoring_epcs(
        &self,
        observer: Arc<dyn InventoryObserver>,
        config: InventoryConfig,
        epcs: impl IntoIterator<Item = Epc>,
    ) -> Result<InventorySession> {
        self.start_inventory_filtered(observer, config, EpcFilter::deny(epcs))
    }

    /// Start an inventory looking for a single tag.
    pub fn start_inventory_with_epc(
        &self,
        observer: Arc<dyn InventoryObserver>,
        config: InventoryConfig,
        epc: Epc,
    ) -> Result<InventorySession> {
        self.start_inventory_filtered(observer, config, EpcFilter::single(epc))
    }

    /// Start an inventory with an explicit filter.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` if an inventory is already active and
    /// `Error::Configuration` if `config` or `filter` is invalid.
    pub fn start_inventory_filtered(
        &self,
        observer: Arc<dyn InventoryObserver>,
        config: InventoryConfig,
        filter: EpcFilter,
    ) -> Result<InventorySession> {
        {
            let mut inner = self.lock();
            if inner.starting || inner.active_session().is_some() {
                return Err(Error::invalid_state("an inventory is already active").into());
            }
            inner.starting = true;
        }

        // Started outside the lock so the observer may call back in.
        let wrapped = Arc::new(SessionObserver {
            inner: observer,
            events: self.shared.events.clone(),
            session_id: OnceLock::new(),
        });
        let result = InventorySession::start(wrapped.clone(), config, filter);

        let mut inner = self.lock();
        inner.starting = false;
        let session = result?;
        let _ = wrapped.session_id.set(session.id());
        inner.active = Some(session.clone());
        drop(inner);

        self.publish(ConnectionEvent::InventoryStarted {
            session_id: session.id(),
        });
        Ok(session)
    }

    /// The active inventory, if any.
    pub fn active_inventory(&self) -> Option<InventorySession> {
        self.lock().active_session().cloned()
    }

    /// Stop the active inventory.
    ///
    /// Returns `true` if a session was stopped.
    pub fn stop_inventory(&self) -> bool {
        let session = self.lock().active.take();
        match session {
            Some(session) if session.is_active() => {
                session.stop();
                true
            }
            _ => false,
        }
    }

    /// Forward a raw read to the active inventory.
    ///
    /// Returns `None` if no inventory is active or the read was filtered.
    ///
    /// # Errors
    /// Returns `Error::InvalidEpc` for a malformed EPC.
    pub fn on_raw_read(
        &self,
        epc: &[u8],
        at: Timestamp,
        rssi: Option<Rssi>,
    ) -> Result<Option<TagReadState>> {
        let epc = Epc::new(epc)?;
        let Some(session) = self.active_inventory() else {
            debug!(%epc, "Read with no active inventory");
            return Ok(None);
        };
        let mut read = TagRead::new(epc, at);
        read.rssi = rssi;
        match session.on_read(read) {
            Ok(state) => Ok(state),
            // Stopped between lookup and read.
            Err(Error::InvalidState { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Forward a heartbeat to the active inventory.
    ///
    /// Returns the EPCs reported lost.
    pub fn on_tick(&self, now: Timestamp) -> Result<Vec<Epc>> {
        let Some(session) = self.active_inventory() else {
            return Ok(Vec::new());
        };
        match session.on_tick(now) {
            Ok(lost) => Ok(lost),
            Err(Error::InvalidState { .. }) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Diagnostic counters, optionally resetting them.
    ///
    /// Returns `None` if no reader has ever connected.
    pub fn diagnostics(&self, reset: bool) -> Option<DiagnosticData> {
        self.shared.counters.snapshot(reset)
    }

    /// Shared counters, for the transport to update.
    pub fn counters(&self) -> Arc<DiagnosticsCounters> {
        Arc::clone(&self.shared.counters)
    }

    // ------------------------------------------------------------------
    // Sounds
    // ------------------------------------------------------------------

    fn sounds_mut<F>(&self, what: &str, update: F) -> Result<()>
    where
        F: FnOnce(&mut SoundSettings, usize) -> grokker_core::Result<()>,
    {
        let mut inner = self.lock();
        let max_tones = inner
            .reader
            .as_ref()
            .map_or(grokker_core::constants::MAX_TONES_IN_SOUND, |r| {
                r.max_tones_in_sound
            });
        let sounds = inner
            .sounds
            .as_mut()
            .ok_or_else(|| ReaderError::disconnected(format!("set {what}")))?;
        update(sounds, max_tones)?;
        Ok(())
    }

    /// Geiger counter sound, `None` before a reader has connected.
    pub fn geiger_counter_sound(&self) -> Option<GeigerCounterSound> {
        self.lock().sounds.as_ref().map(|s| s.geiger_counter)
    }

    /// Set the geiger counter sound.
    ///
    /// # Errors
    /// Returns `ReaderError::Disconnected` before a reader has connected and
    /// `Error::Configuration` for an invalid sound.
    pub fn set_geiger_counter_sound(&self, sound: GeigerCounterSound) -> Result<()> {
        self.sounds_mut("geiger counter sound", |sounds, _| {
            sound.validate()?;
            sounds.geiger_counter = sound;
            Ok(())
        })
    }

    /// Found-item tones, `None` before a reader has connected.
    pub fn found_item_sound(&self) -> Option<Vec<SpeakerTone>> {
        self.lock().sounds.as_ref().map(|s| s.found_item.clone())
    }

    /// Set the found-item tones.
    ///
    /// # Errors
    /// Returns `ReaderError::Disconnected` before a reader has connected and
    /// `Error::Configuration` if the tones are invalid for the reader.
    pub fn set_found_item_sound(&self, tones: Vec<SpeakerTone>) -> Result<()> {
        self.sounds_mut("found item sound", |sounds, max_tones| {
            validate_tones(&tones, max_tones)?;
            sounds.found_item = tones;
            Ok(())
        })
    }

    /// Found-last-item tones, `None` before a reader has connected.
    pub fn found_last_item_sound(&self) -> Option<Vec<SpeakerTone>> {
        self.lock().sounds.as_ref().map(|s| s.found_last_item.clone())
    }

    /// Set the found-last-item tones.
    ///
    /// # Errors
    /// Returns `ReaderError::Disconnected` before a reader has connected and
    /// `Error::Configuration` if the tones are invalid for the reader.
    pub fn set_found_last_item_sound(&self, tones: Vec<SpeakerTone>) -> Result<()> {
        self.sounds_mut("found last item sound", |sounds, max_tones| {
            validate_tones(&tones, max_tones)?;
            sounds.found_last_item = tones;
            Ok(())
        })
    }
}

impl std::fmt::Debug for ReaderConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ReaderConnection")
            .field("state", &inner.state)
            .field("reader", &inner.reader)
            .field("active", &inner.active)
            .finish_non_exhaustive()
    }
}
