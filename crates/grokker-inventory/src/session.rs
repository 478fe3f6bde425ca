//! Inventory session.
//!
//! An [`InventorySession`] owns the aggregates of every tag seen since it
//! started, applies the EPC filter and turns reads and sweeps into observer
//! notifications.
//!
//! # Concurrency
//!
//! ```text
//!  on_read / on_tick                         stop
//!  ┌───────────────────────┐                 ┌──────────────────────────┐
//!  │ lock state            │                 │ active = false           │
//!  │   update aggregates   │                 │ gate.write()  (waits for │
//!  │ unlock state          │                 │   in-flight deliveries)  │
//!  │ gate.read()           │                 │ clear aggregates         │
//!  │   if active: notify   │                 │ on_inventory_stopped     │
//!  └───────────────────────┘                 └──────────────────────────┘
//! ```
//!
//! The state lock is never held while the observer runs. Once `stop`
//! returns, no further tag notification is delivered.
//!
//! # Examples
//!
//! ```
//! use grokker_core::{Epc, TagReadState};
//! use grokker_inventory::{EpcFilter, InventoryConfig, InventoryObserver, InventorySession, TagEvent};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl InventoryObserver for Printer {
//!     fn on_tag_state(&self, event: &TagEvent) {
//!         println!("{} {}", event.epc, event.state);
//!     }
//! }
//!
//! # fn main() -> grokker_core::Result<()> {
//! let session = InventorySession::start(
//!     Arc::new(Printer),
//!     InventoryConfig::default(),
//!     EpcFilter::all(),
//! )?;
//!
//! let epc = Epc::from_hex("E2000001")?;
//! assert_eq!(session.on_raw_read(epc.as_bytes(), 0)?, Some(TagReadState::Found));
//! assert_eq!(session.on_raw_read(epc.as_bytes(), 100)?, Some(TagReadState::Updated));
//!
//! let lost = session.on_tick(10_100)?;
//! assert_eq!(lost, vec![epc]);
//!
//! session.stop();
//! # Ok(())
//! # }
//! ```

use crate::{
    aggregate::TagAggregate,
    config::InventoryConfig,
    filter::{EpcFilter, FilterLocation},
    observer::{InventoryObserver, StopReason, TagEvent},
};
use chrono::{DateTime, Utc};
use grokker_core::{Epc, Error, Result, TagRead, TagReadState, Timestamp};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

thread_local! {
    /// Sessions whose observer is currently running on this thread.
    static DELIVERING: RefCell<Vec<Uuid>> = const { RefCell::new(Vec::new()) };
}

struct DeliveryScope(Uuid);

impl DeliveryScope {
    fn enter(id: Uuid) -> Self {
        DELIVERING.with(|ids| ids.borrow_mut().push(id));
        Self(id)
    }

    fn is_delivering(id: Uuid) -> bool {
        DELIVERING.with(|ids| ids.borrow().contains(&id))
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERING.with(|ids| {
            let mut ids = ids.borrow_mut();
            if let Some(pos) = ids.iter().rposition(|id| *id == self.0) {
                ids.remove(pos);
            }
        });
    }
}

#[derive(Debug, Default)]
struct SessionState {
    tags: HashMap<Epc, TagAggregate>,
}

struct SessionInner {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: InventoryConfig,
    filter: EpcFilter,
    filter_location: FilterLocation,
    observer: Arc<dyn InventoryObserver>,

    state: Mutex<SessionState>,
    active: AtomicBool,
    paused: AtomicBool,

    /// Held shared by deliveries, exclusively by `stop`.
    gate: RwLock<()>,
}

/// Handle to a running or stopped inventory session.
///
/// Cheap to clone; all clones refer to the same session.
#[derive(Clone)]
pub struct InventorySession {
    inner: Arc<SessionInner>,
}

impl InventorySession {
    /// Validate `config` and `filter` and start a session.
    ///
    /// Calls [`InventoryObserver::on_inventory_started`] before returning.
    ///
    /// # Errors
    /// Returns `Error::Configuration` if the configuration is invalid or the
    /// filter has both an allow-list and a deny-list. No session is created.
    pub fn start(
        observer: Arc<dyn InventoryObserver>,
        config: InventoryConfig,
        filter: EpcFilter,
    ) -> Result<Self> {
        config.validate()?;
        filter.validate()?;

        let filter_location = filter.location(config.max_epcs_sent_to_reader);
        let session = Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                started_at: Utc::now(),
                config,
                filter,
                filter_location,
                observer,
                state: Mutex::new(SessionState::default()),
                active: AtomicBool::new(true),
                paused: AtomicBool::new(false),
                gate: RwLock::new(()),
            }),
        };

        info!(
            session = %session.inner.id,
            filter_location = %filter_location,
            allow = session.inner.filter.allowed().len(),
            deny = session.inner.filter.denied().len(),
            "Inventory started"
        );
        session.deliver(|observer| observer.on_inventory_started());

        Ok(session)
    }

    /// Session identifier.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Wall-clock start time.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }

    /// Session configuration.
    pub fn config(&self) -> &InventoryConfig {
        &self.inner.config
    }

    /// Session EPC filter.
    pub fn filter(&self) -> &EpcFilter {
        &self.inner.filter
    }

    /// Where the filter is applied.
    pub fn filter_location(&self) -> FilterLocation {
        self.inner.filter_location
    }

    /// Returns `true` until the session is stopped.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Returns `true` while scanning is paused.
    pub fn is_paused(&self) -> bool {
        self.inner.paused.load(Ordering::Acquire)
    }

    /// Returns `true` if both handles refer to the same session.
    pub fn same_session(&self, other: &InventorySession) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_active(&self, operation: &str) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::invalid_state(format!(
                "cannot {operation}: inventory session {} is stopped",
                self.inner.id
            )))
        }
    }

    /// Run `notify` unless the session has been stopped.
    fn deliver<F>(&self, notify: F)
    where
        F: FnOnce(&dyn InventoryObserver),
    {
        let _gate = self
            .inner
            .gate
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        if !self.is_active() {
            return;
        }
        let _scope = DeliveryScope::enter(self.inner.id);
        notify(self.inner.observer.as_ref());
    }

    /// Process a read given as raw EPC bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` on a stopped session and
    /// `Error::InvalidEpc` for a malformed EPC. Neither touches session state.
    pub fn on_raw_read(&self, epc: &[u8], at: Timestamp) -> Result<Option<TagReadState>> {
        self.ensure_active("process read")?;
        let epc = Epc::new(epc)?;
        self.on_read(TagRead::new(epc, at))
    }

    /// Process a read.
    ///
    /// Returns the tag's new state, or `None` if the read was filtered out
    /// or the session is paused. `Updated` is only delivered to the observer
    /// when the configuration reports subsequent finds.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` on a stopped session.
    pub fn on_read(&self, read: TagRead) -> Result<Option<TagReadState>> {
        self.ensure_active("process read")?;
        if self.is_paused() || !self.inner.filter.accepts(&read.epc) {
            return Ok(None);
        }

        let event = {
            let mut state = self.lock_state();
            // Re-check under the lock: `stop` clears the map after the flag.
            if !self.is_active() {
                return Ok(None);
            }
            let config = &self.inner.config;
            let aggregate = state.tags.entry(read.epc.clone()).or_insert_with(|| {
                TagAggregate::new(
                    read.epc.clone(),
                    config.history_interval_ms,
                    config.history_depth,
                )
            });
            let transition = aggregate.record(&read);
            TagEvent::from_aggregate(aggregate, transition, read.timestamp)
        };

        if event.state == TagReadState::Found {
            debug!(session = %self.inner.id, epc = %event.epc, at = event.timestamp, "Tag found");
        }
        let transition = event.state;
        if transition != TagReadState::Updated || self.inner.config.report_subsequent_finds {
            self.deliver(|observer| observer.on_tag_state(&event));
        }
        Ok(Some(transition))
    }

    /// Sweep for tags not read within the forget window.
    ///
    /// Advances every tag's history to `now`, reports each stale tag as
    /// `Lost` once, then evicts it so a later read reports `Found` again.
    /// Returns the EPCs reported lost.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` on a stopped session.
    pub fn on_tick(&self, now: Timestamp) -> Result<Vec<Epc>> {
        self.ensure_active("sweep")?;
        if self.is_paused() {
            return Ok(Vec::new());
        }

        let (lost, visible) = {
            let mut state = self.lock_state();
            let mut lost = Vec::new();
            for aggregate in state.tags.values_mut() {
                aggregate.advance(now);
                if aggregate.is_stale(now) && aggregate.mark_lost() {
                    lost.push(TagEvent::from_aggregate(aggregate, TagReadState::Lost, now));
                }
            }
            let visible = state.tags.values().filter(|a| a.is_visible()).count();
            (lost, visible)
        };

        for event in &lost {
            debug!(session = %self.inner.id, epc = %event.epc, at = now, "Tag lost");
            self.deliver(|observer| observer.on_tag_state(event));
        }

        if !lost.is_empty() {
            // A read may have re-found a tag while LOST was being delivered.
            let mut state = self.lock_state();
            state
                .tags
                .retain(|_, aggregate| aggregate.current_state() != Some(TagReadState::Lost));
        }

        if visible > 0 {
            self.deliver(|observer| observer.on_history_interval(now, visible));
        }

        Ok(lost.into_iter().map(|event| event.epc).collect())
    }

    /// Pause scanning. Reads and sweeps are ignored until [`resume`](Self::resume).
    ///
    /// # Errors
    /// Returns `Error::InvalidState` on a stopped session.
    pub fn pause(&self) -> Result<()> {
        self.ensure_active("pause")?;
        if !self.inner.paused.swap(true, Ordering::AcqRel) {
            info!(session = %self.inner.id, "Inventory paused");
        }
        Ok(())
    }

    /// Resume a paused session.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` on a stopped session.
    pub fn resume(&self) -> Result<()> {
        self.ensure_active("resume")?;
        if self.inner.paused.swap(false, Ordering::AcqRel) {
            info!(session = %self.inner.id, "Inventory resumed");
        }
        Ok(())
    }

    /// Snapshot of every tracked tag.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` on a stopped session.
    pub fn tags(&self) -> Result<Vec<TagAggregate>> {
        self.ensure_active("list tags")?;
        Ok(self.lock_state().tags.values().cloned().collect())
    }

    /// Snapshot of one tag.
    ///
    /// # Errors
    /// Returns `Error::InvalidState` on a stopped session.
    pub fn tag(&self, epc: &Epc) -> Result<Option<TagAggregate>> {
        self.ensure_active("look up tag")?;
        Ok(self.lock_state().tags.get(epc).cloned())
    }

    /// Stop the session. Idempotent.
    pub fn stop(&self) {
        self.stop_with(StopReason::Stopped);
    }

    /// Stop the session, reporting `reason` to the observer.
    ///
    /// Waits for an in-flight notification on another thread to finish; no
    /// tag notification is delivered after this returns. Only the first call
    /// has any effect.
    pub fn stop_with(&self, reason: StopReason) {
        if !self.inner.active.swap(false, Ordering::AcqRel) {
            return;
        }

        // Waiting on our own delivery from inside the callback would deadlock.
        if !DeliveryScope::is_delivering(self.inner.id) {
            drop(
                self.inner
                    .gate
                    .write()
                    .unwrap_or_else(PoisonError::into_inner),
            );
        }

        let released = {
            let mut state = self.lock_state();
            let count = state.tags.len();
            state.tags = HashMap::new();
            count
        };

        info!(
            session = %self.inner.id,
            reason = %reason,
            released,
            "Inventory stopped"
        );
        self.inner.observer.on_inventory_stopped(reason);
    }
}

impl fmt::Debug for InventorySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventorySession")
            .field("id", &self.inner.id)
            .field("started_at", &self.inner.started_at)
            .field("filter_location", &self.inner.filter_location)
            .field("active", &self.is_active())
            .field("paused", &self.is_paused())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(Epc, TagReadState)>>,
        started: Mutex<u32>,
        stopped: Mutex<Vec<StopReason>>,
        intervals: Mutex<Vec<(Timestamp, usize)>>,
    }

    impl Recorder {
        fn states(&self) -> Vec<TagReadState> {
            self.events.lock().unwrap().iter().map(|(_, s)| *s).collect()
        }
    }

    impl InventoryObserver for Recorder {
        fn on_inventory_started(&self) {
            *self.started.lock().unwrap() += 1;
        }

        fn on_tag_state(&self, event: &TagEvent) {
            self.events
                .lock()
                .unwrap()
                .push((event.epc.clone(), event.state));
        }

        fn on_history_interval(&self, at: Timestamp, visible_tags: usize) {
            self.intervals.lock().unwrap().push((at, visible_tags));
        }

        fn on_inventory_stopped(&self, reason: StopReason) {
            self.stopped.lock().unwrap().push(reason);
        }
    }

    fn epc(hex: &str) -> Epc {
        Epc::from_hex(hex).unwrap()
    }

    fn start(filter: EpcFilter) -> (InventorySession, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let session =
            InventorySession::start(recorder.clone(), InventoryConfig::default(), filter).unwrap();
        (session, recorder)
    }

    #[test]
    fn test_start_notifies_observer() {
        let (session, recorder) = start(EpcFilter::all());
        assert!(session.is_active());
        assert!(!session.is_paused());
        assert_eq!(*recorder.started.lock().unwrap(), 1);
        assert_eq!(session.filter_location(), FilterLocation::Host);
    }

    #[test]
    fn test_start_rejects_allow_and_deny() {
        let recorder = Arc::new(Recorder::default());
        let result = InventorySession::start(
            recorder.clone(),
            InventoryConfig::default(),
            EpcFilter::new([epc("AAAAAAAA")], [epc("CCCCCCCC")]),
        );
        assert!(matches!(result, Err(Error::Configuration { .. })));
        assert_eq!(*recorder.started.lock().unwrap(), 0);
    }

    #[test]
    fn test_start_rejects_invalid_config() {
        let result = InventorySession::start(
            Arc::new(Recorder::default()),
            InventoryConfig::default().with_history(0, 20),
            EpcFilter::all(),
        );
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_found_updated_lost_found() {
        let (session, recorder) = start(EpcFilter::all());
        let e1 = epc("E1E1E1E1");

        assert_eq!(
            session.on_raw_read(e1.as_bytes(), 0).unwrap(),
            Some(TagReadState::Found)
        );
        assert_eq!(
            session.on_raw_read(e1.as_bytes(), 100).unwrap(),
            Some(TagReadState::Updated)
        );
        assert_eq!(session.on_tick(10_100).unwrap(), vec![e1.clone()]);
        assert!(session.tag(&e1).unwrap().is_none());
        assert_eq!(
            session.on_raw_read(e1.as_bytes(), 10_200).unwrap(),
            Some(TagReadState::Found)
        );

        assert_eq!(
            recorder.states(),
            vec![
                TagReadState::Found,
                TagReadState::Updated,
                TagReadState::Lost,
                TagReadState::Found
            ]
        );
    }

    #[test]
    fn test_tick_before_window_keeps_tag() {
        let (session, recorder) = start(EpcFilter::all());
        session.on_raw_read(&[1, 2, 3, 4], 0).unwrap();
        assert!(session.on_tick(9_999).unwrap().is_empty());
        assert!(session.on_tick(9_999).unwrap().is_empty());
        assert_eq!(recorder.states(), vec![TagReadState::Found]);
        assert_eq!(*recorder.intervals.lock().unwrap(), vec![(9_999, 1), (9_999, 1)]);
    }

    #[test]
    fn test_lost_reported_once() {
        let (session, recorder) = start(EpcFilter::all());
        session.on_raw_read(&[1, 2, 3, 4], 0).unwrap();
        session.on_tick(10_000).unwrap();
        session.on_tick(20_000).unwrap();
        assert_eq!(recorder.states(), vec![TagReadState::Found, TagReadState::Lost]);
        assert!(recorder.intervals.lock().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_epc_rejected() {
        let (session, recorder) = start(EpcFilter::all());
        let err = session.on_raw_read(&[1, 2], 0).unwrap_err();
        assert!(matches!(err, Error::InvalidEpc { .. }));
        assert!(session.tags().unwrap().is_empty());
        assert!(recorder.states().is_empty());
        assert!(session.is_active());
    }

    #[test]
    fn test_allow_list_filters_reads() {
        let (session, recorder) = start(EpcFilter::allow([epc("AAAAAAAA"), epc("BBBBBBBB")]));
        assert_eq!(session.filter_location(), FilterLocation::Reader);

        assert_eq!(session.on_read(TagRead::new(epc("CCCCCCCC"), 0)).unwrap(), None);
        session.on_read(TagRead::new(epc("AAAAAAAA"), 0)).unwrap();
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
        assert!(session.tag(&epc("CCCCCCCC")).unwrap().is_none());
    }

    #[test]
    fn test_deny_list_filters_reads() {
        let (session, recorder) = start(EpcFilter::deny([epc("CCCCCCCC")]));
        for hex in ["AAAAAAAA", "BBBBBBBB", "CCCCCCCC"] {
            session.on_read(TagRead::new(epc(hex), 0)).unwrap();
        }
        let seen: Vec<Epc> = recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .map(|(e, _)| e.clone())
            .collect();
        assert_eq!(seen, vec![epc("AAAAAAAA"), epc("BBBBBBBB")]);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (session, recorder) = start(EpcFilter::all());
        session.on_raw_read(&[1, 2, 3, 4], 0).unwrap();
        session.stop();
        session.stop();
        session.stop_with(StopReason::LostConnection);

        assert!(!session.is_active());
        assert_eq!(*recorder.stopped.lock().unwrap(), vec![StopReason::Stopped]);
        assert_eq!(recorder.states(), vec![TagReadState::Found]);
    }

    #[test]
    fn test_operations_after_stop_fail() {
        let (session, recorder) = start(EpcFilter::all());
        session.stop();

        assert!(matches!(
            session.on_raw_read(&[1, 2, 3, 4], 0),
            Err(Error::InvalidState { .. })
        ));
        // State is checked before the EPC.
        assert!(matches!(
            session.on_raw_read(&[1], 0),
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(session.on_tick(0), Err(Error::InvalidState { .. })));
        assert!(matches!(session.pause(), Err(Error::InvalidState { .. })));
        assert!(matches!(session.resume(), Err(Error::InvalidState { .. })));
        assert!(matches!(session.tags(), Err(Error::InvalidState { .. })));
        assert!(recorder.states().is_empty());
    }

    #[test]
    fn test_pause_ignores_reads_and_ticks() {
        let (session, recorder) = start(EpcFilter::all());
        session.on_raw_read(&[1, 2, 3, 4], 0).unwrap();
        session.pause().unwrap();
        assert!(session.is_paused());

        assert_eq!(session.on_raw_read(&[5, 6, 7, 8], 10).unwrap(), None);
        assert!(session.on_tick(50_000).unwrap().is_empty());

        session.resume().unwrap();
        assert_eq!(session.on_tick(50_000).unwrap().len(), 1);
        assert_eq!(recorder.states(), vec![TagReadState::Found, TagReadState::Lost]);
    }

    #[test]
    fn test_stop_from_own_callback() {
        struct StopOnFirstFind {
            session: Mutex<Option<InventorySession>>,
            finds: Mutex<u32>,
        }

        impl InventoryObserver for StopOnFirstFind {
            fn on_tag_state(&self, _event: &TagEvent) {
                *self.finds.lock().unwrap() += 1;
                if let Some(session) = self.session.lock().unwrap().as_ref() {
                    session.stop();
                }
            }
        }

        let observer = Arc::new(StopOnFirstFind {
            session: Mutex::new(None),
            finds: Mutex::new(0),
        });
        let session =
            InventorySession::start(observer.clone(), InventoryConfig::default(), EpcFilter::all())
                .unwrap();
        *observer.session.lock().unwrap() = Some(session.clone());

        session.on_raw_read(&[1, 2, 3, 4], 0).unwrap();
        assert!(!session.is_active());
        assert!(session.on_raw_read(&[1, 2, 3, 4], 1).is_err());
        assert_eq!(*observer.finds.lock().unwrap(), 1);

        // Break the reference cycle.
        observer.session.lock().unwrap().take();
    }

    #[test]
    fn test_tags_snapshot() {
        let (session, _recorder) = start(EpcFilter::all());
        session
            .on_read(TagRead::new(epc("0A0A0A0A"), 0).with_rssi(-30, -31))
            .unwrap();
        session.on_read(TagRead::new(epc("0B0B0B0B"), 0)).unwrap();

        let tags = session.tags().unwrap();
        assert_eq!(tags.len(), 2);
        let tag = session.tag(&epc("0A0A0A0A")).unwrap().unwrap();
        assert_eq!(tag.total_reads(), 1);
        assert!(tag.rssi().is_some());
    }

    #[test]
    fn test_subsequent_finds_not_reported_when_disabled() {
        let recorder = Arc::new(Recorder::default());
        let config = InventoryConfig::default().with_report_subsequent_finds(false);
        let session = InventorySession::start(recorder.clone(), config, EpcFilter::all()).unwrap();
        let tag = epc("E2E2E2E2");

        assert_eq!(
            session.on_raw_read(tag.as_bytes(), 0).unwrap(),
            Some(TagReadState::Found)
        );
        assert_eq!(
            session.on_raw_read(tag.as_bytes(), 100).unwrap(),
            Some(TagReadState::Updated)
        );
        session.on_raw_read(tag.as_bytes(), 200).unwrap();
        assert_eq!(recorder.states(), vec![TagReadState::Found]);
        assert_eq!(session.tag(&tag).unwrap().unwrap().total_reads(), 3);

        session.on_tick(10_200).unwrap();
        assert_eq!(
            recorder.states(),
            vec![TagReadState::Found, TagReadState::Lost]
        );
    }
}
