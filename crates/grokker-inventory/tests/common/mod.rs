//! Common test utilities for inventory integration tests.
//!
//! [`RecordingObserver`] captures every notification so tests can assert on
//! the exact sequence a session produced.

#![allow(dead_code)]

use grokker_core::{Epc, TagReadState, Timestamp};
use grokker_inventory::{
    EpcFilter, InventoryConfig, InventoryObserver, InventorySession, StopReason, TagEvent,
};
use std::sync::{Arc, Mutex};

/// Notification captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Started,
    Tag(TagEvent),
    HistoryInterval { at: Timestamp, visible: usize },
    Stopped(StopReason),
}

/// Observer that records every notification in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Tag events only.
    pub fn tag_events(&self) -> Vec<TagEvent> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Tag(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    /// `(epc, state)` pairs of tag events.
    pub fn transitions(&self) -> Vec<(Epc, TagReadState)> {
        self.tag_events()
            .into_iter()
            .map(|event| (event.epc, event.state))
            .collect()
    }

    /// States reported for one EPC.
    pub fn states_for(&self, epc: &Epc) -> Vec<TagReadState> {
        self.tag_events()
            .into_iter()
            .filter(|event| &event.epc == epc)
            .map(|event| event.state)
            .collect()
    }

    pub fn stop_reasons(&self) -> Vec<StopReason> {
        self.notifications()
            .into_iter()
            .filter_map(|n| match n {
                Notification::Stopped(reason) => Some(reason),
                _ => None,
            })
            .collect()
    }

    fn push(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

impl InventoryObserver for RecordingObserver {
    fn on_inventory_started(&self) {
        self.push(Notification::Started);
    }

    fn on_tag_state(&self, event: &TagEvent) {
        self.push(Notification::Tag(event.clone()));
    }

    fn on_history_interval(&self, at: Timestamp, visible_tags: usize) {
        self.push(Notification::HistoryInterval {
            at,
            visible: visible_tags,
        });
    }

    fn on_inventory_stopped(&self, reason: StopReason) {
        self.push(Notification::Stopped(reason));
    }
}

/// Build a 4-byte EPC from a number.
pub fn epc(n: u32) -> Epc {
    Epc::new(&n.to_be_bytes()).unwrap()
}

/// Start a session with the default 500ms x 20 configuration.
pub fn start_session(filter: EpcFilter) -> (InventorySession, Arc<RecordingObserver>) {
    start_session_with(InventoryConfig::default(), filter)
}

pub fn start_session_with(
    config: InventoryConfig,
    filter: EpcFilter,
) -> (InventorySession, Arc<RecordingObserver>) {
    let observer = RecordingObserver::new();
    let session = InventorySession::start(observer.clone(), config, filter).unwrap();
    (session, observer)
}

/// Assert the sequence never has two `Found` without a `Lost` between them
/// and never has `Updated` or `Lost` while the tag is absent.
pub fn assert_well_formed(states: &[TagReadState]) {
    let mut present = false;
    for (i, state) in states.iter().enumerate() {
        match state {
            TagReadState::Found => {
                assert!(!present, "FOUND while present at {i}: {states:?}");
                present = true;
            }
            TagReadState::Updated => {
                assert!(present, "UPDATED while absent at {i}: {states:?}");
            }
            TagReadState::Lost => {
                assert!(present, "LOST while absent at {i}: {states:?}");
                present = false;
            }
        }
    }
}
