//! Common test utilities for reader integration tests.

#![allow(dead_code)]

use grokker_core::{Epc, TagReadState};
use grokker_inventory::{InventoryObserver, StopReason, TagEvent};
use grokker_reader::mock::{MockTransport, MockTransportHandle};
use grokker_reader::{DriverHandle, ReaderConnection, ReaderDriver, ReaderInfo};
use std::sync::{Arc, Mutex};

/// Observer that records tag transitions and stop reasons.
#[derive(Debug, Default)]
pub struct TagLog {
    transitions: Mutex<Vec<(Epc, TagReadState)>>,
    stops: Mutex<Vec<StopReason>>,
}

impl TagLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn transitions(&self) -> Vec<(Epc, TagReadState)> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn states_for(&self, epc: &Epc) -> Vec<TagReadState> {
        self.transitions()
            .into_iter()
            .filter(|(e, _)| e == epc)
            .map(|(_, state)| state)
            .collect()
    }

    pub fn stops(&self) -> Vec<StopReason> {
        self.stops.lock().unwrap().clone()
    }
}

impl InventoryObserver for TagLog {
    fn on_tag_state(&self, event: &TagEvent) {
        self.transitions
            .lock()
            .unwrap()
            .push((event.epc.clone(), event.state));
    }

    fn on_inventory_stopped(&self, reason: StopReason) {
        self.stops.lock().unwrap().push(reason);
    }
}

/// Raw 4-byte EPC bytes numbered `n`.
pub fn raw_epc(n: u32) -> Vec<u8> {
    n.to_be_bytes().to_vec()
}

/// Parsed EPC numbered `n`.
pub fn epc(n: u32) -> Epc {
    Epc::new(&raw_epc(n)).unwrap()
}

/// Test reader handshake info.
pub fn reader() -> ReaderInfo {
    ReaderInfo::new("Test Reader").with_serial_number(1234)
}

/// Connection with a running mock driver.
pub fn spawn_driver() -> (ReaderConnection, MockTransportHandle, DriverHandle) {
    let connection = ReaderConnection::new();
    let (transport, handle) = MockTransport::new();
    let driver = ReaderDriver::spawn(connection.clone(), transport.into());
    (connection, handle, driver)
}
