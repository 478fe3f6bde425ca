//! Scenario files replayed by the simulator.
//!
//! A scenario names the reader, the inventory to run and a list of timed
//! steps. Each step becomes one transport event.
//!
//! ```json
//! {
//!   "reader": { "model": "Grokker 1" },
//!   "inventory_type": "locate_distance",
//!   "filter": { "deny": ["E2000000"] },
//!   "steps": [
//!     { "read": { "epc": "E2000001", "at": 0 } },
//!     { "tick": 500 },
//!     "disconnect"
//!   ]
//! }
//! ```

use anyhow::{Context, Result};
use grokker_core::{CounterUpdate, Rssi, Timestamp};
use grokker_inventory::{EpcFilter, InventoryConfig, InventoryType};
use grokker_reader::{ReaderInfo, TransportEvent};
use serde::Deserialize;
use std::path::Path;

/// Scenario file contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    /// Reader reported by the handshake.
    pub reader: ReaderInfo,

    /// Preset used when `config` is absent.
    pub inventory_type: Option<InventoryType>,

    /// Explicit inventory configuration.
    pub config: Option<InventoryConfig>,

    /// EPC filter for the inventory.
    pub filter: EpcFilter,

    /// Steps replayed in order.
    pub steps: Vec<Step>,
}

/// One scenario step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Raw tag read.
    Read {
        /// EPC as hex; may be malformed on purpose.
        epc: String,
        at: Timestamp,
        #[serde(default)]
        rssi: Option<Rssi>,
    },

    /// Heartbeat at a timestamp.
    Tick(Timestamp),

    /// Counter deltas from the byte protocol.
    Counters(CounterUpdate),

    /// Reader unplugged.
    Disconnect,

    /// Reader plugged back in.
    Reconnect,
}

impl Scenario {
    /// Load a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    /// Parse a scenario from JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(text)?;
        scenario.inventory_config().validate()?;
        scenario.filter.validate()?;
        Ok(scenario)
    }

    /// Configuration for the inventory: explicit, preset, or default.
    pub fn inventory_config(&self) -> InventoryConfig {
        match (&self.config, self.inventory_type) {
            (Some(config), _) => config.clone(),
            (None, Some(inventory_type)) => InventoryConfig::for_inventory_type(inventory_type),
            (None, None) => InventoryConfig::default(),
        }
    }

    /// Transport events for every step, in order.
    pub fn events(&self) -> Result<Vec<TransportEvent>> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| step.to_event(&self.reader).with_context(|| format!("step {i}")))
            .collect()
    }
}

impl Step {
    fn to_event(&self, reader: &ReaderInfo) -> Result<TransportEvent> {
        Ok(match self {
            Self::Read { epc, at, rssi } => TransportEvent::TagRead {
                epc: hex::decode(epc).with_context(|| format!("EPC {epc:?} is not hex"))?,
                timestamp: *at,
                rssi: *rssi,
            },
            Self::Tick(at) => TransportEvent::Tick(*at),
            Self::Counters(update) => TransportEvent::Counters(*update),
            Self::Disconnect => TransportEvent::Disconnected,
            Self::Reconnect => TransportEvent::Connected(reader.clone()),
        })
    }
}
