//! Tag inventory engine.
//!
//! Tracks per-EPC read history, applies allow/deny filtering and reports
//! FOUND / UPDATED / LOST transitions to an [`InventoryObserver`].
//!
//! - [`history`]: fixed-depth ring of per-interval read counts
//! - [`aggregate`]: per-tag statistics and state
//! - [`filter`]: EPC allow/deny sets and filter placement
//! - [`config`]: session configuration and presets
//! - [`observer`]: notification types and the observer trait
//! - [`session`]: the inventory session

pub mod aggregate;
pub mod config;
pub mod filter;
pub mod history;
pub mod observer;
pub mod session;

pub use aggregate::TagAggregate;
pub use config::{InventoryConfig, InventoryType, SoundType};
pub use filter::{EpcFilter, FilterLocation};
pub use history::ReadHistory;
pub use observer::{InventoryObserver, StopReason, TagEvent};
pub use session::InventorySession;
