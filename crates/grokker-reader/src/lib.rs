//! Reader connection layer for the Grokker inventory engine.
//!
//! This crate owns everything that depends on a physical reader being
//! present: the connection state machine, the single active inventory per
//! connection, sound feedback settings, and the transport that feeds reads
//! and heartbeats into the engine.
//!
//! # Overview
//!
//! - [`ReaderConnection`]: explicitly constructed connection manager.
//!   Subscribers receive [`ConnectionEvent`]s through a
//!   [`ConnectionSubscription`].
//! - [`ReaderTransport`]: source of [`TransportEvent`]s, dispatched through
//!   [`AnyReaderTransport`]. [`mock::MockTransport`] scripts events in tests.
//! - [`ReaderDriver`]: tokio task that drains a transport into a connection
//!   in order.
//!
//! # Examples
//!
//! ```
//! use grokker_inventory::{InventoryConfig, InventoryObserver, TagEvent};
//! use grokker_reader::mock::MockTransport;
//! use grokker_reader::{ReaderConnection, ReaderDriver, ReaderInfo};
//! use std::sync::Arc;
//!
//! struct Print;
//! impl InventoryObserver for Print {
//!     fn on_tag_state(&self, event: &TagEvent) {
//!         println!("{} {} {:.1}/s", event.epc, event.state, event.find_rate);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> grokker_reader::Result<()> {
//!     let connection = ReaderConnection::new();
//!     let (transport, handle) = MockTransport::new();
//!     let driver = ReaderDriver::spawn(connection.clone(), transport.into());
//!
//!     handle.connect(ReaderInfo::new("Grokker 1")).await?;
//!     connection.start_inventory(Arc::new(Print), InventoryConfig::default())?;
//!     handle.tag_read(vec![0xE2, 0x00, 0x00, 0x01], 0).await?;
//!     handle.tick(10_000).await?;
//!     drop(handle);
//!
//!     let stats = driver.join().await?;
//!     assert_eq!(stats.lost_tags, 1);
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod driver;
pub mod error;
pub mod events;
pub mod mock;
pub mod sound;
pub mod transport;
pub mod types;

pub use connection::ReaderConnection;
pub use driver::{DriverHandle, DriverStats, ReaderDriver};
pub use error::{ReaderError, Result};
pub use events::{ConnectionEvent, ConnectionSubscription};
pub use sound::{GeigerCounterSound, SoundSettings, SpeakerTone};
pub use transport::{AnyReaderTransport, ReaderTransport, TransportEvent};
pub use types::{BatteryInfo, FirmwareVersion, ReaderInfo};
