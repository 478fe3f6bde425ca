//! Driver task connecting a transport to a reader connection.
//!
//! The driver owns the transport and consumes its events one at a time on a
//! single tokio task, so reads, ticks and counter updates reach the engine
//! in the order the reader reported them.
//!
//! # Examples
//!
//! ```
//! use grokker_reader::mock::MockTransport;
//! use grokker_reader::{ReaderConnection, ReaderDriver, ReaderInfo};
//!
//! #[tokio::main]
//! async fn main() -> grokker_reader::Result<()> {
//!     let connection = ReaderConnection::new();
//!     let (transport, handle) = MockTransport::new();
//!     let driver = ReaderDriver::spawn(connection.clone(), transport.into());
//!
//!     handle.connect(ReaderInfo::new("Grokker 1")).await?;
//!     handle.tick(500).await?;
//!     drop(handle);
//!
//!     let stats = driver.join().await?;
//!     assert_eq!(stats.events, 2);
//!     assert!(connection.is_connected());
//!     Ok(())
//! }
//! ```

use crate::{
    connection::ReaderConnection,
    error::{ReaderError, Result},
    transport::{AnyReaderTransport, ReaderTransport, TransportEvent},
};
use grokker_core::ConnectionState;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Counts of events processed by a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Events consumed from the transport.
    pub events: u64,

    /// Tag reads that reached an active inventory.
    pub tag_reads: u64,

    /// Well-formed reads with no active inventory, filtered out, or paused.
    pub ignored_reads: u64,

    /// Tag reads dropped because the EPC was malformed.
    pub dropped_reads: u64,

    /// Heartbeats processed.
    pub ticks: u64,

    /// Tags reported lost by heartbeats.
    pub lost_tags: u64,
}

/// Spawns driver tasks.
#[derive(Debug)]
pub struct ReaderDriver;

impl ReaderDriver {
    /// Spawn a task feeding `transport` events into `connection`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(connection: ReaderConnection, transport: AnyReaderTransport) -> DriverHandle {
        let mut tasks = JoinSet::new();
        tasks.spawn(Self::run(connection, transport));
        DriverHandle { tasks }
    }

    async fn run(
        connection: ReaderConnection,
        mut transport: AnyReaderTransport,
    ) -> Result<DriverStats> {
        info!(transport = transport.name(), "Driver started");
        let mut stats = DriverStats::default();

        while let Some(event) = transport.next_event().await? {
            stats.events += 1;
            debug!(kind = event.kind(), "Transport event");
            Self::dispatch(&connection, event, &mut stats)?;
        }

        info!(
            transport = transport.name(),
            events = stats.events,
            tag_reads = stats.tag_reads,
            ignored_reads = stats.ignored_reads,
            dropped_reads = stats.dropped_reads,
            "Transport closed"
        );
        Ok(stats)
    }

    fn dispatch(
        connection: &ReaderConnection,
        event: TransportEvent,
        stats: &mut DriverStats,
    ) -> Result<()> {
        match event {
            TransportEvent::Connecting => {
                connection.set_connection_state(ConnectionState::Connecting);
            }
            TransportEvent::Connected(reader) => connection.connection_established(reader),
            TransportEvent::Incompatible => {
                connection.set_connection_state(ConnectionState::IncompatibleReader);
            }
            TransportEvent::Disconnected => connection.connection_lost(),
            TransportEvent::TagRead {
                epc,
                timestamp,
                rssi,
            } => match connection.on_raw_read(&epc, timestamp, rssi) {
                Ok(Some(_)) => stats.tag_reads += 1,
                Ok(None) => stats.ignored_reads += 1,
                Err(ReaderError::Inventory(e)) if e.is_dropped_read() => {
                    warn!(epc = ?epc, error = %e, "Dropping malformed tag read");
                    stats.dropped_reads += 1;
                }
                Err(e) => return Err(e),
            },
            TransportEvent::Tick(now) => {
                let lost = connection.on_tick(now)?;
                stats.ticks += 1;
                stats.lost_tags += lost.len() as u64;
            }
            TransportEvent::Counters(update) => connection.counters().apply(&update),
            TransportEvent::Battery(battery) => connection.battery_reported(battery),
        }
        Ok(())
    }
}

/// Handle to a running driver task.
#[derive(Debug)]
pub struct DriverHandle {
    tasks: JoinSet<Result<DriverStats>>,
}

impl DriverHandle {
    /// Wait for the transport to close and return what was processed.
    ///
    /// # Errors
    /// Returns the error that stopped the driver, or
    /// `ReaderError::TaskFailed` if the task panicked or was cancelled.
    pub async fn join(mut self) -> Result<DriverStats> {
        match self.tasks.join_next().await {
            Some(Ok(result)) => result,
            Some(Err(e)) => Err(ReaderError::task_failed(e.to_string())),
            None => Ok(DriverStats::default()),
        }
    }

    /// Abort the driver and wait for it to terminate.
    ///
    /// Events still queued in the transport are discarded. Task errors are
    /// logged, not returned.
    pub async fn shutdown(mut self) -> Result<()> {
        self.tasks.abort_all();

        let mut error_count = 0;
        let mut panic_count = 0;

        while let Some(result) = self.tasks.join_next().await {
            match Self::classify_task_result(result) {
                TaskTermination::Success | TaskTermination::Cancelled => {}
                TaskTermination::Error => error_count += 1,
                TaskTermination::Panic => panic_count += 1,
            }
        }

        if error_count + panic_count > 0 {
            warn!(error_count, panic_count, "Driver terminated abnormally");
        } else {
            info!("Driver shut down");
        }
        Ok(())
    }

    fn classify_task_result(
        result: std::result::Result<Result<DriverStats>, tokio::task::JoinError>,
    ) -> TaskTermination {
        match result {
            Ok(Ok(_)) => TaskTermination::Success,
            Ok(Err(_)) => TaskTermination::Error,
            Err(e) if e.is_cancelled() => TaskTermination::Cancelled,
            Err(_) => TaskTermination::Panic,
        }
    }
}

/// How a driver task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskTermination {
    Success,
    Error,
    /// Expected during shutdown.
    Cancelled,
    Panic,
}
