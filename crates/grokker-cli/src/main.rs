//! Grokker inventory simulator.
//!
//! Replays a scenario file through a mock reader transport and logs every
//! inventory notification. Diagnostics are printed as JSON when the scenario
//! finishes.
//!
//! ```sh
//! RUST_LOG=debug grokker-sim demos/locate.json --reset-diagnostics
//! ```

mod scenario;

use anyhow::{Context, Result};
use clap::Parser;
use grokker_core::{ConnectionState, Timestamp};
use grokker_inventory::{InventoryObserver, StopReason, TagEvent};
use grokker_reader::mock::MockTransport;
use grokker_reader::{ReaderConnection, ReaderDriver};
use scenario::Scenario;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Replay a tag inventory scenario.
#[derive(Debug, Parser)]
#[command(name = "grokker-sim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file.
    scenario: PathBuf,

    /// Reset the diagnostics counters after printing them.
    #[arg(long)]
    reset_diagnostics: bool,
}

/// Logs every inventory notification.
struct LoggingObserver;

impl InventoryObserver for LoggingObserver {
    fn on_inventory_started(&self) {
        info!("Inventory started");
    }

    fn on_tag_state(&self, event: &TagEvent) {
        info!(
            epc = %event.epc,
            state = %event.state,
            find_rate = event.find_rate,
            total_reads = event.total_reads,
            at = event.timestamp,
            "Tag"
        );
    }

    fn on_history_interval(&self, at: Timestamp, visible_tags: usize) {
        debug!(at, visible_tags, "History interval");
    }

    fn on_inventory_stopped(&self, reason: StopReason) {
        info!(%reason, "Inventory stopped");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let scenario = Scenario::load(&cli.scenario)?;
    let events = scenario.events()?;

    let connection = ReaderConnection::new();
    let (transport, handle) = MockTransport::new();
    let driver = ReaderDriver::spawn(connection.clone(), transport.into());

    let mut subscription = connection.subscribe();
    handle.connect(scenario.reader.clone()).await?;
    while subscription.next_state().await != Some(ConnectionState::Connected) {}

    connection
        .start_inventory_filtered(
            Arc::new(LoggingObserver),
            scenario.inventory_config(),
            scenario.filter.clone(),
        )
        .context("starting inventory")?;

    for event in events {
        handle.send(event).await?;
    }
    drop(handle);

    let stats = driver.join().await?;
    connection.stop_inventory();

    info!(
        events = stats.events,
        tag_reads = stats.tag_reads,
        ignored_reads = stats.ignored_reads,
        dropped_reads = stats.dropped_reads,
        ticks = stats.ticks,
        lost_tags = stats.lost_tags,
        "Scenario finished"
    );

    match connection.diagnostics(cli.reset_diagnostics) {
        Some(data) => println!("{}", serde_json::to_string_pretty(&data)?),
        None => info!("No diagnostics: reader never connected"),
    }

    Ok(())
}
