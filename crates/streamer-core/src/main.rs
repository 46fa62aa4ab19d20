//! Streamer
//!
//! Runs one streamer session driven by newline-delimited JSON on stdin and
//! writes every transport and rendering call as a JSON line on stdout. Logs
//! go to stderr.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Open the slot-name store
//! 4. Spawn the `StreamerSession` actor
//! 5. Feed stdin until EOF or ctrl-c, then disconnect and wait for the session

#![warn(clippy::pedantic)]

use anyhow::Context;
use streamer_core::config::Config;
use streamer_core::persistence::{JsonFileStore, NullStore, SlotNameStore};
use streamer_core::replay::{feed, ReplayConference, ReplayInput, ReplaySink, ReplaySurface};
use streamer_core::session::StreamerSession;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    // Initialize tracing; stdout carries replay records
    let fmt_layer = if config.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "streamer_core=debug,streamer=debug".into()),
        )
        .with(fmt_layer)
        .init();

    info!("Starting Streamer");

    info!(
        instance_id = %config.instance_id,
        slots = config.slot_names.len(),
        room = ?config.room,
        has_room_password = config.room_password.is_some(),
        slot_names_file = ?config.slot_names_file,
        midi_enabled = config.midi_enabled,
        "Configuration loaded successfully"
    );

    // Initialize Prometheus metrics recorder
    // This must happen before any metrics are recorded
    streamer_core::observability::init_metrics_recorder(config.metrics_bind_address).map_err(
        |e| {
            error!(error = %e, "Failed to install Prometheus metrics recorder");
            anyhow::anyhow!(e)
        },
    )?;

    let store: Box<dyn SlotNameStore> = match &config.slot_names_file {
        Some(path) => Box::new(JsonFileStore::new(path.clone())),
        None => Box::new(NullStore),
    };

    let sink = ReplaySink::new(Box::new(std::io::stdout()));
    let cancel_token = CancellationToken::new();

    let (handle, session_task) = StreamerSession::spawn(
        &config,
        Box::new(ReplayConference::new(sink.clone())),
        Box::new(ReplaySurface::new(sink.clone(), config.slot_names.len())),
        store,
        cancel_token.clone(),
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }

            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    info!("Input closed");
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                let input: ReplayInput = match serde_json::from_str(&line) {
                    Ok(input) => input,
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed input line");
                        continue;
                    }
                };
                if let Err(e) = feed(&handle, &sink, input).await {
                    error!(error = %e, "Session stopped unexpectedly");
                    break;
                }
            }
        }
    }

    if let Err(e) = handle.disconnect().await {
        warn!(error = %e, "Disconnect on shutdown failed");
    }
    cancel_token.cancel();
    session_task.await.context("Session task panicked")?;

    info!("Streamer shutdown complete");
    Ok(())
}
