//! # ANTChirp
//!
//! Pair with an ANT+ geocache over an ANT USB stick and decode its pages.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Set up logging with tracing subscriber
//!    - Load configuration (first argument, or `config/default.toml`)
//!    - Open the ANT USB stick and start the reader/writer tasks
//!
//! 2. **Pairing**
//!    - Claim and enable the radio
//!    - Reset it, then open the geocache channel once the reset completes
//!    - Decode pages and request the rest of the record as data arrives
//!
//! 3. **Graceful Shutdown**
//!    - Close the channel on Ctrl+C
//!    - Write the learned device number back to the configuration file
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=antchirp=debug cargo run --release -- config/default.toml
//! ```

use anyhow::{Context, Result};
use std::path::Path;
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::{timeout, Duration};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use antchirp::channel::GEO_CHANNEL;
use antchirp::config::Config;
use antchirp::manager::AntManager;
use antchirp::radio::RadioEventHandler;
use antchirp::serial::{run_reader, run_writer, AntUsbSerial, SerialCommandSink};
use antchirp::telemetry::TelemetryCallbacks;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// How long pending frames get to reach the stick on shutdown
const SHUTDOWN_FLUSH_TIMEOUT_MS: u64 = 500;

/// Name of the rolling text log written next to the telemetry files
const LOG_FILE_NAME: &str = "antchirp.log";

/// Load the configuration file, `None` if it does not exist
fn load_config(path: &Path) -> Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    Config::load(path)
        .map(Some)
        .with_context(|| format!("Failed to load {}", path.display()))
}

/// Console logging, plus a daily log file in the telemetry directory
///
/// The returned guard flushes the file writer when dropped.
fn init_logging(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    if !config.telemetry.enabled {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&config.telemetry.log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    Some(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config_path = Path::new(&config_path);
    let loaded = load_config(config_path)?;
    let mut config = loaded.clone().unwrap_or_default();

    let _log_guard = init_logging(&config);
    info!("ANTChirp v{} starting...", env!("CARGO_PKG_VERSION"));
    if loaded.is_none() {
        warn!("{} not found, using default configuration", config_path.display());
    }

    let serial = AntUsbSerial::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)?;
    info!("ANT serial port opened at: {}", serial.device_path());
    let (reader, writer) = serial.into_split();

    let (frame_tx, frame_rx) = unbounded_channel();
    let (event_tx, mut event_rx) = unbounded_channel();
    let writer_task = tokio::spawn(run_writer(writer, frame_rx));
    let mut reader_task = tokio::spawn(run_reader(reader, event_tx.clone()));

    let sink = SerialCommandSink::new(frame_tx, event_tx);
    let callbacks = TelemetryCallbacks::new(&config.telemetry)?;
    let mut manager = AntManager::new(sink, callbacks, config.geocache.clone());
    if let Some(key) = config.radio.key() {
        manager = manager.with_network_key(config.radio.network, key);
    }

    manager.try_claim_interface();
    manager.enable();
    manager.open_channel(GEO_CHANNEL, true)?;
    manager.request_reset();

    info!("Searching for geocaches, press Ctrl+C to exit");

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                manager.handle_event(event);
            }

            result = &mut reader_task => {
                match result {
                    Ok(Ok(())) => warn!("ANT stick stopped sending"),
                    Ok(Err(e)) => warn!("Serial reader failed: {}", e),
                    Err(e) => warn!("Serial reader task panicked: {}", e),
                }
                break;
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    manager.close_channel(GEO_CHANNEL)?;

    config.geocache = manager.settings().clone();
    match config.save(config_path) {
        Ok(()) => info!("Saved settings to {}", config_path.display()),
        Err(e) => warn!("Could not save settings: {}", e),
    }

    // Dropping the manager closes the frame queue so the writer can finish
    drop(manager);
    if timeout(Duration::from_millis(SHUTDOWN_FLUSH_TIMEOUT_MS), writer_task)
        .await
        .is_err()
    {
        warn!("Timed out flushing pending frames");
    }
    reader_task.abort();

    Ok(())
}
