//! Temp Relay - Temperature sampling and relay service
//!
//! This service samples temperature sensors on a short interval,
//! aggregates the readings over a longer window, appends each window's
//! means to a local CSV log, and relays them to a remote HTTP endpoint
//! with bounded retries and connectivity recovery.
//!
//! ## Features
//!
//! - Dual-interval scheduling of sample and flush events
//! - Per-channel reading buffers with out-of-range rejection
//! - Local CSV persistence before any delivery attempt
//! - HTTP delivery with a shared reconnect/send retry budget
//! - Graceful shutdown on Ctrl+C
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `TEMP_RELAY_API_URL`: delivery endpoint (unset: aggregates stay local)
//! - `TEMP_RELAY_PASSPHRASE`: shared project passphrase (default: empty)
//! - `TEMP_RELAY_SENSOR_PINS`: comma-separated pin list (default: 3,4,7)
//! - `TEMP_RELAY_SENSOR_MAPPING`: `pin:remote_id` pairs (default: empty)
//! - `TEMP_RELAY_SAMPLE_INTERVAL_SECS`: seconds between samples (default: 300)
//! - `TEMP_RELAY_FLUSH_INTERVAL_SECS`: seconds between flushes (default: 1800)
//! - `TEMP_RELAY_MAX_ATTEMPTS`: delivery attempts per cycle (default: 5)
//! - `TEMP_RELAY_RETRY_DELAY_SECS`: delay between attempts (default: 5)
//! - `TEMP_RELAY_LOG_PATH`: CSV log path (default: temperature_log.csv)
//! - `RUST_LOG`: Logging level filter (default: info)

use std::time::Instant;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use temp_relay::channel::Channel;
use temp_relay::config::Config;
use temp_relay::delivery::{DeliveryAgent, HttpUploader, LogIndicator, Uploader};
use temp_relay::engine::Engine;
use temp_relay::link::OsManagedLink;
use temp_relay::scheduler::Scheduler;
use temp_relay::sensor::SimulatedSensor;
use temp_relay::sink::CsvSink;

/// Temperature the simulated sensors start from, in °C.
const SIMULATED_BASE_TEMP_C: f64 = 21.0;

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber with environment filter
    init_tracing();

    info!("Starting Temp Relay service...");

    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(config) => {
            info!(
                endpoint = config.endpoint.as_deref().unwrap_or("<none>"),
                channels = config.channels.len(),
                sample_interval_secs = config.sample_interval.as_secs(),
                flush_interval_secs = config.flush_interval.as_secs(),
                max_attempts = config.max_attempts,
                "Configuration loaded"
            );
            config
        }
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if config.channels.is_empty() {
        error!("No sensor channels configured");
        std::process::exit(1);
    }

    // One channel per configured pin. The hardware sensor bus is an
    // external collaborator; this build ships with simulated sensors.
    let channels: Vec<Channel> = config
        .channels
        .iter()
        .map(|spec| {
            info!(pin = %spec.pin, remote_id = ?spec.remote_id, "Channel configured");
            Channel::new(*spec, Box::new(SimulatedSensor::new(SIMULATED_BASE_TEMP_C)))
        })
        .collect();

    // Open the CSV sink, writing the header if needed
    let sink = match CsvSink::open(&config.log_path, &config.channels) {
        Ok(sink) => {
            info!(path = %config.log_path.display(), "CSV sink ready");
            sink
        }
        Err(e) => {
            error!(error = %e, "Failed to open CSV sink");
            std::process::exit(1);
        }
    };

    // Create the HTTP uploader when an endpoint is configured
    let uploader: Option<Box<dyn Uploader>> = match &config.endpoint {
        Some(url) => match HttpUploader::new(url.as_str(), config.request_timeout) {
            Ok(uploader) => {
                info!(endpoint = %url, "HTTP uploader initialized");
                Some(Box::new(uploader))
            }
            Err(e) => {
                error!(error = %e, "Failed to create HTTP uploader");
                std::process::exit(1);
            }
        },
        None => {
            info!("No delivery endpoint configured, aggregates stay local");
            None
        }
    };

    let agent = DeliveryAgent::new(
        uploader,
        Box::new(LogIndicator),
        config.passphrase.clone(),
        config.max_attempts,
        config.retry_delay,
    );

    let scheduler = Scheduler::new(
        Instant::now(),
        config.sample_interval,
        config.flush_interval,
    );
    let mut engine = Engine::new(
        channels,
        scheduler,
        Box::new(OsManagedLink),
        Box::new(sink),
        agent,
        config.tick_period,
    );

    info!("Temp Relay running. Press Ctrl+C to stop.");
    tokio::select! {
        _ = engine.run() => {}
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => info!("Shutdown signal received, stopping..."),
                Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
            }
        }
    }

    info!("Temp Relay stopped");
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}
