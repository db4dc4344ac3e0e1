//! Temp Relay Library
//!
//! This library provides components for a sensor-to-cloud temperature
//! relay:
//!
//! - **config**: Environment-based configuration for the service
//! - **sensor**: Temperature sensor capability and reading validation
//! - **channel**: Per-sensor reading buffer and window aggregation
//! - **scheduler**: Dual-interval scheduling of sample and flush events
//! - **link**: Network link capability
//! - **sink**: Append-only CSV persistence of flush-cycle rows
//! - **delivery**: HTTP delivery with bounded retry and link recovery
//! - **engine**: Tick loop sequencing sampling, persistence and delivery
//!
//! # Example
//!
//! ```no_run
//! use std::time::Instant;
//!
//! use temp_relay::channel::Channel;
//! use temp_relay::config::Config;
//! use temp_relay::delivery::{DeliveryAgent, HttpUploader, LogIndicator, Uploader};
//! use temp_relay::engine::Engine;
//! use temp_relay::link::OsManagedLink;
//! use temp_relay::scheduler::Scheduler;
//! use temp_relay::sensor::SimulatedSensor;
//! use temp_relay::sink::CsvSink;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::from_env().expect("Failed to load config");
//!
//!     let channels: Vec<Channel> = config
//!         .channels
//!         .iter()
//!         .map(|spec| Channel::new(*spec, Box::new(SimulatedSensor::new(21.0))))
//!         .collect();
//!
//!     let sink = CsvSink::open(&config.log_path, &config.channels)
//!         .expect("Failed to open CSV sink");
//!
//!     let uploader: Option<Box<dyn Uploader>> = config.endpoint.as_ref().map(|url| {
//!         let uploader = HttpUploader::new(url.as_str(), config.request_timeout)
//!             .expect("Failed to create uploader");
//!         Box::new(uploader) as Box<dyn Uploader>
//!     });
//!     let agent = DeliveryAgent::new(
//!         uploader,
//!         Box::new(LogIndicator),
//!         config.passphrase.clone(),
//!         config.max_attempts,
//!         config.retry_delay,
//!     );
//!
//!     let scheduler = Scheduler::new(
//!         Instant::now(),
//!         config.sample_interval,
//!         config.flush_interval,
//!     );
//!     let mut engine = Engine::new(
//!         channels,
//!         scheduler,
//!         Box::new(OsManagedLink),
//!         Box::new(sink),
//!         agent,
//!         config.tick_period,
//!     );
//!     engine.run().await;
//! }
//! ```

// Module declarations
pub mod channel;
pub mod config;
pub mod delivery;
pub mod engine;
pub mod link;
pub mod scheduler;
pub mod sensor;
pub mod sink;

// Re-export commonly used types at crate root for convenience
pub use channel::{Aggregate, Channel, ChannelSpec, Pin, RemoteSensorId};
pub use config::{Config, ConfigError};
pub use delivery::{
    DeliveryAgent, DeliveryOutcome, HttpUploader, LogIndicator, StatusIndicator, UploadError,
    UploadPayload, Uploader,
};
pub use engine::Engine;
pub use link::{LinkError, NetworkLink, OsManagedLink};
pub use scheduler::{Scheduler, TickEvents};
pub use sensor::{SensorError, SimulatedSensor, Temperature, TemperatureSensor};
pub use sink::{csv_header, CsvSink, RecordSink, Row};
