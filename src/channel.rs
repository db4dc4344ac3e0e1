//! Per-sensor channel: identity, reading buffer, and window aggregation.
//!
//! A channel owns one sensor and accumulates its valid readings between
//! flush events. Flushing drains the buffer and reduces it to a single
//! mean, mirroring the accumulate-then-drain shape of a batching buffer.

use tracing::debug;

use crate::sensor::{SensorError, Temperature, TemperatureSensor};

/// GPIO pin a sensor is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin(pub u8);

impl std::fmt::Display for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GP{}", self.0)
    }
}

/// Identifier of a sensor on the remote backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteSensorId(pub u32);

impl std::fmt::Display for RemoteSensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Startup configuration of one channel.
///
/// A channel without a remote id is still sampled and persisted locally;
/// its aggregates are just never delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSpec {
    pub pin: Pin,
    pub remote_id: Option<RemoteSensorId>,
}

/// Reduction of one channel's readings over one flush window.
///
/// `mean` is `None` exactly when `sample_count == 0`; a window with no
/// valid readings is a representable state, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub mean: Option<f64>,
    pub sample_count: u32,
}

/// One physical sensor and its buffered readings.
pub struct Channel {
    spec: ChannelSpec,
    sensor: Box<dyn TemperatureSensor>,
    buffer: Vec<Temperature>,
}

impl Channel {
    /// Create a channel around the given sensor.
    pub fn new(spec: ChannelSpec, sensor: Box<dyn TemperatureSensor>) -> Self {
        Self {
            spec,
            sensor,
            buffer: Vec::new(),
        }
    }

    /// The pin this channel's sensor is attached to.
    pub fn pin(&self) -> Pin {
        self.spec.pin
    }

    /// The remote backend id, if one is configured.
    pub fn remote_id(&self) -> Option<RemoteSensorId> {
        self.spec.remote_id
    }

    /// Number of readings buffered since the last flush.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Acquire one reading and append it to the buffer.
    ///
    /// Runs the full acquisition sequence: trigger conversion, wait the
    /// bus-mandated delay, read, validate. A failure leaves the buffer
    /// untouched and is the caller's to log; it never aborts other
    /// channels.
    pub async fn sample(&mut self) -> Result<Temperature, SensorError> {
        self.sensor.start_conversion().await?;
        tokio::time::sleep(self.sensor.conversion_delay()).await;
        let raw = self.sensor.read_temperature().await?;
        let reading = Temperature::new(raw).ok_or(SensorError::OutOfRange(raw))?;
        self.buffer.push(reading);
        Ok(reading)
    }

    /// Reduce the buffered readings to their arithmetic mean and clear the
    /// buffer.
    ///
    /// The buffer is cleared unconditionally, even when it was empty.
    /// No rounding happens here; values are rounded once, where they are
    /// serialized.
    pub fn take_aggregate(&mut self) -> Aggregate {
        let readings = std::mem::take(&mut self.buffer);
        let sample_count = readings.len() as u32;

        let mean = if sample_count == 0 {
            None
        } else {
            let sum: f64 = readings.iter().map(Temperature::degrees).sum();
            Some(sum / sample_count as f64)
        };

        debug!(pin = %self.spec.pin, samples = sample_count, "window drained");

        Aggregate { mean, sample_count }
    }
}
