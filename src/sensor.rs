//! Temperature sensor capability and reading validation.
//!
//! The physical sensor bus is an external collaborator; the engine only
//! depends on the `TemperatureSensor` trait. A simulated implementation is
//! provided for development and testing.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Lowest temperature the supported sensor family can report, in °C.
pub const TEMP_MIN_C: f64 = -55.0;

/// Highest temperature the supported sensor family can report, in °C.
pub const TEMP_MAX_C: f64 = 125.0;

/// Conversion time mandated by the hardware sensor bus.
pub const BUS_CONVERSION_DELAY: Duration = Duration::from_millis(750);

/// A validated temperature reading in degrees Celsius.
///
/// Values outside `[-55.0, 125.0]` (including NaN and sensor sentinel
/// codes) cannot be constructed; they are rejected at the boundary and the
/// reading is discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Temperature(f64);

impl Temperature {
    /// Validate a raw reading. Returns `None` when it is out of range.
    pub fn new(degrees_c: f64) -> Option<Self> {
        if (TEMP_MIN_C..=TEMP_MAX_C).contains(&degrees_c) {
            Some(Self(degrees_c))
        } else {
            None
        }
    }

    /// The reading in degrees Celsius.
    pub fn degrees(&self) -> f64 {
        self.0
    }
}

/// Errors that can occur while acquiring a reading.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorError {
    /// Bus-level failure during conversion or read
    Bus(String),

    /// The sensor did not answer within the bus timeout
    Timeout,

    /// The sensor answered with a value outside the valid range
    OutOfRange(f64),
}

impl std::fmt::Display for SensorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SensorError::Bus(msg) => write!(f, "sensor bus error: {}", msg),
            SensorError::Timeout => write!(f, "timed out waiting for sensor"),
            SensorError::OutOfRange(value) => write!(
                f,
                "reading {} outside valid range [{}, {}]",
                value, TEMP_MIN_C, TEMP_MAX_C
            ),
        }
    }
}

impl std::error::Error for SensorError {}

/// Capability trait for one physical temperature sensor.
///
/// Acquisition is two-phase: trigger a conversion, wait the bus-mandated
/// delay, then read the result. The delay belongs to the implementation,
/// not the engine.
#[async_trait]
pub trait TemperatureSensor: Send {
    /// Trigger a temperature conversion.
    async fn start_conversion(&mut self) -> Result<(), SensorError>;

    /// Wait required between conversion start and read.
    fn conversion_delay(&self) -> Duration;

    /// Read the converted temperature in degrees Celsius.
    ///
    /// The raw value is unvalidated; range checking happens in the caller.
    async fn read_temperature(&mut self) -> Result<f64, SensorError>;
}

/// Maximum per-read drift of the simulated sensor, in °C.
const SIMULATED_MAX_STEP_C: f64 = 0.25;

/// A simulated temperature sensor producing a bounded random walk.
///
/// Used by the shipped binary and in tests, where no hardware bus is
/// available.
pub struct SimulatedSensor {
    current: f64,
}

impl SimulatedSensor {
    /// Create a simulated sensor starting at the given temperature.
    pub fn new(base_temp_c: f64) -> Self {
        Self {
            current: base_temp_c.clamp(TEMP_MIN_C, TEMP_MAX_C),
        }
    }
}

#[async_trait]
impl TemperatureSensor for SimulatedSensor {
    async fn start_conversion(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn conversion_delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn read_temperature(&mut self) -> Result<f64, SensorError> {
        let step = rand::thread_rng().gen_range(-SIMULATED_MAX_STEP_C..=SIMULATED_MAX_STEP_C);
        self.current = (self.current + step).clamp(TEMP_MIN_C, TEMP_MAX_C);
        Ok(self.current)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_accepts_valid_range() {
        assert_eq!(Temperature::new(20.12).map(|t| t.degrees()), Some(20.12));
        assert_eq!(Temperature::new(TEMP_MIN_C).map(|t| t.degrees()), Some(TEMP_MIN_C));
        assert_eq!(Temperature::new(TEMP_MAX_C).map(|t| t.degrees()), Some(TEMP_MAX_C));
    }

    #[test]
    fn test_temperature_rejects_out_of_range() {
        assert!(Temperature::new(-55.1).is_none());
        assert!(Temperature::new(125.1).is_none());
        // DS18B20-style power-on sentinel
        assert!(Temperature::new(200.0).is_none());
        assert!(Temperature::new(f64::NAN).is_none());
    }

    #[test]
    fn test_sensor_error_display() {
        assert_eq!(
            format!("{}", SensorError::Bus("crc mismatch".to_string())),
            "sensor bus error: crc mismatch"
        );
        assert!(format!("{}", SensorError::OutOfRange(200.0)).contains("200"));
    }

    #[tokio::test]
    async fn test_simulated_sensor_stays_in_range() {
        let mut sensor = SimulatedSensor::new(21.0);
        for _ in 0..1000 {
            sensor.start_conversion().await.unwrap();
            let value = sensor.read_temperature().await.unwrap();
            assert!(Temperature::new(value).is_some());
        }
    }

    #[tokio::test]
    async fn test_scripted_sensor_replays_then_errors() {
        let mut sensor = mocks::ScriptedSensor::new(vec![Ok(20.0), Err(SensorError::Timeout)]);
        assert_eq!(sensor.read_temperature().await, Ok(20.0));
        assert_eq!(sensor.read_temperature().await, Err(SensorError::Timeout));
        assert!(matches!(
            sensor.read_temperature().await,
            Err(SensorError::Bus(_))
        ));
    }
}
