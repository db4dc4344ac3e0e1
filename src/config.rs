//! Configuration module for the Temp Relay service.
//!
//! All settings are read once at startup from environment variables and
//! validated; invalid values are fatal. The core engine never re-reads
//! configuration.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::channel::{ChannelSpec, Pin, RemoteSensorId};

/// Default GPIO pins with sensors attached
const DEFAULT_SENSOR_PINS: &str = "3,4,7";

/// Default seconds between sample events
const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 300;

/// Default seconds between flush events
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 1800;

/// Default delivery attempts per channel per flush cycle
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default seconds between delivery attempts
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Default seconds between engine ticks
const DEFAULT_TICK_PERIOD_SECS: u64 = 1;

/// Default HTTP request timeout in seconds
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default CSV log file path
const DEFAULT_LOG_PATH: &str = "temperature_log.csv";

/// Configuration for the Temp Relay service.
///
/// All settings can be configured via environment variables:
/// - `TEMP_RELAY_API_URL`: delivery endpoint (unset: aggregates stay local)
/// - `TEMP_RELAY_PASSPHRASE`: shared project passphrase (default: empty)
/// - `TEMP_RELAY_SENSOR_PINS`: comma-separated pin list (default: 3,4,7)
/// - `TEMP_RELAY_SENSOR_MAPPING`: comma-separated `pin:remote_id` pairs
///   (default: empty; unmapped pins are persisted locally only)
/// - `TEMP_RELAY_SAMPLE_INTERVAL_SECS`: seconds between samples (default: 300)
/// - `TEMP_RELAY_FLUSH_INTERVAL_SECS`: seconds between flushes (default: 1800)
/// - `TEMP_RELAY_MAX_ATTEMPTS`: delivery attempts per cycle (default: 5)
/// - `TEMP_RELAY_RETRY_DELAY_SECS`: delay between attempts (default: 5)
/// - `TEMP_RELAY_TICK_PERIOD_SECS`: engine tick period (default: 1)
/// - `TEMP_RELAY_REQUEST_TIMEOUT_SECS`: HTTP request timeout (default: 30)
/// - `TEMP_RELAY_LOG_PATH`: CSV log path (default: temperature_log.csv)
#[derive(Debug, Clone)]
pub struct Config {
    /// Delivery endpoint URL; `None` skips delivery entirely
    pub endpoint: Option<String>,

    /// Shared passphrase sent with every payload
    pub passphrase: String,

    /// Configured channels in stable order
    pub channels: Vec<ChannelSpec>,

    /// Interval between sample events
    pub sample_interval: Duration,

    /// Interval between flush events
    pub flush_interval: Duration,

    /// Delivery attempts per channel per flush cycle
    pub max_attempts: u32,

    /// Fixed delay between delivery attempts
    pub retry_delay: Duration,

    /// Period of the engine tick loop
    pub tick_period: Duration,

    /// HTTP request timeout
    pub request_timeout: Duration,

    /// CSV log file path
    pub log_path: PathBuf,
}

/// Error type for configuration loading failures
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub env_var: Option<String>,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.env_var {
            Some(var) => write!(f, "Configuration error for {}: {}", var, self.message),
            None => write!(f, "Configuration error: {}", self.message),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Returns a new `Config` with values from environment variables,
    /// falling back to defaults where appropriate.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any numeric variable is not a valid
    /// number, an interval or attempt count is zero, or the pin list or
    /// sensor mapping is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = env::var("TEMP_RELAY_API_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let passphrase = env::var("TEMP_RELAY_PASSPHRASE").unwrap_or_default();

        let pins = Self::parse_pins()?;
        let mapping = Self::parse_mapping()?;
        let channels = pins
            .into_iter()
            .map(|pin| ChannelSpec {
                pin: Pin(pin),
                remote_id: mapping
                    .iter()
                    .find(|(mapped_pin, _)| *mapped_pin == pin)
                    .map(|(_, id)| RemoteSensorId(*id)),
            })
            .collect();

        let sample_interval = Duration::from_secs(Self::parse_u64(
            "TEMP_RELAY_SAMPLE_INTERVAL_SECS",
            DEFAULT_SAMPLE_INTERVAL_SECS,
            1,
        )?);
        let flush_interval = Duration::from_secs(Self::parse_u64(
            "TEMP_RELAY_FLUSH_INTERVAL_SECS",
            DEFAULT_FLUSH_INTERVAL_SECS,
            1,
        )?);
        let max_attempts =
            Self::parse_u64("TEMP_RELAY_MAX_ATTEMPTS", u64::from(DEFAULT_MAX_ATTEMPTS), 1)? as u32;
        let retry_delay = Duration::from_secs(Self::parse_u64(
            "TEMP_RELAY_RETRY_DELAY_SECS",
            DEFAULT_RETRY_DELAY_SECS,
            0,
        )?);
        let tick_period = Duration::from_secs(Self::parse_u64(
            "TEMP_RELAY_TICK_PERIOD_SECS",
            DEFAULT_TICK_PERIOD_SECS,
            1,
        )?);
        let request_timeout = Duration::from_secs(Self::parse_u64(
            "TEMP_RELAY_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
            1,
        )?);

        let log_path = env::var("TEMP_RELAY_LOG_PATH")
            .unwrap_or_else(|_| DEFAULT_LOG_PATH.to_string())
            .into();

        Ok(Self {
            endpoint,
            passphrase,
            channels,
            sample_interval,
            flush_interval,
            max_attempts,
            retry_delay,
            tick_period,
            request_timeout,
            log_path,
        })
    }

    /// Parse a non-negative integer variable with a lower bound.
    fn parse_u64(env_var: &str, default: u64, min: u64) -> Result<u64, ConfigError> {
        match env::var(env_var) {
            Ok(value) => {
                let parsed: u64 = value.parse().map_err(|_| ConfigError {
                    message: format!("'{}' is not a valid number", value),
                    env_var: Some(env_var.to_string()),
                })?;

                if parsed < min {
                    return Err(ConfigError {
                        message: format!("{} is below minimum ({})", parsed, min),
                        env_var: Some(env_var.to_string()),
                    });
                }

                Ok(parsed)
            }
            Err(_) => Ok(default),
        }
    }

    /// Parse the sensor pin list.
    fn parse_pins() -> Result<Vec<u8>, ConfigError> {
        let env_var = "TEMP_RELAY_SENSOR_PINS";
        let raw = env::var(env_var).unwrap_or_else(|_| DEFAULT_SENSOR_PINS.to_string());

        let mut pins = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let pin: u8 = entry.parse().map_err(|_| ConfigError {
                message: format!("'{}' is not a valid pin number", entry),
                env_var: Some(env_var.to_string()),
            })?;
            pins.push(pin);
        }

        Ok(pins)
    }

    /// Parse the `pin:remote_id` mapping list.
    ///
    /// Entries for pins not in the pin list are harmless and ignored.
    fn parse_mapping() -> Result<Vec<(u8, u32)>, ConfigError> {
        let env_var = "TEMP_RELAY_SENSOR_MAPPING";
        let raw = env::var(env_var).unwrap_or_default();

        let mut mapping = Vec::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (pin, id) = entry.split_once(':').ok_or_else(|| ConfigError {
                message: format!("'{}' is not a 'pin:remote_id' pair", entry),
                env_var: Some(env_var.to_string()),
            })?;

            let pin: u8 = pin.trim().parse().map_err(|_| ConfigError {
                message: format!("'{}' is not a valid pin number", pin),
                env_var: Some(env_var.to_string()),
            })?;
            let id: u32 = id.trim().parse().map_err(|_| ConfigError {
                message: format!("'{}' is not a valid remote sensor id", id),
                env_var: Some(env_var.to_string()),
            })?;

            mapping.push((pin, id));
        }

        Ok(mapping)
    }
}

impl Default for Config {
    /// Create a default configuration using default values.
    ///
    /// This is useful for testing or when environment variables are not
    /// set.
    fn default() -> Self {
        Self {
            endpoint: None,
            passphrase: String::new(),
            channels: vec![
                ChannelSpec {
                    pin: Pin(3),
                    remote_id: None,
                },
                ChannelSpec {
                    pin: Pin(4),
                    remote_id: None,
                },
                ChannelSpec {
                    pin: Pin(7),
                    remote_id: None,
                },
            ],
            sample_interval: Duration::from_secs(DEFAULT_SAMPLE_INTERVAL_SECS),
            flush_interval: Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
            tick_period: Duration::from_secs(DEFAULT_TICK_PERIOD_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        original: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let original = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                original,
            }
        }

        fn remove(key: &str) -> Self {
            let original = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                original,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.original {
                Some(val) => env::set_var(&self.key, val),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn clear_all() -> Vec<EnvGuard> {
        [
            "TEMP_RELAY_API_URL",
            "TEMP_RELAY_PASSPHRASE",
            "TEMP_RELAY_SENSOR_PINS",
            "TEMP_RELAY_SENSOR_MAPPING",
            "TEMP_RELAY_SAMPLE_INTERVAL_SECS",
            "TEMP_RELAY_FLUSH_INTERVAL_SECS",
            "TEMP_RELAY_MAX_ATTEMPTS",
            "TEMP_RELAY_RETRY_DELAY_SECS",
            "TEMP_RELAY_TICK_PERIOD_SECS",
            "TEMP_RELAY_REQUEST_TIMEOUT_SECS",
            "TEMP_RELAY_LOG_PATH",
        ]
        .iter()
        .map(|key| EnvGuard::remove(key))
        .collect()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.endpoint.is_none());
        assert_eq!(config.channels.len(), 3);
        assert_eq!(config.sample_interval, Duration::from_secs(300));
        assert_eq!(config.flush_interval, Duration::from_secs(1800));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
    }

    #[test]
    fn test_config_from_env_with_defaults() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();

        let config = Config::from_env().expect("Should load with defaults");
        assert!(config.endpoint.is_none());
        assert_eq!(config.passphrase, "");
        assert_eq!(
            config.channels.iter().map(|c| c.pin.0).collect::<Vec<_>>(),
            vec![3, 4, 7]
        );
        assert!(config.channels.iter().all(|c| c.remote_id.is_none()));
        assert_eq!(config.sample_interval, Duration::from_secs(300));
        assert_eq!(config.flush_interval, Duration::from_secs(1800));
        assert_eq!(config.log_path, PathBuf::from("temperature_log.csv"));
    }

    #[test]
    fn test_config_from_env_custom_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g1 = EnvGuard::set("TEMP_RELAY_API_URL", "http://custom:9000/api.php/data/");
        let _g2 = EnvGuard::set("TEMP_RELAY_SENSOR_PINS", "2, 5");
        let _g3 = EnvGuard::set("TEMP_RELAY_SENSOR_MAPPING", "2:17, 5:18");
        let _g4 = EnvGuard::set("TEMP_RELAY_SAMPLE_INTERVAL_SECS", "10");
        let _g5 = EnvGuard::set("TEMP_RELAY_FLUSH_INTERVAL_SECS", "60");
        let _g6 = EnvGuard::set("TEMP_RELAY_MAX_ATTEMPTS", "3");
        let _g7 = EnvGuard::set("TEMP_RELAY_PASSPHRASE", "hunter2");

        let config = Config::from_env().expect("Should load custom values");
        // Trailing slash removed
        assert_eq!(
            config.endpoint.as_deref(),
            Some("http://custom:9000/api.php/data")
        );
        assert_eq!(config.passphrase, "hunter2");
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[0].pin, Pin(2));
        assert_eq!(config.channels[0].remote_id, Some(RemoteSensorId(17)));
        assert_eq!(config.channels[1].remote_id, Some(RemoteSensorId(18)));
        assert_eq!(config.sample_interval, Duration::from_secs(10));
        assert_eq!(config.flush_interval, Duration::from_secs(60));
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_unmapped_pins_have_no_remote_id() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g1 = EnvGuard::set("TEMP_RELAY_SENSOR_PINS", "3,4");
        // GP9 is not in the pin list; its entry is ignored
        let _g2 = EnvGuard::set("TEMP_RELAY_SENSOR_MAPPING", "3:11,9:99");

        let config = Config::from_env().unwrap();
        assert_eq!(config.channels[0].remote_id, Some(RemoteSensorId(11)));
        assert_eq!(config.channels[1].remote_id, None);
    }

    #[test]
    fn test_invalid_pin_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g = EnvGuard::set("TEMP_RELAY_SENSOR_PINS", "3,GP4");

        let err = Config::from_env().unwrap_err();
        assert!(err.message.contains("not a valid pin number"));
    }

    #[test]
    fn test_malformed_mapping_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g = EnvGuard::set("TEMP_RELAY_SENSOR_MAPPING", "3=11");

        let err = Config::from_env().unwrap_err();
        assert!(err.message.contains("pin:remote_id"));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g = EnvGuard::set("TEMP_RELAY_SAMPLE_INTERVAL_SECS", "not_a_number");

        let err = Config::from_env().unwrap_err();
        assert!(err.message.contains("not a valid number"));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g = EnvGuard::set("TEMP_RELAY_FLUSH_INTERVAL_SECS", "0");

        let err = Config::from_env().unwrap_err();
        assert!(err.message.contains("below minimum"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g = EnvGuard::set("TEMP_RELAY_MAX_ATTEMPTS", "0");

        let err = Config::from_env().unwrap_err();
        assert!(err.message.contains("below minimum"));
    }

    #[test]
    fn test_zero_retry_delay_allowed() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g = EnvGuard::set("TEMP_RELAY_RETRY_DELAY_SECS", "0");

        let config = Config::from_env().unwrap();
        assert_eq!(config.retry_delay, Duration::ZERO);
    }

    #[test]
    fn test_empty_endpoint_treated_as_unset() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _guards = clear_all();
        let _g = EnvGuard::set("TEMP_RELAY_API_URL", "");

        let config = Config::from_env().unwrap();
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn test_config_error_display() {
        let error = ConfigError {
            message: "test error".to_string(),
            env_var: Some("TEST_VAR".to_string()),
        };
        assert_eq!(
            format!("{}", error),
            "Configuration error for TEST_VAR: test error"
        );

        let error_no_var = ConfigError {
            message: "general error".to_string(),
            env_var: None,
        };
        assert_eq!(
            format!("{}", error_no_var),
            "Configuration error: general error"
        );
    }
}
