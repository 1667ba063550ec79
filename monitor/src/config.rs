//! Configuration module for the Logship monitor.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `LOGSHIP_POLL_INTERVAL_SECS` | No | 30 | Seconds between poll cycles |
//!
//! # Example
//!
//! ```no_run
//! use logship_monitor::config::MonitorConfig;
//!
//! let config = MonitorConfig::from_env().expect("Failed to load configuration");
//! println!("Poll interval: {:?}", config.poll_interval);
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;

/// Default poll interval in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Configuration for the Logship monitor.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Interval between poll cycles. The poll interval is the only
    /// core-level timing parameter; transport operations apply their own
    /// network timeouts.
    pub poll_interval: Duration,
}

impl MonitorConfig {
    /// Creates a configuration with an explicit poll interval.
    #[must_use]
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Creates a new `MonitorConfig` by parsing environment variables.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if `LOGSHIP_POLL_INTERVAL_SECS` is set but is
    /// not a positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let poll_interval = match env::var("LOGSHIP_POLL_INTERVAL_SECS") {
            Ok(val) => {
                let secs = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    key: "LOGSHIP_POLL_INTERVAL_SECS".to_string(),
                    message: format!("expected positive integer, got '{val}'"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "LOGSHIP_POLL_INTERVAL_SECS".to_string(),
                        message: "poll interval must be at least 1 second".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        };

        Ok(Self { poll_interval })
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}
