//! Bridge configuration types

use crate::{BridgeError, BridgeResult, LogLevel};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout value that disables the per-request deadline
pub const NO_TIMEOUT: i64 = -1;

/// Options a bridge is constructed with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeOptions {
    /// Default per-request deadline in milliseconds
    ///
    /// Must be greater than zero, or [`NO_TIMEOUT`] to wait indefinitely.
    #[serde(default = "default_timeout")]
    pub timeout_ms: i64,

    /// Delay between two connect attempts in milliseconds
    #[serde(default)]
    pub connect_retry_delay_ms: u64,

    /// Initial log level name, e.g. `"debug"`
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_timeout() -> i64 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout(),
            connect_retry_delay_ms: 0,
            log_level: default_log_level(),
        }
    }
}

impl BridgeOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create options from JSON bytes
    ///
    /// Missing fields take their default values; empty input yields the defaults.
    pub fn from_json(bytes: &[u8]) -> BridgeResult<Self> {
        if bytes.is_empty() {
            return Ok(Self::default());
        }
        let options: Self = serde_json::from_slice(bytes)
            .map_err(|e| BridgeError::InvalidArgument(format!("invalid bridge options: {}", e)))?;
        options.validate()?;
        Ok(options)
    }

    /// Set the default request timeout in milliseconds
    pub fn with_timeout_ms(mut self, timeout_ms: i64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the delay between connect attempts
    pub fn with_connect_retry_delay(mut self, delay: Duration) -> Self {
        self.connect_retry_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Check that the options are usable
    pub fn validate(&self) -> BridgeResult<()> {
        validate_timeout(self.timeout_ms)?;
        if LogLevel::from_name(&self.log_level).is_none() {
            return Err(BridgeError::InvalidArgument(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    /// The configured log level, `Info` when the name is not recognized
    pub fn parsed_log_level(&self) -> LogLevel {
        LogLevel::from_name(&self.log_level).unwrap_or(LogLevel::Info)
    }

    /// The default request deadline, `None` when timeouts are disabled
    pub fn timeout(&self) -> Option<Duration> {
        timeout_from_millis(self.timeout_ms)
    }

    /// Delay between connect attempts
    pub fn connect_retry_delay(&self) -> Duration {
        Duration::from_millis(self.connect_retry_delay_ms)
    }

    /// Apply per-request overrides on top of these options
    pub fn merged(&self, overrides: &RequestOverrides) -> BridgeResult<Self> {
        let mut merged = self.clone();
        if let Some(timeout_ms) = overrides.timeout_ms {
            merged.timeout_ms = timeout_ms;
        }
        merged.validate()?;
        Ok(merged)
    }
}

/// Partial options overriding a bridge's defaults for a single request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOverrides {
    /// Deadline for this request in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<i64>,
}

impl RequestOverrides {
    /// No overrides
    pub fn none() -> Self {
        Self::default()
    }

    /// Override the request deadline
    pub fn timeout_ms(timeout_ms: i64) -> Self {
        Self {
            timeout_ms: Some(timeout_ms),
        }
    }

    /// Wait for the response without a deadline
    pub fn no_timeout() -> Self {
        Self::timeout_ms(NO_TIMEOUT)
    }
}

fn validate_timeout(timeout_ms: i64) -> BridgeResult<()> {
    if timeout_ms > 0 || timeout_ms == NO_TIMEOUT {
        Ok(())
    } else {
        Err(BridgeError::InvalidArgument(format!(
            "timeout must be greater than 0 or {} (got {})",
            NO_TIMEOUT, timeout_ms
        )))
    }
}

fn timeout_from_millis(timeout_ms: i64) -> Option<Duration> {
    u64::try_from(timeout_ms)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
