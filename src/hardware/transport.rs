//! Transport interface trait and configuration

use crate::hardware::{RawLine, TransportError, TransportResult};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Line-oriented source of GPS sentences
pub trait Transport: Send {
    /// Wait up to `timeout` for the next complete line.
    /// Returns Ok(Some(line)) if a line arrived
    /// Returns Ok(None) if the timeout elapsed (not an error)
    /// Returns Err(error) if the read failed
    fn read_line(&mut self, timeout: Duration) -> TransportResult<Option<RawLine>>;

    /// Drop staged bytes and anything still queued in the device
    fn flush_unread(&mut self) -> TransportResult<()>;

    /// Close the transport; later reads fail with `TransportError::Closed`
    fn close(&mut self);

    /// Check if the transport is currently open
    fn is_open(&self) -> bool;

    /// Get current transport status
    fn get_status(&self) -> TransportStatus;
}

/// Transport status information
#[derive(Debug, Clone, PartialEq)]
pub struct TransportStatus {
    pub connected: bool,
    pub last_line_time: Option<Instant>,
    pub lines_received: u64,
    pub error_count: u32,
    pub reconnects: u32,
}

impl TransportStatus {
    pub fn new() -> Self {
        Self {
            connected: false,
            last_line_time: None,
            lines_received: 0,
            error_count: 0,
            reconnects: 0,
        }
    }
}

impl Default for TransportStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Serial transport configuration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Serial device path
    pub port: String,
    /// Baud rate of the receiver
    pub baud_rate: u32,
    /// Bound on a single line read (milliseconds)
    pub read_timeout_ms: u32,
    /// Minimum wait between reconnect attempts (milliseconds)
    pub reconnect_interval_ms: u32,
    /// Longest line accepted before the staged bytes are dropped
    pub max_line_length: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port: "/dev/serial0".to_string(),
            baud_rate: 9600,
            read_timeout_ms: 1000,
            reconnect_interval_ms: 2000,
            max_line_length: 256,
        }
    }
}

impl TransportConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms as u64)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms as u64)
    }

    pub fn validate(&self) -> TransportResult<()> {
        if self.port.trim().is_empty() {
            return Err(TransportError::ConfigurationError {
                parameter: "port".to_string(),
                value: "''".to_string(),
            });
        }

        if self.baud_rate == 0 {
            return Err(TransportError::ConfigurationError {
                parameter: "baud_rate".to_string(),
                value: self.baud_rate.to_string(),
            });
        }

        if !(10..=10_000).contains(&self.read_timeout_ms) {
            return Err(TransportError::ConfigurationError {
                parameter: "read_timeout_ms".to_string(),
                value: self.read_timeout_ms.to_string(),
            });
        }

        // NMEA caps sentences at 82 characters
        if self.max_line_length < 82 || self.max_line_length > 4096 {
            return Err(TransportError::ConfigurationError {
                parameter: "max_line_length".to_string(),
                value: self.max_line_length.to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = TransportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.read_timeout(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_config() {
        let mut config = TransportConfig::default();
        config.baud_rate = 0;
        assert!(matches!(
            config.validate(),
            Err(TransportError::ConfigurationError { .. })
        ));

        let mut config = TransportConfig::default();
        config.read_timeout_ms = 0;
        assert!(config.validate().is_err());

        let mut config = TransportConfig::default();
        config.max_line_length = 16;
        assert!(config.validate().is_err());
    }
}
