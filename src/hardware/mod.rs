//! Hardware abstraction layer for the GPS receiver and the buzzer
//!
//! The transport yields raw NMEA lines from a serial device; the actuator
//! drives a single active buzzer on a GPIO output. Both have mock
//! implementations for tests and development.

pub mod transport;
pub mod serial;
pub mod buzzer;
pub mod mock;
pub mod error;

pub use transport::{Transport, TransportStatus, TransportConfig};
pub use serial::SerialTransport;
pub use buzzer::{BuzzerActuator, BuzzerConfig, GpioBuzzer, StartupBeep, open_sysfs_buzzer};
pub use mock::{BuzzerEvent, MockBuzzer, MockBuzzerHandle, MockTransport, MockTransportHandle};
pub use error::{ActuatorError, ActuatorResult, RecoveryStrategy, TransportError, TransportResult};

use std::time::Instant;

/// Raw line received from the GPS transport, terminator stripped
#[derive(Debug, Clone)]
pub struct RawLine {
    pub bytes: Vec<u8>,
    pub received_at: Instant,
}

impl RawLine {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            received_at: Instant::now(),
        }
    }

    /// Build a line from staged bytes, dropping trailing `\r` and `\n`
    pub fn from_terminated(mut bytes: Vec<u8>) -> Self {
        while matches!(bytes.last(), Some(b'\n') | Some(b'\r')) {
            bytes.pop();
        }
        Self::new(bytes)
    }

    pub fn with_timestamp(mut self, received_at: Instant) -> Self {
        self.received_at = received_at;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminator_stripped() {
        let line = RawLine::from_terminated(b"$GPGGA,1*00\r\n".to_vec());
        assert_eq!(line.bytes, b"$GPGGA,1*00".to_vec());

        let line = RawLine::from_terminated(b"\r\n".to_vec());
        assert!(line.is_empty());
    }
}
