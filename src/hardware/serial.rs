//! Serial/UART transport for NMEA receivers

use crate::hardware::{
    RawLine, Transport, TransportConfig, TransportError, TransportResult, TransportStatus,
};
use log::{debug, info, warn};
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

/// Serial transport backed by the `serialport` crate
///
/// Bytes are staged until a `\n` arrives. A port that errors out is dropped
/// and reopened on a later read once the reconnect interval has passed.
pub struct SerialTransport {
    config: TransportConfig,
    port: Option<Box<dyn SerialPort>>,
    status: TransportStatus,
    read_buffer: Vec<u8>,
    last_connect_attempt: Option<Instant>,
    closed: bool,
}

impl SerialTransport {
    /// Open the configured port
    pub fn open(config: TransportConfig) -> TransportResult<Self> {
        config.validate()?;

        let mut transport = Self {
            read_buffer: Vec::with_capacity(config.max_line_length),
            config,
            port: None,
            status: TransportStatus::new(),
            last_connect_attempt: None,
            closed: false,
        };
        transport.connect()?;

        Ok(transport)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Attempt to open the serial device
    fn connect(&mut self) -> TransportResult<()> {
        self.last_connect_attempt = Some(Instant::now());

        let port = serialport::new(self.config.port.as_str(), self.config.baud_rate)
            .timeout(self.config.read_timeout())
            .open()
            .map_err(|e| TransportError::OpenFailed {
                port: self.config.port.clone(),
                details: e.to_string(),
            })?;

        info!(
            "Opened GPS serial port {} at {} baud",
            self.config.port, self.config.baud_rate
        );
        self.port = Some(port);
        self.status.connected = true;
        Ok(())
    }

    /// Drop the device handle; a later read reconnects
    fn disconnect(&mut self, details: String) -> TransportError {
        warn!("GPS serial port {} lost: {}", self.config.port, details);
        self.port = None;
        self.read_buffer.clear();
        self.status.connected = false;
        self.status.error_count += 1;
        TransportError::ConnectionLost {
            port: self.config.port.clone(),
            details,
        }
    }

    fn reconnect_due(&self) -> bool {
        match self.last_connect_attempt {
            Some(at) => at.elapsed() >= self.config.reconnect_interval(),
            None => true,
        }
    }

    /// Take one complete line out of the staging buffer
    fn take_line(&mut self) -> Option<RawLine> {
        let end = self.read_buffer.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.read_buffer.drain(..=end).collect();
        self.status.lines_received += 1;
        let raw = RawLine::from_terminated(line);
        self.status.last_line_time = Some(raw.received_at);
        Some(raw)
    }
}

impl Transport for SerialTransport {
    fn read_line(&mut self, timeout: Duration) -> TransportResult<Option<RawLine>> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        if self.port.is_none() {
            if !self.reconnect_due() {
                std::thread::sleep(timeout.min(self.config.reconnect_interval()));
                return Ok(None);
            }
            debug!("Reopening GPS serial port {}", self.config.port);
            self.connect()?;
            self.status.reconnects += 1;
        }

        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 128];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let port = match self.port.as_mut() {
                Some(port) => port,
                None => return Ok(None),
            };

            if let Err(e) = port.set_timeout(remaining) {
                return Err(self.disconnect(e.to_string()));
            }

            match port.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.read_buffer.extend_from_slice(&chunk[..n]);
                    let limit = self.config.max_line_length;
                    if self.read_buffer.len() > limit && !self.read_buffer.contains(&b'\n') {
                        self.read_buffer.clear();
                        self.status.error_count += 1;
                        return Err(TransportError::BufferOverflow { limit });
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(None),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(self.disconnect(e.to_string())),
            }
        }
    }

    fn flush_unread(&mut self) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }

        self.read_buffer.clear();
        if let Some(port) = self.port.as_ref() {
            port.clear(ClearBuffer::Input)
                .map_err(|e| TransportError::ReadFailed {
                    details: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.port = None;
        self.read_buffer.clear();
        self.status.connected = false;
        info!("Closed GPS serial port {}", self.config.port);
    }

    fn is_open(&self) -> bool {
        !self.closed && self.port.is_some()
    }

    fn get_status(&self) -> TransportStatus {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device_fails() {
        let config = TransportConfig {
            port: "/dev/treasure-seeker-no-such-port".to_string(),
            ..TransportConfig::default()
        };

        let result = SerialTransport::open(config);
        assert!(matches!(result, Err(TransportError::OpenFailed { .. })));
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let config = TransportConfig {
            baud_rate: 0,
            ..TransportConfig::default()
        };

        let result = SerialTransport::open(config);
        assert!(matches!(result, Err(TransportError::ConfigurationError { .. })));
    }
}
