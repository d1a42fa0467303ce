//! Hardware error types and handling

use std::fmt;

/// Errors raised by the GPS transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// Port could not be opened
    OpenFailed { port: String, details: String },
    /// Port went away while reading
    ConnectionLost { port: String, details: String },
    /// Read or flush failed without losing the port
    ReadFailed { details: String },
    /// Line grew past the configured limit without a terminator
    BufferOverflow { limit: usize },
    /// Configuration error
    ConfigurationError { parameter: String, value: String },
    /// Transport was closed by the lifecycle controller
    Closed,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::OpenFailed { port, details } => {
                write!(f, "Failed to open {}: {}", port, details)
            }
            TransportError::ConnectionLost { port, details } => {
                write!(f, "Connection lost on {}: {}", port, details)
            }
            TransportError::ReadFailed { details } => {
                write!(f, "Read failed: {}", details)
            }
            TransportError::BufferOverflow { limit } => {
                write!(f, "Line exceeded {} bytes without terminator", limit)
            }
            TransportError::ConfigurationError { parameter, value } => {
                write!(f, "Configuration error: invalid {} = {}", parameter, value)
            }
            TransportError::Closed => write!(f, "Transport is closed"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Error recovery strategy for transport failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecoveryStrategy {
    /// Retry the operation immediately
    Retry,
    /// Wait and then retry
    RetryWithDelay { delay_ms: u32 },
    /// Skip this line and continue
    Skip,
    /// Fail permanently
    Fail,
}

impl TransportError {
    /// Get the recommended recovery strategy for this error
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            TransportError::OpenFailed { .. } => RecoveryStrategy::RetryWithDelay { delay_ms: 500 },
            TransportError::ConnectionLost { .. } => RecoveryStrategy::RetryWithDelay { delay_ms: 500 },
            TransportError::ReadFailed { .. } => RecoveryStrategy::Retry,
            TransportError::BufferOverflow { .. } => RecoveryStrategy::Skip,
            TransportError::ConfigurationError { .. } => RecoveryStrategy::Fail,
            TransportError::Closed => RecoveryStrategy::Fail,
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        !matches!(self.recovery_strategy(), RecoveryStrategy::Fail)
    }
}

/// Errors raised by the buzzer actuator
#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorError {
    /// Driving the output pin failed
    PinError { pin: u64, details: String },
    /// Pin could not be prepared as an output
    SetupFailed { pin: u64, details: String },
    /// Timing values that cannot be slept
    InvalidTiming { on_time_s: f64, off_time_s: f64 },
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuatorError::PinError { pin, details } => {
                write!(f, "GPIO {} drive failed: {}", pin, details)
            }
            ActuatorError::SetupFailed { pin, details } => {
                write!(f, "GPIO {} setup failed: {}", pin, details)
            }
            ActuatorError::InvalidTiming { on_time_s, off_time_s } => {
                write!(f, "Invalid beep timing: on={}s off={}s", on_time_s, off_time_s)
            }
        }
    }
}

impl std::error::Error for ActuatorError {}

/// Result type for actuator operations
pub type ActuatorResult<T> = Result<T, ActuatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverability() {
        assert!(TransportError::ReadFailed { details: "eio".to_string() }.is_recoverable());
        assert!(TransportError::BufferOverflow { limit: 256 }.is_recoverable());
        assert!(TransportError::ConnectionLost {
            port: "/dev/serial0".to_string(),
            details: "unplugged".to_string(),
        }
        .is_recoverable());
        assert!(!TransportError::Closed.is_recoverable());
        assert_eq!(
            TransportError::Closed.recovery_strategy(),
            RecoveryStrategy::Fail
        );
    }

    #[test]
    fn test_display() {
        let error = ActuatorError::InvalidTiming { on_time_s: -1.0, off_time_s: 0.5 };
        assert_eq!(error.to_string(), "Invalid beep timing: on=-1s off=0.5s");
    }
}
