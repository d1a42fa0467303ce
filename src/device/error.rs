//! Device-level error type

use crate::hardware::{ActuatorError, TransportError};
use crate::utils::ConfigError;
use std::fmt;

/// Errors surfaced by the proximity detector
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// Configuration rejected
    Config(ConfigError),
    /// GPS transport failure
    Transport(TransportError),
    /// Buzzer failure
    Actuator(ActuatorError),
    /// `start` called on a detector that already ran
    AlreadyStarted,
    /// Worker thread could not be created
    ThreadSpawn { name: String, details: String },
}

impl DeviceError {
    /// Process exit status for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            DeviceError::Config(_) => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Config(e) => write!(f, "Configuration error: {}", e),
            DeviceError::Transport(e) => write!(f, "Transport error: {}", e),
            DeviceError::Actuator(e) => write!(f, "Actuator error: {}", e),
            DeviceError::AlreadyStarted => write!(f, "Detector was already started"),
            DeviceError::ThreadSpawn { name, details } => {
                write!(f, "Failed to spawn {} thread: {}", name, details)
            }
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Config(e) => Some(e),
            DeviceError::Transport(e) => Some(e),
            DeviceError::Actuator(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for DeviceError {
    fn from(error: ConfigError) -> Self {
        DeviceError::Config(error)
    }
}

impl From<TransportError> for DeviceError {
    fn from(error: TransportError) -> Self {
        DeviceError::Transport(error)
    }
}

impl From<ActuatorError> for DeviceError {
    fn from(error: ActuatorError) -> Self {
        DeviceError::Actuator(error)
    }
}

/// Result type for device operations
pub type DeviceResult<T> = Result<T, DeviceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        let config: DeviceError = ConfigError::MissingParameter {
            parameter: "target.latitude".to_string(),
        }
        .into();
        assert_eq!(config.exit_code(), 2);

        let transport: DeviceError = TransportError::OpenFailed {
            port: "/dev/serial0".to_string(),
            details: "No such file or directory".to_string(),
        }
        .into();
        assert_eq!(transport.exit_code(), 1);
        assert!(transport.to_string().starts_with("Transport error: Failed to open"));
    }
}
