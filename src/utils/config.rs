use crate::algorithms::{CadenceConfig, DistanceStrategy};
use crate::core::{Location, TargetLocation};
use crate::device::{AcquisitionConfig, FeedbackConfig};
use crate::hardware::buzzer::check_timing;
use crate::hardware::{BuzzerConfig, StartupBeep, TransportConfig, TransportError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Device-wide configuration, read once at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Coordinate the device guides towards
    pub target: TargetConfig,
    /// GPS serial link
    pub transport: TransportConfig,
    /// Buzzer wiring
    pub buzzer: BuzzerConfig,
    /// Sentence filtering in the acquisition loop
    pub acquisition: AcquisitionConfig,
    /// Distance-to-cadence mapping
    pub cadence: CadenceConfig,
    /// Feedback loop pacing and fix watchdog
    pub feedback: FeedbackConfig,
    /// Readiness pattern sounded once before the loops start
    pub startup_beep: StartupBeep,
    /// How distance to the target is measured
    pub distance: DistanceConfig,
}

/// Target coordinate in decimal degrees
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Latitude in decimal degrees
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees
    pub longitude: Option<f64>,
}

/// Distance strategy selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    pub strategy: DistanceStrategy,
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Invalid parameter value
    InvalidParameter { parameter: String, value: String, reason: String },
    /// Missing required parameter
    MissingParameter { parameter: String },
    /// Configuration file I/O error
    IoError { message: String },
    /// JSON serialization/deserialization error
    SerializationError { message: String },
}

impl DeviceConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load_from_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration file without validating it
    ///
    /// Missing sections and fields take their defaults, so the target can
    /// still be supplied afterwards with [`DeviceConfig::with_target`].
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::IoError {
                message: format!("Failed to read config file '{}': {}", path_str, e),
            })?;

        serde_json::from_str(&content)
            .map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to parse config file '{}': {}", path_str, e),
            })
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationError {
                message: format!("Failed to serialize config: {}", e),
            })?;

        fs::write(&path, content)
            .map_err(|e| ConfigError::IoError {
                message: format!("Failed to write config file '{}': {}", path_str, e),
            })
    }

    /// Replace the target with a validated coordinate
    pub fn with_target(mut self, latitude: f64, longitude: f64) -> Result<Self, ConfigError> {
        let location = Location::new(latitude, longitude).map_err(|e| {
            ConfigError::InvalidParameter {
                parameter: "target".to_string(),
                value: format!("{}, {}", latitude, longitude),
                reason: e.to_string(),
            }
        })?;

        self.target = TargetConfig {
            latitude: Some(location.latitude()),
            longitude: Some(location.longitude()),
        };
        Ok(self)
    }

    /// The configured target as a validated location
    pub fn target_location(&self) -> Result<TargetLocation, ConfigError> {
        let latitude = self.target.latitude.ok_or_else(|| ConfigError::MissingParameter {
            parameter: "target.latitude".to_string(),
        })?;
        let longitude = self.target.longitude.ok_or_else(|| ConfigError::MissingParameter {
            parameter: "target.longitude".to_string(),
        })?;

        Location::new(latitude, longitude).map_err(|e| ConfigError::InvalidParameter {
            parameter: "target".to_string(),
            value: format!("{}, {}", latitude, longitude),
            reason: e.to_string(),
        })
    }

    /// Check every section, returning the first violation
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target_location()?;
        self.transport.validate()?;
        self.acquisition.validate()?;
        self.cadence.validate()?;
        self.feedback.validate()?;

        let startup = &self.startup_beep;
        check_timing(startup.on_time_s, startup.off_time_s).map_err(|e| {
            ConfigError::InvalidParameter {
                parameter: "startup_beep".to_string(),
                value: format!("{}/{}", startup.on_time_s, startup.off_time_s),
                reason: e.to_string(),
            }
        })?;

        Ok(())
    }
}

impl From<TransportError> for ConfigError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::ConfigurationError { parameter, value } => {
                ConfigError::InvalidParameter {
                    parameter: format!("transport.{}", parameter),
                    value,
                    reason: "out of range".to_string(),
                }
            }
            other => ConfigError::InvalidParameter {
                parameter: "transport".to_string(),
                value: String::new(),
                reason: other.to_string(),
            },
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidParameter { parameter, value, reason } => {
                write!(f, "Invalid parameter '{}' = '{}': {}", parameter, value, reason)
            }
            ConfigError::MissingParameter { parameter } => {
                write!(f, "Missing required parameter: {}", parameter)
            }
            ConfigError::IoError { message } => {
                write!(f, "I/O error: {}", message)
            }
            ConfigError::SerializationError { message } => {
                write!(f, "Serialization error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
