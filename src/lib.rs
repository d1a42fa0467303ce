//! Treasure Seeker
//!
//! A GPS proximity buzzer: reads NMEA fixes from a serial receiver, measures
//! the distance to a fixed target and beeps faster the closer it gets.

pub mod core;
pub mod algorithms;
pub mod processing;
pub mod utils;
pub mod hardware;
pub mod device;

// Re-export commonly used types
pub use crate::core::{Distance, Location, LocationError, TargetLocation};
pub use algorithms::{
    to_decimal, BeepTiming, Cadence, CadenceConfig, CadencePolicy, CadenceProfile, CadenceState,
    ConversionError, DistanceCalculator, DistanceStrategy, Zone,
};
pub use processing::{FixQuality, ParseError, ParsedFix, SentenceParser};
pub use hardware::{
    ActuatorError, BuzzerActuator, GpioBuzzer, RawLine, SerialTransport, Transport, TransportError,
};
pub use device::{DeviceError, DeviceResult, ProximityDetector, ProximitySnapshot, StopHandle};
pub use utils::{ConfigError, DeviceConfig};
