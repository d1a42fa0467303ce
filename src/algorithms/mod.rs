//! Proximity algorithms: coordinate conversion, distance, and cadence

pub mod coordinates;
pub mod distance;
pub mod cadence;

pub use coordinates::{to_decimal, ConversionError, ConversionResult, GridCoordinate, GridZone};
pub use distance::{DistanceCalculator, DistanceStrategy};
pub use cadence::{BeepTiming, Cadence, CadenceConfig, CadencePolicy, CadenceProfile, CadenceState, Zone};
