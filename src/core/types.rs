//! Core data types for the proximity beacon

use std::fmt;

/// Validated position in signed decimal degrees
///
/// Once built a `Location` never changes; a new fix produces a new value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Build a location, rejecting non-finite or out-of-range degrees
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, LocationError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(LocationError::LatitudeOutOfRange { value: latitude });
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(LocationError::LongitudeOutOfRange { value: longitude });
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// The fixed coordinate the device guides towards
pub type TargetLocation = Location;

/// Reasons a coordinate pair cannot form a `Location`
#[derive(Debug, Clone, PartialEq)]
pub enum LocationError {
    LatitudeOutOfRange { value: f64 },
    LongitudeOutOfRange { value: f64 },
}

impl fmt::Display for LocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocationError::LatitudeOutOfRange { value } => {
                write!(f, "Latitude {} outside [-90, 90]", value)
            }
            LocationError::LongitudeOutOfRange { value } => {
                write!(f, "Longitude {} outside [-180, 180]", value)
            }
        }
    }
}

impl std::error::Error for LocationError {}

/// Non-negative distance in meters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    pub const ZERO: Distance = Distance(0.0);

    /// Wrap a metre value; negative or NaN inputs yield `None`
    pub fn new(meters: f64) -> Option<Self> {
        if meters.is_nan() || meters < 0.0 {
            None
        } else {
            Some(Self(meters))
        }
    }

    pub fn meters(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m", self.0)
    }
}
