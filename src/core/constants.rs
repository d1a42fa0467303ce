//! Geodetic and timing constants shared across the crate

/// Mean Earth radius used by the great-circle distance (meters)
pub const EARTH_MEAN_RADIUS_M: f64 = 6_371_008.8;

/// WGS84 semi-major axis (meters)
pub const WGS84_SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;

/// WGS84 first eccentricity squared
pub const WGS84_ECCENTRICITY_SQUARED: f64 = 0.006_694_379_990_14;

/// UTM central scale factor
pub const UTM_SCALE_FACTOR: f64 = 0.9996;

/// UTM false easting (meters)
pub const UTM_FALSE_EASTING_M: f64 = 500_000.0;

/// UTM false northing applied south of the equator (meters)
pub const UTM_FALSE_NORTHING_SOUTH_M: f64 = 10_000_000.0;

/// Longest on- or off-time a single beep pattern may request (seconds)
pub const MAX_PATTERN_TIME_S: f64 = 3600.0;
