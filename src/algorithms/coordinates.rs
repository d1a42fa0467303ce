//! Coordinate conversion
//!
//! Turns NMEA coordinate fields plus a hemisphere letter into signed decimal
//! degrees, and projects decimal degrees onto a UTM grid for planar distance.

use crate::core::{
    Location, UTM_FALSE_EASTING_M, UTM_FALSE_NORTHING_SOUTH_M, UTM_SCALE_FACTOR,
    WGS84_ECCENTRICITY_SQUARED, WGS84_SEMI_MAJOR_AXIS_M,
};
use nalgebra::Vector2;
use std::fmt;

/// Errors raised while converting a coordinate field
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// Field is empty, not numeric, or carries minutes >= 60
    InvalidCoordinate { value: String },
    /// Hemisphere letter outside N/S/E/W, or wrong for the axis
    InvalidHemisphere { letter: char },
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionError::InvalidCoordinate { value } => {
                write!(f, "Invalid coordinate value '{}'", value)
            }
            ConversionError::InvalidHemisphere { letter } => {
                write!(f, "Invalid hemisphere letter '{}'", letter)
            }
        }
    }
}

impl std::error::Error for ConversionError {}

pub type ConversionResult<T> = Result<T, ConversionError>;

/// Convert a raw NMEA coordinate field into signed decimal degrees.
///
/// The field is `ddmm.mmmm` (latitude) or `dddmm.mmmm` (longitude). The
/// magnitude is the absolute decoded degree value; the sign is negative for
/// `S` and `W`, positive for `N` and `E`.
pub fn to_decimal(raw_value: &str, hemisphere: char) -> ConversionResult<f64> {
    let sign = match hemisphere {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        letter => return Err(ConversionError::InvalidHemisphere { letter }),
    };

    let invalid = || ConversionError::InvalidCoordinate {
        value: raw_value.to_string(),
    };

    let parsed: f64 = raw_value.trim().parse().map_err(|_| invalid())?;
    if !parsed.is_finite() {
        return Err(invalid());
    }

    let magnitude = parsed.abs();
    let degrees = (magnitude / 100.0).trunc();
    let minutes = magnitude - degrees * 100.0;
    if minutes >= 60.0 {
        return Err(invalid());
    }

    Ok(sign * (degrees + minutes / 60.0))
}

/// Latitude variant of [`to_decimal`]; only `N` or `S` are accepted
pub fn latitude_to_decimal(raw_value: &str, hemisphere: char) -> ConversionResult<f64> {
    match hemisphere {
        'N' | 'S' => to_decimal(raw_value, hemisphere),
        letter => Err(ConversionError::InvalidHemisphere { letter }),
    }
}

/// Longitude variant of [`to_decimal`]; only `E` or `W` are accepted
pub fn longitude_to_decimal(raw_value: &str, hemisphere: char) -> ConversionResult<f64> {
    match hemisphere {
        'E' | 'W' => to_decimal(raw_value, hemisphere),
        letter => Err(ConversionError::InvalidHemisphere { letter }),
    }
}

/// UTM zone a grid projection is computed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridZone {
    pub number: u8,
    pub north: bool,
}

impl GridZone {
    /// Zone containing the given location
    pub fn for_location(location: &Location) -> Self {
        Self {
            number: utm_zone(location.longitude()),
            north: location.latitude() >= 0.0,
        }
    }

    fn central_meridian_rad(&self) -> f64 {
        (self.number as f64 * 6.0 - 183.0).to_radians()
    }
}

/// Planar grid position (meters) within one UTM zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCoordinate {
    pub zone: GridZone,
    pub easting: f64,
    pub northing: f64,
}

impl GridCoordinate {
    pub fn as_vector(&self) -> Vector2<f64> {
        Vector2::new(self.easting, self.northing)
    }
}

/// UTM zone number for a longitude
pub fn utm_zone(longitude: f64) -> u8 {
    let zone = ((longitude + 180.0) / 6.0).floor() as i32 + 1;
    zone.clamp(1, 60) as u8
}

/// Project a location onto the UTM grid of `zone`.
///
/// Both the fix and the target must be projected into the same zone so the
/// Euclidean distance between them is meaningful.
pub fn to_grid(location: &Location, zone: GridZone) -> GridCoordinate {
    let e2 = WGS84_ECCENTRICITY_SQUARED;
    let e4 = e2 * e2;
    let e6 = e4 * e2;
    let ep2 = e2 / (1.0 - e2);
    let a = WGS84_SEMI_MAJOR_AXIS_M;
    let k0 = UTM_SCALE_FACTOR;

    let lat = location.latitude().to_radians();
    let lon = location.longitude().to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();

    let n = a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    let t = lat.tan().powi(2);
    let c = ep2 * cos_lat * cos_lat;
    let big_a = cos_lat * (lon - zone.central_meridian_rad());

    let m = a
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * lat).sin());

    let easting = UTM_FALSE_EASTING_M
        + k0 * n
            * (big_a
                + (1.0 - t + c) * big_a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * big_a.powi(5) / 120.0);

    let false_northing = if zone.north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH_M };
    let northing = false_northing
        + k0 * (m
            + n * lat.tan()
                * (big_a.powi(2) / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * big_a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * big_a.powi(6)
                        / 720.0));

    GridCoordinate {
        zone,
        easting,
        northing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_decimal_hemisphere_sign() {
        let north = to_decimal("4807.038", 'N').unwrap();
        let south = to_decimal("4807.038", 'S').unwrap();
        let east = to_decimal("01131.000", 'E').unwrap();
        let west = to_decimal("01131.000", 'W').unwrap();

        assert!((north - 48.1173).abs() < 1e-9);
        assert!((south + 48.1173).abs() < 1e-9);
        assert!((east - 11.516_666_666).abs() < 1e-6);
        assert!((west + 11.516_666_666).abs() < 1e-6);
    }

    #[test]
    fn test_to_decimal_uses_absolute_value() {
        // A stray sign in the field never overrides the hemisphere
        let value = to_decimal("-4807.038", 'N').unwrap();
        assert!(value > 0.0);
        assert!((value - to_decimal("4807.038", 'N').unwrap()).abs() < 1e-12);

        let value = to_decimal("-4807.038", 'S').unwrap();
        assert!(value < 0.0);
    }

    #[test]
    fn test_to_decimal_sign_property() {
        for raw in ["0000.000", "0130.5", "4807.038", "8959.999", "17959.9"] {
            let magnitude = to_decimal(raw, 'N').unwrap();
            assert!(magnitude >= 0.0);
            assert_eq!(to_decimal(raw, 'E').unwrap(), magnitude);
            assert_eq!(to_decimal(raw, 'S').unwrap(), -magnitude);
            assert_eq!(to_decimal(raw, 'W').unwrap(), -magnitude);
        }
    }

    #[test]
    fn test_to_decimal_rejects_garbage() {
        assert!(matches!(
            to_decimal("48O7.038", 'N'),
            Err(ConversionError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            to_decimal("", 'N'),
            Err(ConversionError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            to_decimal("NaN", 'N'),
            Err(ConversionError::InvalidCoordinate { .. })
        ));
        assert!(matches!(
            to_decimal("4875.000", 'N'),
            Err(ConversionError::InvalidCoordinate { .. })
        ));
        assert_eq!(
            to_decimal("4807.038", 'X'),
            Err(ConversionError::InvalidHemisphere { letter: 'X' })
        );
    }

    #[test]
    fn test_axis_specific_hemispheres() {
        assert!(latitude_to_decimal("4807.038", 'N').is_ok());
        assert!(latitude_to_decimal("4807.038", 'E').is_err());
        assert!(longitude_to_decimal("01131.000", 'W').is_ok());
        assert!(longitude_to_decimal("01131.000", 'S').is_err());
    }

    #[test]
    fn test_utm_zone_calculation() {
        assert_eq!(utm_zone(-122.4194), 10);
        assert_eq!(utm_zone(0.0), 31);
        assert_eq!(utm_zone(139.6917), 54);
        assert_eq!(utm_zone(180.0), 60);
        assert_eq!(utm_zone(-180.0), 1);
    }

    #[test]
    fn test_grid_on_central_meridian() {
        let location = Location::new(0.0, 3.0).unwrap();
        let grid = to_grid(&location, GridZone::for_location(&location));

        assert_eq!(grid.zone.number, 31);
        assert!((grid.easting - 500_000.0).abs() < 1e-6);
        assert!(grid.northing.abs() < 1e-6);
    }

    #[test]
    fn test_grid_southern_false_northing() {
        let location = Location::new(-33.8688, 151.2093).unwrap();
        let grid = to_grid(&location, GridZone::for_location(&location));

        assert!(!grid.zone.north);
        assert!(grid.northing > 6_000_000.0 && grid.northing < 10_000_000.0);
    }
}
