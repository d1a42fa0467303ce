//! Distance between the current fix and the target

use crate::algorithms::coordinates::{to_grid, GridCoordinate, GridZone};
use crate::core::{Distance, Location, TargetLocation, EARTH_MEAN_RADIUS_M};
use serde::{Deserialize, Serialize};

/// How distances are measured; one strategy serves both fix and target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceStrategy {
    /// Haversine distance on a spherical Earth
    #[default]
    GreatCircle,
    /// Euclidean distance on the target's UTM grid, whole meters
    PlanarGrid,
}

/// Great-circle (haversine) distance between two locations
pub fn great_circle_distance(a: &Location, b: &Location) -> Distance {
    let lat1 = a.latitude().to_radians();
    let lat2 = b.latitude().to_radians();
    let dlat = (b.latitude() - a.latitude()).to_radians();
    let dlon = (b.longitude() - a.longitude()).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let h = (sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon).clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    Distance::new(EARTH_MEAN_RADIUS_M * c).unwrap_or(Distance::ZERO)
}

/// Euclidean distance between two grid points, rounded to the nearest meter
pub fn planar_distance(a: &GridCoordinate, b: &GridCoordinate) -> Distance {
    let meters = (a.as_vector() - b.as_vector()).norm().round();
    Distance::new(meters).unwrap_or(Distance::ZERO)
}

/// Measures fixes against a fixed target with a single strategy
#[derive(Debug, Clone)]
pub struct DistanceCalculator {
    strategy: DistanceStrategy,
    target: TargetLocation,
    /// Target projected once, present for `PlanarGrid`
    target_grid: Option<GridCoordinate>,
}

impl DistanceCalculator {
    pub fn new(strategy: DistanceStrategy, target: TargetLocation) -> Self {
        let target_grid = match strategy {
            DistanceStrategy::GreatCircle => None,
            DistanceStrategy::PlanarGrid => {
                Some(to_grid(&target, GridZone::for_location(&target)))
            }
        };

        Self {
            strategy,
            target,
            target_grid,
        }
    }

    pub fn strategy(&self) -> DistanceStrategy {
        self.strategy
    }

    pub fn target(&self) -> &TargetLocation {
        &self.target
    }

    /// Distance from `location` to the target
    pub fn distance_to_target(&self, location: &Location) -> Distance {
        match &self.target_grid {
            None => great_circle_distance(location, &self.target),
            Some(target_grid) => {
                let fix_grid = to_grid(location, target_grid.zone);
                planar_distance(&fix_grid, target_grid)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(lat: f64, lon: f64) -> Location {
        Location::new(lat, lon).unwrap()
    }

    #[test]
    fn test_great_circle_identity_and_symmetry() {
        let a = loc(52.2053, 0.1218);
        let b = loc(48.8566, 2.3522);

        assert_eq!(great_circle_distance(&a, &a), Distance::ZERO);
        assert_eq!(great_circle_distance(&a, &b), great_circle_distance(&b, &a));
    }

    #[test]
    fn test_great_circle_known_distance() {
        // Cambridge to Paris, roughly 404 km
        let a = loc(52.2053, 0.1218);
        let b = loc(48.8566, 2.3522);
        let d = great_circle_distance(&a, &b).meters();
        assert!((d - 404_300.0).abs() < 2_000.0, "got {}", d);

        // One arc-minute of latitude is about one nautical mile
        let d = great_circle_distance(&loc(0.0, 0.0), &loc(1.0 / 60.0, 0.0)).meters();
        assert!((d - 1853.0).abs() < 5.0, "got {}", d);
    }

    #[test]
    fn test_planar_identity_and_symmetry() {
        let target = loc(37.7749, -122.4194);
        let calculator = DistanceCalculator::new(DistanceStrategy::PlanarGrid, target);

        assert_eq!(calculator.distance_to_target(&target), Distance::ZERO);

        let zone = GridZone::for_location(&target);
        let a = to_grid(&loc(37.7760, -122.4180), zone);
        let b = to_grid(&target, zone);
        assert_eq!(planar_distance(&a, &b), planar_distance(&b, &a));
    }

    #[test]
    fn test_planar_is_whole_meters_and_close_to_great_circle() {
        let target = loc(37.7749, -122.4194);
        let fix = loc(37.7755, -122.4190);
        let planar = DistanceCalculator::new(DistanceStrategy::PlanarGrid, target);
        let spherical = DistanceCalculator::new(DistanceStrategy::GreatCircle, target);

        let p = planar.distance_to_target(&fix).meters();
        let g = spherical.distance_to_target(&fix).meters();

        assert_eq!(p, p.round());
        assert!((p - g).abs() < 2.0, "planar {} vs great-circle {}", p, g);
    }

    #[test]
    fn test_fix_uses_target_zone() {
        // Target just east of a zone boundary, fix just west of it
        let target = loc(45.0, 6.0001);
        let fix = loc(45.0, 5.9995);
        let calculator = DistanceCalculator::new(DistanceStrategy::PlanarGrid, target);

        let d = calculator.distance_to_target(&fix).meters();
        let g = great_circle_distance(&fix, &target).meters();
        assert!((d - g).abs() < 2.0, "planar {} vs great-circle {}", d, g);
    }
}
