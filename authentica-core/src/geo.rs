//! Geographic primitives for scan locations.
//!
//! Scan events carry raw WGS84 coordinates; fraud aggregation groups them
//! into fixed-precision grid cells so that GPS jitter from independent scans
//! at the same point of sale lands in the same bucket.

use serde::{Deserialize, Serialize};

use crate::error::{AuthenticaError, Result};

/// Mean Earth radius in meters, used by the haversine distance.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Approximate meters per degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// A validated WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build a coordinate pair, rejecting out-of-range or non-finite values.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(AuthenticaError::Validation(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(AuthenticaError::Validation(format!(
                "longitude {longitude} outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Great-circle distance to another point, in meters (haversine).
    pub fn distance_m(&self, other: &Coordinates) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}

/// A fixed-precision grid cell identifying a small geographic area.
///
/// Coordinates are truncated to `precision` decimal places and held as
/// scaled integers, so cells hash and compare exactly. At the default
/// precision of 4 a cell spans roughly 11 meters of latitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeoCell {
    lat_scaled: i64,
    lon_scaled: i64,
    precision: u32,
}

impl GeoCell {
    /// The cell containing `point` at the given decimal precision.
    pub fn containing(point: &Coordinates, precision: u32) -> Self {
        let scale = 10f64.powi(precision as i32);
        Self {
            lat_scaled: (point.latitude * scale).trunc() as i64,
            lon_scaled: (point.longitude * scale).trunc() as i64,
            precision,
        }
    }

    /// Truncated latitude of the cell corner.
    pub fn latitude(&self) -> f64 {
        self.lat_scaled as f64 / 10f64.powi(self.precision as i32)
    }

    /// Truncated longitude of the cell corner.
    pub fn longitude(&self) -> f64 {
        self.lon_scaled as f64 / 10f64.powi(self.precision as i32)
    }

    /// Geohash of the cell corner, for map display.
    pub fn geohash(&self) -> String {
        geohash::encode(
            geohash::Coord {
                x: self.longitude(),
                y: self.latitude(),
            },
            8,
        )
        .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_validation() {
        assert!(Coordinates::new(48.8566, 2.3522).is_ok());
        assert!(Coordinates::new(90.0, 180.0).is_ok());
        assert!(Coordinates::new(-90.0, -180.0).is_ok());
        assert!(Coordinates::new(90.1, 0.0).is_err());
        assert!(Coordinates::new(0.0, -180.5).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_distance_zero_at_same_point() {
        let p = Coordinates::new(51.5074, -0.1278).unwrap();
        assert!(p.distance_m(&p) < 1e-6);
    }

    #[test]
    fn test_distance_known_pair() {
        // Paris to London is roughly 344 km.
        let paris = Coordinates::new(48.8566, 2.3522).unwrap();
        let london = Coordinates::new(51.5074, -0.1278).unwrap();
        let d = paris.distance_m(&london);
        assert!((330_000.0..360_000.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_cell_groups_jittered_points() {
        // Differ only in the 5th decimal place: same cell at precision 4.
        let a = Coordinates::new(10.12341, 20.56781).unwrap();
        let b = Coordinates::new(10.12349, 20.56789).unwrap();
        assert_eq!(GeoCell::containing(&a, 4), GeoCell::containing(&b, 4));
    }

    #[test]
    fn test_cell_separates_distant_points() {
        let a = Coordinates::new(10.0, 20.0).unwrap();
        let b = Coordinates::new(11.0, 20.0).unwrap();
        assert_ne!(GeoCell::containing(&a, 4), GeoCell::containing(&b, 4));
    }

    #[test]
    fn test_cell_corner_roundtrip() {
        let p = Coordinates::new(48.8566, 2.3522).unwrap();
        let cell = GeoCell::containing(&p, 4);
        assert!((cell.latitude() - 48.8566).abs() < 1e-9);
        assert!((cell.longitude() - 2.3522).abs() < 1e-9);
    }

    #[test]
    fn test_cell_geohash_nonempty() {
        let p = Coordinates::new(48.8566, 2.3522).unwrap();
        let cell = GeoCell::containing(&p, 4);
        assert_eq!(cell.geohash().len(), 8);
    }
}
