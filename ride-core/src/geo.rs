//! Geodesy: coordinate validation and great-circle distance
//!
//! One haversine implementation serves matching, fare quoting and UI
//! distance display, so the three contexts can never drift apart.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude, degrees, [-90, 90]
    pub lat: f64,
    /// Longitude, degrees, [-180, 180]
    pub lng: f64,
}

impl Coordinates {
    /// Create a validated coordinate pair
    pub fn new(lat: f64, lng: f64) -> crate::Result<Self> {
        let coords = Self { lat, lng };
        coords.validate()?;
        Ok(coords)
    }

    /// Reject non-finite or out-of-range values
    pub fn validate(&self) -> crate::Result<()> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(crate::Error::InvalidCoordinate(format!(
                "non-finite ({}, {})",
                self.lat, self.lng
            )));
        }
        if self.lat.abs() > 90.0 || self.lng.abs() > 180.0 {
            return Err(crate::Error::InvalidCoordinate(format!(
                "out of range ({}, {})",
                self.lat, self.lng
            )));
        }
        Ok(())
    }
}

/// Great-circle distance between two points in kilometers
///
/// `d = 2R·asin(√(sin²(Δlat/2) + cos(lat1)·cos(lat2)·sin²(Δlng/2)))`
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lng1) = (a.lat.to_radians(), a.lng.to_radians());
    let (lat2, lng2) = (b.lat.to_radians(), b.lng.to_radians());
    let dlat = lat2 - lat1;
    let dlng = lng2 - lng1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlng = (dlng * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        let p = Coordinates::new(12.9716, 77.5946).unwrap();
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn test_symmetry() {
        let a = Coordinates::new(12.9716, 77.5946).unwrap();
        let b = Coordinates::new(13.0358, 77.5970).unwrap();
        let d1 = haversine_km(a, b);
        let d2 = haversine_km(b, a);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn test_bangalore_trip_distance() {
        // MG Road area to Koramanagala-ish, roughly 4.6 km as the crow flies
        let pickup = Coordinates::new(12.9716, 77.5946).unwrap();
        let dropoff = Coordinates::new(12.9352, 77.6146).unwrap();
        let d = haversine_km(pickup, dropoff);
        assert!(d > 4.0 && d < 5.0, "unexpected distance {}", d);
    }

    #[test]
    fn test_validation_rejects_bad_input() {
        assert!(Coordinates::new(91.0, 0.0).is_err());
        assert!(Coordinates::new(0.0, 181.0).is_err());
        assert!(Coordinates::new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::new(0.0, f64::INFINITY).is_err());
        assert!(Coordinates::new(-90.0, 180.0).is_ok());
    }
}
