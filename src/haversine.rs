//! Haversine directions provider (fallback when OSRM unavailable).
//!
//! Uses great-circle distance to estimate road distance and travel time.
//! Less accurate than OSRM (ignores roads and elevation) but always available.

use crate::error::DirectionsError;
use crate::model::{Coordinate, RoadSegment, SpeedClass};
use crate::polyline::Polyline;
use crate::traits::DirectionsProvider;

/// Average driving speed assumption for time estimation.
const DEFAULT_SPEED_KMH: f64 = 60.0;

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Calculate haversine distance between two `(lat, lng)` points in kilometers.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Haversine-based directions provider.
///
/// Estimates road distance as the straight-line distance scaled by a detour
/// factor, and travel time from an assumed speed.
#[derive(Debug, Clone)]
pub struct HaversineDirections {
    /// Assumed average driving speed in km/h.
    pub speed_kmh: f64,
    /// Road distance / straight-line distance.
    pub detour_factor: f64,
}

impl Default for HaversineDirections {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
            detour_factor: 1.0,
        }
    }
}

impl HaversineDirections {
    pub fn new(speed_kmh: f64, detour_factor: f64) -> Self {
        Self {
            speed_kmh,
            detour_factor,
        }
    }

    /// Convert distance in km to travel time in minutes.
    fn km_to_minutes(&self, km: f64) -> f64 {
        km / self.speed_kmh * 60.0
    }
}

impl DirectionsProvider for HaversineDirections {
    fn segment(&self, from: Coordinate, to: Coordinate) -> Result<RoadSegment, DirectionsError> {
        let distance_km = haversine_km(from.as_tuple(), to.as_tuple()) * self.detour_factor;
        Ok(RoadSegment {
            polyline: Polyline::new(vec![from.as_tuple(), to.as_tuple()]),
            distance_km,
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            duration_minutes: self.km_to_minutes(distance_km),
            speed_class: SpeedClass::from_average_kmh(self.speed_kmh),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point() {
        let dist = haversine_km((36.1, -115.1), (36.1, -115.1));
        assert!(dist < 0.001, "Same point should have ~0 distance");
    }

    #[test]
    fn test_haversine_known_distance() {
        // Kochi (9.93, 76.26) to Thiruvananthapuram (8.52, 76.94)
        // Straight-line distance ~174 km
        let dist = haversine_km((9.93, 76.26), (8.52, 76.94));
        assert!(dist > 165.0 && dist < 185.0, "Kochi to Trivandrum should be ~174km, got {}", dist);
    }

    #[test]
    fn test_haversine_symmetric() {
        let a = (9.93, 76.26);
        let b = (10.52, 76.21);
        assert_eq!(haversine_km(a, b), haversine_km(b, a));
    }

    #[test]
    fn test_segment_uses_speed_and_detour() {
        let provider = HaversineDirections::new(60.0, 1.25);
        let segment = provider
            .segment(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0))
            .unwrap();
        // 111.19 km straight line, 139 km with detour, 139 minutes at 60 km/h.
        assert!((segment.distance_km - 138.99).abs() < 0.05, "got {}", segment.distance_km);
        assert!((segment.duration_minutes - segment.distance_km).abs() < 1e-9);
        assert_eq!(segment.speed_class, SpeedClass::Mixed);
        assert_eq!(segment.polyline.points().len(), 2);
    }

    #[test]
    fn test_reasonable_travel_time() {
        let provider = HaversineDirections::new(40.0, 1.0);
        // 10 km at 40 km/h = 15 minutes
        assert!((provider.km_to_minutes(10.0) - 15.0).abs() < 1e-9);
    }
}
