//! Real Kerala locations along the NH66 / NH544 corridor.
//!
//! Coordinates are city centres, rounded to four decimals.

/// A named location with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }
}

// ============================================================================
// Trip endpoints
// ============================================================================

pub const THIRUVANANTHAPURAM: Location = Location::new("Thiruvananthapuram", 8.5241, 76.9366);
pub const KOZHIKODE: Location = Location::new("Kozhikode", 11.2588, 75.7804);
pub const KOCHI: Location = Location::new("Kochi", 9.9312, 76.2673);
pub const ERNAKULAM_JUNCTION: Location = Location::new("Ernakulam Junction", 9.9696, 76.2907);

// ============================================================================
// Charging hubs along the coast
// ============================================================================

pub const CHARGING_HUBS: &[Location] = &[
    Location::new("Kollam", 8.8932, 76.6141),
    Location::new("Alappuzha", 9.4981, 76.3388),
    Location::new("Edappally", 10.0261, 76.3083),
    Location::new("Thrissur", 10.5276, 76.2144),
    Location::new("Ponnani", 10.7677, 75.9259),
];

/// Well inland; far outside any coastal corridor.
pub const MUNNAR: Location = Location::new("Munnar", 10.0889, 77.0595);
