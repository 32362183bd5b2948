//! Polyline representation for route geometries.
//!
//! This module provides a type for working with polylines as decoded
//! coordinate sequences. Decoding happens at the boundary (when receiving
//! from OSRM); the corridor index only ever sees decoded points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::haversine::{haversine_km, EARTH_RADIUS_KM};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    #[error("encoded polyline ends in the middle of a value at byte {0}")]
    Truncated(usize),
    #[error("invalid polyline character {0:?} at byte {1}")]
    InvalidCharacter(char, usize),
    #[error("encoded polyline value overflows at byte {0}")]
    Overflow(usize),
}

/// A polyline representing a route geometry as decoded coordinates.
///
/// Stores latitude/longitude points directly for internal processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

/// Where a point falls relative to a polyline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Perpendicular (cross-track) distance to the closest segment.
    pub offset_km: f64,
    /// Distance from the start of the polyline to the foot of the
    /// perpendicular.
    pub along_km: f64,
}

impl Polyline {
    /// Creates a new Polyline from decoded coordinate points.
    ///
    /// Each point is a (latitude, longitude) tuple.
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    /// Decodes the Google encoded polyline format.
    ///
    /// OSRM uses precision 5 for `geometries=polyline` and 6 for
    /// `geometries=polyline6`.
    pub fn decode(encoded: &str, precision: u32) -> Result<Self, PolylineError> {
        let factor = 10f64.powi(precision as i32);
        let bytes = encoded.as_bytes();
        let mut points = Vec::new();
        let mut index = 0;
        let mut lat: i64 = 0;
        let mut lng: i64 = 0;

        while index < bytes.len() {
            lat = lat
                .checked_add(decode_value(bytes, &mut index)?)
                .ok_or(PolylineError::Overflow(index))?;
            lng = lng
                .checked_add(decode_value(bytes, &mut index)?)
                .ok_or(PolylineError::Overflow(index))?;
            points.push((lat as f64 / factor, lng as f64 / factor));
        }

        Ok(Self { points })
    }

    /// Returns a reference to the coordinate points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Great-circle length of the polyline.
    pub fn length_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| haversine_km(pair[0], pair[1]))
            .sum()
    }

    /// Projects `point` onto the closest segment of the polyline.
    ///
    /// Each segment is flattened with an equirectangular projection centred
    /// on the point, which is accurate to well under a percent at corridor
    /// scales. Returns `None` for an empty polyline.
    pub fn project(&self, point: (f64, f64)) -> Option<Projection> {
        match self.points.len() {
            0 => None,
            1 => Some(Projection {
                offset_km: haversine_km(self.points[0], point),
                along_km: 0.0,
            }),
            _ => {
                let mut best: Option<Projection> = None;
                let mut walked_km = 0.0;

                for pair in self.points.windows(2) {
                    let (start, end) = (pair[0], pair[1]);
                    let (ax, ay) = to_local_km(start, point);
                    let (bx, by) = to_local_km(end, point);
                    let (dx, dy) = (bx - ax, by - ay);
                    let length_sq = dx * dx + dy * dy;

                    // Point sits at the local origin.
                    let t = if length_sq > 0.0 {
                        (-(ax * dx + ay * dy) / length_sq).clamp(0.0, 1.0)
                    } else {
                        0.0
                    };
                    let (fx, fy) = (ax + t * dx, ay + t * dy);
                    let offset_km = (fx * fx + fy * fy).sqrt();
                    let segment_km = haversine_km(start, end);

                    if best.is_none_or(|current| offset_km < current.offset_km) {
                        best = Some(Projection {
                            offset_km,
                            along_km: walked_km + t * segment_km,
                        });
                    }
                    walked_km += segment_km;
                }

                best
            }
        }
    }
}

fn decode_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Truncated(*index));
        };
        if !(63..=126).contains(&byte) {
            return Err(PolylineError::InvalidCharacter(byte as char, *index));
        }
        // 12 chunks carry 60 bits; a 13th would shift past an i64.
        if shift >= 60 {
            return Err(PolylineError::Overflow(*index));
        }
        *index += 1;

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

/// Flat x/y kilometres of `point` relative to `origin`.
fn to_local_km(point: (f64, f64), origin: (f64, f64)) -> (f64, f64) {
    let x = (point.1 - origin.1).to_radians() * origin.0.to_radians().cos() * EARTH_RADIUS_KM;
    let y = (point.0 - origin.0).to_radians() * EARTH_RADIUS_KM;
    (x, y)
}
