//! Corridor station index.
//!
//! Narrows the catalog down to the stations a vehicle could actually use on
//! a given base route: active, connector-compatible, and within a lateral
//! buffer of the route polyline.

use tracing::debug;

use crate::model::{compatible, ChargingStation, VehicleProfile};
use crate::polyline::Polyline;

/// A candidate station with its position relative to the base route.
#[derive(Debug, Clone, PartialEq)]
pub struct CorridorStation {
    pub station: ChargingStation,
    pub offset_km: f64,
    pub along_route_km: f64,
}

pub struct CorridorIndex<'a> {
    stations: &'a [ChargingStation],
}

impl<'a> CorridorIndex<'a> {
    pub fn new(stations: &'a [ChargingStation]) -> Self {
        Self { stations }
    }

    /// Stations usable by `vehicle` within `buffer_km` of `route`, ordered by
    /// distance along the route (ties by station id).
    ///
    /// An empty result is a normal outcome.
    pub fn candidate_stations(
        &self,
        route: &Polyline,
        vehicle: &VehicleProfile,
        buffer_km: f64,
    ) -> Vec<CorridorStation> {
        let vehicle_connectors = vehicle.connectors();
        let mut inactive = 0usize;
        let mut incompatible = 0usize;
        let mut outside = 0usize;

        let mut candidates: Vec<CorridorStation> = Vec::new();
        for station in self.stations {
            if !station.is_active() {
                inactive += 1;
                continue;
            }
            if !compatible(&vehicle_connectors, &station.connector_types()) {
                incompatible += 1;
                continue;
            }
            if !station.location.is_valid() {
                outside += 1;
                continue;
            }
            match route.project(station.location.as_tuple()) {
                Some(projection) if projection.offset_km <= buffer_km => {
                    candidates.push(CorridorStation {
                        station: station.clone(),
                        offset_km: projection.offset_km,
                        along_route_km: projection.along_km,
                    });
                }
                _ => outside += 1,
            }
        }

        candidates.sort_by(|a, b| {
            a.along_route_km
                .total_cmp(&b.along_route_km)
                .then_with(|| a.station.id.cmp(&b.station.id))
        });

        debug!(
            candidates = candidates.len(),
            inactive,
            incompatible,
            outside,
            buffer_km,
            route_km = route.length_km(),
            "corridor stations selected"
        );

        candidates
    }
}
