//! Test fixtures for ev-route-planner.
//!
//! Provides:
//! - A deterministic "grid road" directions mock (100 km per degree,
//!   Manhattan distance, constant speed) so scenarios have exact numbers
//! - Builders for vehicles, stations and trips
//! - Real Kerala locations for haversine-based end-to-end runs

#![allow(dead_code)]

pub mod kerala_locations;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use tokio_util::sync::CancellationToken;

use ev_route_planner::error::DirectionsError;
use ev_route_planner::model::{
    ChargingPort, ChargingStation, ConnectorType, Coordinate, RoadSegment, SpeedClass, StationConnector,
    StationStatus, TripRequest, VehicleProfile,
};
use ev_route_planner::polyline::Polyline;
use ev_route_planner::traits::DirectionsProvider;

pub const KM_PER_DEGREE: f64 = 100.0;

/// A point `km` east of the grid origin on the equator.
pub fn at_km(km: f64) -> Coordinate {
    Coordinate::new(0.0, km / KM_PER_DEGREE)
}

pub fn departure() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()
}

// ============================================================================
// Directions mocks
// ============================================================================

/// Flat road network where the distance between two points is their
/// Manhattan distance at 100 km per degree.
pub struct GridRoad {
    pub speed_kmh: f64,
    calls: AtomicUsize,
    failing_into: Mutex<Vec<Coordinate>>,
    cancel_on_call: Option<CancellationToken>,
}

impl GridRoad {
    /// 75 km/h keeps every segment in the `mixed` speed class.
    pub fn new() -> Self {
        Self {
            speed_kmh: 75.0,
            calls: AtomicUsize::new(0),
            failing_into: Mutex::new(Vec::new()),
            cancel_on_call: None,
        }
    }

    /// Every lookup ending at `to` times out.
    pub fn failing_into(self, to: Coordinate) -> Self {
        self.failing_into.lock().unwrap().push(to);
        self
    }

    /// Cancels `token` as soon as the first lookup is made.
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_call = Some(token);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn distance_km(from: Coordinate, to: Coordinate) -> f64 {
        ((to.lat - from.lat).abs() + (to.lng - from.lng).abs()) * KM_PER_DEGREE
    }
}

impl DirectionsProvider for GridRoad {
    fn segment(&self, from: Coordinate, to: Coordinate) -> Result<RoadSegment, DirectionsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        if self.failing_into.lock().unwrap().contains(&to) {
            return Err(DirectionsError::Timeout);
        }

        let distance_km = Self::distance_km(from, to);
        Ok(RoadSegment {
            polyline: Polyline::new(vec![from.as_tuple(), to.as_tuple()]),
            distance_km,
            elevation_gain_m: 0.0,
            elevation_loss_m: 0.0,
            duration_minutes: distance_km / self.speed_kmh * 60.0,
            speed_class: SpeedClass::Mixed,
        })
    }
}

/// Directions service that never answers.
pub struct Unreachable;

impl DirectionsProvider for Unreachable {
    fn segment(&self, _from: Coordinate, _to: Coordinate) -> Result<RoadSegment, DirectionsError> {
        Err(DirectionsError::Timeout)
    }
}

// ============================================================================
// Vehicles and stations
// ============================================================================

/// 40 kWh usable, 0.18 kWh/km, CCS2 at 50 kW and Type 2 at 7.2 kW.
pub fn compact_ev() -> VehicleProfile {
    VehicleProfile {
        usable_capacity_kwh: 40.0,
        consumption_kwh_per_km: 0.18,
        elevation: None,
        ac: Some(ChargingPort {
            max_power_kw: 7.2,
            connectors: vec![ConnectorType::Type2],
        }),
        dc: Some(ChargingPort {
            max_power_kw: 50.0,
            connectors: vec![ConnectorType::Ccs2],
        }),
    }
}

/// Builder for test stations with sensible defaults.
#[derive(Clone, Debug)]
pub struct TestStation {
    id: String,
    location: Coordinate,
    connectors: Vec<StationConnector>,
    status: StationStatus,
}

impl TestStation {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            location: Coordinate::new(0.0, 0.0),
            connectors: Vec::new(),
            status: StationStatus::Active,
        }
    }

    pub fn at(mut self, location: Coordinate) -> Self {
        self.location = location;
        self
    }

    pub fn connector(mut self, connector: ConnectorType, max_power_kw: f64) -> Self {
        self.connectors.push(StationConnector {
            connector,
            max_power_kw,
        });
        self
    }

    pub fn ccs2(self, max_power_kw: f64) -> Self {
        self.connector(ConnectorType::Ccs2, max_power_kw)
    }

    pub fn status(mut self, status: StationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn build(self) -> ChargingStation {
        ChargingStation {
            name: format!("{} Charging Hub", self.id),
            id: self.id,
            location: self.location,
            connectors: self.connectors,
            status: self.status,
            price_per_minute: Some(15.0),
        }
    }
}

pub fn trip(origin: Coordinate, destination: Coordinate, current_soc: f64) -> TripRequest {
    TripRequest {
        origin,
        destination,
        vehicle: compact_ev(),
        current_soc,
        departure_time: departure(),
    }
}
