//! Planner data model.
//!
//! Everything here is created fresh per planning request and discarded once
//! the result is assembled. SOC values are fractions in `[0, 1]` internally;
//! percentages only exist at the wire boundary (see [`crate::api`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A decimal-degree coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `(lat, lng)` tuple, the form the geometry helpers work with.
    pub fn as_tuple(&self) -> (f64, f64) {
        (self.lat, self.lng)
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self { lat, lng }
    }
}

/// Physical connector standard shared by stations and vehicles.
///
/// Serialized as the lowercase catalog names; unknown names map to
/// [`ConnectorType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConnectorType {
    Type1,
    Type2,
    BharatAc001,
    BharatDc001,
    Ccs2,
    Chademo,
    GbtType6,
    Type7Leccs,
    Mcs,
    Chaoji,
    Other,
}

impl ConnectorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorType::Type1 => "type1",
            ConnectorType::Type2 => "type2",
            ConnectorType::BharatAc001 => "bharat_ac_001",
            ConnectorType::BharatDc001 => "bharat_dc_001",
            ConnectorType::Ccs2 => "ccs2",
            ConnectorType::Chademo => "chademo",
            ConnectorType::GbtType6 => "gbt_type6",
            ConnectorType::Type7Leccs => "type7_leccs",
            ConnectorType::Mcs => "mcs",
            ConnectorType::Chaoji => "chaoji",
            ConnectorType::Other => "other",
        }
    }

    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "type1" => ConnectorType::Type1,
            "type2" => ConnectorType::Type2,
            "bharat_ac_001" => ConnectorType::BharatAc001,
            "bharat_dc_001" => ConnectorType::BharatDc001,
            "ccs2" => ConnectorType::Ccs2,
            "chademo" => ConnectorType::Chademo,
            "gbt_type6" => ConnectorType::GbtType6,
            "type7_leccs" => ConnectorType::Type7Leccs,
            "mcs" => ConnectorType::Mcs,
            "chaoji" => ConnectorType::Chaoji,
            _ => ConnectorType::Other,
        }
    }
}

impl Serialize for ConnectorType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ConnectorType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ConnectorType::parse(&name))
    }
}

/// Pure connector compatibility predicate: true when at least one connector
/// appears on both sides.
pub fn compatible(vehicle_connectors: &[ConnectorType], station_connectors: &[ConnectorType]) -> bool {
    vehicle_connectors
        .iter()
        .any(|connector| station_connectors.contains(connector))
}

/// One charging inlet of a vehicle (AC or DC).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingPort {
    pub max_power_kw: f64,
    pub connectors: Vec<ConnectorType>,
}

/// Extra energy spent per metre climbed and the share recovered on descent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationCoefficients {
    pub climb_kwh_per_m: f64,
    pub regen_fraction: f64,
}

impl Default for ElevationCoefficients {
    fn default() -> Self {
        Self {
            climb_kwh_per_m: 0.002,
            regen_fraction: 0.6,
        }
    }
}

/// Immutable energy profile of the vehicle for the duration of one plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleProfile {
    pub usable_capacity_kwh: f64,
    pub consumption_kwh_per_km: f64,
    #[serde(default)]
    pub elevation: Option<ElevationCoefficients>,
    #[serde(default)]
    pub ac: Option<ChargingPort>,
    #[serde(default)]
    pub dc: Option<ChargingPort>,
}

impl VehicleProfile {
    pub fn ports(&self) -> impl Iterator<Item = &ChargingPort> {
        self.ac.iter().chain(self.dc.iter())
    }

    /// Every connector the vehicle accepts, deduplicated and sorted.
    pub fn connectors(&self) -> Vec<ConnectorType> {
        let mut connectors: Vec<ConnectorType> = self
            .ports()
            .flat_map(|port| port.connectors.iter().copied())
            .collect();
        connectors.sort();
        connectors.dedup();
        connectors
    }

    /// Maximum power the vehicle accepts through `connector`, if any port
    /// supports it.
    pub fn max_power_for(&self, connector: ConnectorType) -> Option<f64> {
        self.ports()
            .filter(|port| port.connectors.contains(&connector))
            .map(|port| port.max_power_kw)
            .fold(None, |best, power| match best {
                Some(current) if current >= power => Some(current),
                _ => Some(power),
            })
    }
}

/// A fully validated planning request.
#[derive(Debug, Clone, PartialEq)]
pub struct TripRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub vehicle: VehicleProfile,
    /// Fraction in `(0, 1]`.
    pub current_soc: f64,
    pub departure_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedClass {
    Urban,
    Mixed,
    Highway,
}

impl SpeedClass {
    pub fn from_average_kmh(speed_kmh: f64) -> Self {
        if speed_kmh < 50.0 {
            SpeedClass::Urban
        } else if speed_kmh < 85.0 {
            SpeedClass::Mixed
        } else {
            SpeedClass::Highway
        }
    }

    /// Multiplier applied to the flat consumption coefficient.
    pub fn consumption_factor(&self) -> f64 {
        match self {
            SpeedClass::Urban => 0.95,
            SpeedClass::Mixed => 1.0,
            SpeedClass::Highway => 1.10,
        }
    }
}

/// A drivable segment between two points, as reported by the directions
/// collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct RoadSegment {
    pub polyline: crate::polyline::Polyline,
    pub distance_km: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub duration_minutes: f64,
    pub speed_class: SpeedClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationConnector {
    #[serde(rename = "type")]
    pub connector: ConnectorType,
    pub max_power_kw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingStation {
    pub id: String,
    pub name: String,
    pub location: Coordinate,
    pub connectors: Vec<StationConnector>,
    pub status: StationStatus,
    /// Informational only; pricing does not influence planning.
    #[serde(default)]
    pub price_per_minute: Option<f64>,
}

impl ChargingStation {
    pub fn is_active(&self) -> bool {
        self.status == StationStatus::Active
    }

    pub fn connector_types(&self) -> Vec<ConnectorType> {
        self.connectors.iter().map(|c| c.connector).collect()
    }

    pub fn max_power_for(&self, connector: ConnectorType) -> Option<f64> {
        self.connectors
            .iter()
            .filter(|c| c.connector == connector)
            .map(|c| c.max_power_kw)
            .fold(None, |best, power| match best {
                Some(current) if current >= power => Some(current),
                _ => Some(power),
            })
    }
}

/// One charging stop of a finished plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargingStop {
    pub station_id: String,
    pub station_name: String,
    pub connector: ConnectorType,
    /// Index of the path leg that ends at this station.
    pub leg_index: usize,
    pub arrival_soc: f64,
    pub charge_to_soc: f64,
    pub charging_minutes: f64,
    pub energy_added_kwh: f64,
    /// Filled in by the result assembler.
    pub arrival_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlanOutcome {
    Planned,
    NoStationsAvailable,
    NoFeasibleRoute,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanResult {
    pub outcome: PlanOutcome,
    pub stops: Vec<ChargingStop>,
    pub total_distance_km: f64,
    pub total_time_minutes: f64,
    pub departure_time: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
    pub final_arrival_soc: f64,
}

impl PlanResult {
    pub fn is_planned(&self) -> bool {
        self.outcome == PlanOutcome::Planned
    }
}
