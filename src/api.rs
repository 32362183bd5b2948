//! Wire contract of `POST /route-planner`.
//!
//! Requests arrive in the frontend's shape: SOC as a percentage, optional
//! DMS coordinate strings, vehicle ports with `supported` flags. This module
//! normalizes them into a validated [`TripRequest`] and turns a
//! [`PlanResult`] back into the response payload.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{
    ChargingPort, ChargingStop, ConnectorType, Coordinate, ElevationCoefficients, PlanOutcome, PlanResult,
    TripRequest, VehicleProfile,
};
use crate::planner::validate_trip;

/// Consumption assumed when the vehicle reports neither efficiency nor range.
pub const DEFAULT_CONSUMPTION_KWH_PER_KM: f64 = 0.15;

static DMS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)([0-9]{1,3})°\s*([0-9]{1,2})'\s*([0-9]{1,2}(?:\.[0-9]+)?)"?\s*([NS])\s+([0-9]{1,3})°\s*([0-9]{1,2})'\s*([0-9]{1,2}(?:\.[0-9]+)?)"?\s*([EW])"#,
    )
    .expect("DMS pattern is valid")
});

/// Parses a degrees-minutes-seconds pair such as `9°32'41.5"N 76°49'02.8"E`.
pub fn parse_dms(input: &str) -> Option<Coordinate> {
    let cleaned = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let caps = DMS_PATTERN.captures(&cleaned)?;

    let component = |deg: usize, min: usize, sec: usize, hemisphere: usize| -> Option<f64> {
        let degrees: f64 = caps.get(deg)?.as_str().parse().ok()?;
        let minutes: f64 = caps.get(min)?.as_str().parse().ok()?;
        let seconds: f64 = caps.get(sec)?.as_str().parse().ok()?;
        let value = degrees + minutes / 60.0 + seconds / 3600.0;
        match caps.get(hemisphere)?.as_str().to_ascii_uppercase().as_str() {
            "S" | "W" => Some(-value),
            _ => Some(value),
        }
    };

    Some(Coordinate::new(component(1, 2, 3, 4)?, component(5, 6, 7, 8)?))
}

/// Parses `departureTime`: RFC 3339, or the frontend's zone-less
/// `YYYY-MM-DDTHH:MM[:SS]` read as UTC. Missing or blank means `now`.
pub fn parse_departure_time(raw: Option<&str>, now: DateTime<Utc>) -> Result<DateTime<Utc>, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(now);
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::DepartureTime(raw.to_string()))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireLocation {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    #[serde(default)]
    pub dms: Option<String>,
}

impl WireLocation {
    /// Decimal coordinates win over the DMS string when both are present.
    fn resolve(&self, field: &'static str) -> Result<Coordinate, ValidationError> {
        let coordinate = match (self.lat, self.lng, self.dms.as_deref()) {
            (Some(lat), Some(lng), _) => Coordinate::new(lat, lng),
            (_, _, Some(dms)) => parse_dms(dms).ok_or_else(|| ValidationError::Coordinate {
                field,
                reason: format!("cannot parse DMS string {:?}", dms),
            })?,
            _ => {
                return Err(ValidationError::Coordinate {
                    field,
                    reason: "lat and lng are required".to_string(),
                });
            }
        };
        if !coordinate.is_valid() {
            return Err(ValidationError::Coordinate {
                field,
                reason: format!("({}, {}) is out of range", coordinate.lat, coordinate.lng),
            });
        }
        Ok(coordinate)
    }
}

fn default_supported() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePort {
    #[serde(default = "default_supported")]
    pub supported: bool,
    #[serde(default)]
    pub max_power: Option<f64>,
    #[serde(default)]
    pub connector_types: Vec<ConnectorType>,
}

impl WirePort {
    /// Unsupported ports and ports without a power rating are dropped.
    fn into_port(self, field: &'static str) -> Result<Option<ChargingPort>, ValidationError> {
        if !self.supported {
            return Ok(None);
        }
        let Some(max_power_kw) = self.max_power else {
            return Ok(None);
        };
        if !(max_power_kw.is_finite() && max_power_kw > 0.0) {
            return Err(ValidationError::PortPower {
                port: field,
                power: max_power_kw,
            });
        }
        if self.connector_types.is_empty() {
            return Ok(None);
        }
        Ok(Some(ChargingPort {
            max_power_kw,
            connectors: self.connector_types,
        }))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireVehicle {
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<u32>,
    pub battery_capacity: f64,
    #[serde(default)]
    pub preferred_charging_type: Option<String>,
    #[serde(default, rename = "chargingAC")]
    pub charging_ac: Option<WirePort>,
    #[serde(default, rename = "chargingDC")]
    pub charging_dc: Option<WirePort>,
    /// kWh per km.
    #[serde(default)]
    pub efficiency: Option<f64>,
    /// km on a full battery.
    #[serde(default)]
    pub range: Option<f64>,
}

impl WireVehicle {
    fn into_profile(self) -> Result<VehicleProfile, ValidationError> {
        if !(self.battery_capacity.is_finite() && self.battery_capacity > 0.0) {
            return Err(ValidationError::BatteryCapacity(self.battery_capacity));
        }

        let consumption_kwh_per_km = match (self.efficiency, self.range) {
            (Some(efficiency), _) => efficiency,
            (None, Some(range)) if range.is_finite() && range > 0.0 => self.battery_capacity / range,
            _ => DEFAULT_CONSUMPTION_KWH_PER_KM,
        };

        let mut ac = self
            .charging_ac
            .map(|port| port.into_port("vehicle.chargingAC"))
            .transpose()?
            .flatten();
        let mut dc = self
            .charging_dc
            .map(|port| port.into_port("vehicle.chargingDC"))
            .transpose()?
            .flatten();

        match self.preferred_charging_type.as_deref().map(str::to_ascii_uppercase).as_deref() {
            Some("AC") if ac.is_some() => dc = None,
            Some("DC") if dc.is_some() => ac = None,
            _ => {}
        }

        Ok(VehicleProfile {
            usable_capacity_kwh: self.battery_capacity,
            consumption_kwh_per_km,
            elevation: Some(ElevationCoefficients::default()),
            ac,
            dc,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanRequest {
    pub start: WireLocation,
    pub destination: WireLocation,
    pub vehicle: WireVehicle,
    /// Percent, `(0, 100]`.
    #[serde(rename = "currentSOC")]
    pub current_soc: f64,
    #[serde(default)]
    pub departure_time: Option<String>,
}

impl RoutePlanRequest {
    pub fn into_trip_request(self, now: DateTime<Utc>) -> Result<TripRequest, ValidationError> {
        let origin = self.start.resolve("start")?;
        let destination = self.destination.resolve("destination")?;
        if !(self.current_soc.is_finite() && self.current_soc > 0.0 && self.current_soc <= 100.0) {
            return Err(ValidationError::StateOfCharge(self.current_soc));
        }
        let departure_time = parse_departure_time(self.departure_time.as_deref(), now)?;

        let trip = TripRequest {
            origin,
            destination,
            vehicle: self.vehicle.into_profile()?,
            current_soc: self.current_soc / 100.0,
            departure_time,
        };
        validate_trip(&trip)?;
        Ok(trip)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopResponse {
    pub station_id: String,
    pub station_name: String,
    pub connector_type: ConnectorType,
    pub arrival_time: Option<DateTime<Utc>>,
    #[serde(rename = "arrivalSOC")]
    pub arrival_soc: f64,
    #[serde(rename = "chargeToSOC")]
    pub charge_to_soc: f64,
    /// Minutes.
    pub charging_time: f64,
    /// kWh.
    pub energy_added: f64,
}

impl From<&ChargingStop> for StopResponse {
    fn from(stop: &ChargingStop) -> Self {
        Self {
            station_id: stop.station_id.clone(),
            station_name: stop.station_name.clone(),
            connector_type: stop.connector,
            arrival_time: stop.arrival_time,
            arrival_soc: round2(stop.arrival_soc * 100.0),
            charge_to_soc: round2(stop.charge_to_soc * 100.0),
            charging_time: round2(stop.charging_minutes),
            energy_added: round2(stop.energy_added_kwh),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanResponse {
    pub departure_time: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
    /// Kilometres.
    pub total_distance: f64,
    /// Minutes.
    pub total_time: f64,
    #[serde(rename = "finalArrivalSOC")]
    pub final_arrival_soc: f64,
    pub charging_stops: Vec<StopResponse>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_stations_available: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub no_feasible_route: bool,
}

impl From<&PlanResult> for RoutePlanResponse {
    fn from(result: &PlanResult) -> Self {
        Self {
            departure_time: result.departure_time,
            estimated_arrival: result.estimated_arrival,
            total_distance: round2(result.total_distance_km),
            total_time: round2(result.total_time_minutes),
            final_arrival_soc: round2(result.final_arrival_soc * 100.0),
            charging_stops: result.stops.iter().map(StopResponse::from).collect(),
            no_stations_available: result.outcome == PlanOutcome::NoStationsAvailable,
            no_feasible_route: result.outcome == PlanOutcome::NoFeasibleRoute,
        }
    }
}

/// `{success: true, data}` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessBody<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessBody<T> {
    pub fn new(data: T) -> Self {
        Self { success: true, data }
    }
}

/// `{success: false, message, field?}` envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>, field: Option<&'static str>) -> Self {
        Self {
            success: false,
            message: message.into(),
            field,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
