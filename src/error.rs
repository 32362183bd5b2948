//! Error taxonomy.
//!
//! Only request validation, cancellation and worker pool setup are errors of
//! the planning call itself. Missing stations and infeasible trips are
//! outcomes carried inside [`crate::model::PlanResult`]; directions failures
//! degrade the graph instead of failing the request.

use thiserror::Error;

/// Malformed request input, rejected before any search runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} is not a valid coordinate: {reason}")]
    Coordinate { field: &'static str, reason: String },
    #[error("current SOC must be in (0, 100], got {0}")]
    StateOfCharge(f64),
    #[error("battery capacity must be positive, got {0} kWh")]
    BatteryCapacity(f64),
    #[error("energy consumption must be positive, got {0} kWh/km")]
    Consumption(f64),
    #[error("{port} max power must be positive, got {power} kW")]
    PortPower { port: &'static str, power: f64 },
    #[error("vehicle supports no charging connectors")]
    NoConnectors,
    #[error("departure time {0:?} is not ISO-8601")]
    DepartureTime(String),
    #[error("road segment {0}")]
    Segment(String),
    #[error("station does not offer connector {0}")]
    StationConnector(&'static str),
    #[error("vehicle does not accept connector {0}")]
    VehicleConnector(&'static str),
}

impl ValidationError {
    /// Name of the offending request field, for field-level messages.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::Coordinate { field, .. } => field,
            ValidationError::StateOfCharge(_) => "currentSOC",
            ValidationError::BatteryCapacity(_) => "vehicle.batteryCapacity",
            ValidationError::Consumption(_) => "vehicle.efficiency",
            ValidationError::PortPower { port, .. } => port,
            ValidationError::NoConnectors => "vehicle",
            ValidationError::DepartureTime(_) => "departureTime",
            ValidationError::Segment(_) => "segment",
            ValidationError::StationConnector(_) => "connector",
            ValidationError::VehicleConnector(_) => "connector",
        }
    }
}

/// Failure of a single directions lookup.
#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("directions request timed out")]
    Timeout,
    #[error("directions request failed: {0}")]
    Http(#[source] reqwest::Error),
    #[error("no route between {0}")]
    NoRoute(String),
    #[error("invalid directions response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for DirectionsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DirectionsError::Timeout
        } else {
            DirectionsError::Http(err)
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read station catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse station catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// The chosen path disagrees with the graph it came from. Indicates a bug,
/// never bad input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizerError {
    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("planning cancelled before {stage}")]
    Cancelled { stage: &'static str },
    #[error("failed to start segment lookup workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
