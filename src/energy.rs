//! Energy model: segment consumption and charging duration.
//!
//! Charging follows a two-phase curve. Below the knee the battery accepts
//! the full negotiated power; above it power falls linearly toward zero at
//! 100% SOC, floored at a small trickle so that a full charge still takes
//! finite time. Durations are the exact integral of `capacity / P(soc)`
//! over the SOC interval.

use crate::error::ValidationError;
use crate::model::{ChargingStation, ConnectorType, RoadSegment, VehicleProfile};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyModel {
    /// SOC fraction where the charge taper begins.
    pub knee_soc: f64,
    /// Lowest power during the taper, as a fraction of full power.
    pub taper_floor: f64,
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self {
            knee_soc: 0.8,
            taper_floor: 0.05,
        }
    }
}

impl EnergyModel {
    /// kWh consumed driving `segment`.
    pub fn energy_for_segment(
        &self,
        segment: &RoadSegment,
        vehicle: &VehicleProfile,
    ) -> Result<f64, ValidationError> {
        let inputs = [
            ("distance", segment.distance_km),
            ("elevation gain", segment.elevation_gain_m),
            ("elevation loss", segment.elevation_loss_m),
        ];
        for (name, value) in inputs {
            if !value.is_finite() {
                return Err(ValidationError::Segment(format!("{} is not finite", name)));
            }
            if value < 0.0 {
                return Err(ValidationError::Segment(format!("{} is negative ({})", name, value)));
            }
        }
        if !(vehicle.consumption_kwh_per_km.is_finite() && vehicle.consumption_kwh_per_km > 0.0) {
            return Err(ValidationError::Consumption(vehicle.consumption_kwh_per_km));
        }

        let flat = segment.distance_km
            * vehicle.consumption_kwh_per_km
            * segment.speed_class.consumption_factor();

        let elevation = vehicle.elevation.map_or(0.0, |coefficients| {
            let climb = segment.elevation_gain_m * coefficients.climb_kwh_per_m;
            let recovered = segment.elevation_loss_m
                * coefficients.climb_kwh_per_m
                * coefficients.regen_fraction;
            // Regen can cancel climbing, never undercut the flat cost.
            (climb - recovered).max(0.0)
        });

        Ok(flat + elevation)
    }

    /// Power the battery accepts at `soc` from a charger delivering at most
    /// `max_power_kw`.
    pub fn power_at(&self, max_power_kw: f64, soc: f64) -> f64 {
        if soc < self.knee_soc {
            return max_power_kw;
        }
        let taper = (1.0 - soc) / (1.0 - self.knee_soc);
        max_power_kw * taper.max(self.taper_floor)
    }

    /// Minutes needed to charge a `capacity_kwh` battery from `soc_from` to
    /// `soc_to` at `max_power_kw`. Zero when `soc_from >= soc_to`.
    pub fn charge_minutes(&self, max_power_kw: f64, capacity_kwh: f64, soc_from: f64, soc_to: f64) -> f64 {
        let from = soc_from.clamp(0.0, 1.0);
        let to = soc_to.clamp(0.0, 1.0);
        if from >= to {
            return 0.0;
        }
        if max_power_kw <= 0.0 {
            return f64::INFINITY;
        }

        let knee = self.knee_soc.clamp(0.0, 1.0);
        let floor_start = 1.0 - self.taper_floor * (1.0 - knee);
        let mut hours_per_kwh_fraction = 0.0;

        // Bulk phase at constant power.
        let bulk_end = to.min(knee);
        if from < bulk_end {
            hours_per_kwh_fraction += (bulk_end - from) / max_power_kw;
        }

        // Linear taper: integral of (1 - knee) / (P (1 - s)) ds.
        let taper_start = from.max(knee);
        let taper_end = to.min(floor_start);
        if taper_start < taper_end {
            hours_per_kwh_fraction +=
                (1.0 - knee) / max_power_kw * ((1.0 - taper_start) / (1.0 - taper_end)).ln();
        }

        // Trickle at the floor power.
        let trickle_start = from.max(floor_start);
        if trickle_start < to {
            hours_per_kwh_fraction += (to - trickle_start) / (max_power_kw * self.taper_floor);
        }

        hours_per_kwh_fraction * capacity_kwh * 60.0
    }

    /// Minutes to charge `vehicle` at `station` through `connector`.
    pub fn charge_time(
        &self,
        station: &ChargingStation,
        connector: ConnectorType,
        soc_from: f64,
        soc_to: f64,
        vehicle: &VehicleProfile,
    ) -> Result<f64, ValidationError> {
        let power = charging_power(station, connector, vehicle)?;
        Ok(self.charge_minutes(power, vehicle.usable_capacity_kwh, soc_from, soc_to))
    }
}

/// Negotiated power for `connector`: the lower of what the station and the
/// vehicle can do.
pub fn charging_power(
    station: &ChargingStation,
    connector: ConnectorType,
    vehicle: &VehicleProfile,
) -> Result<f64, ValidationError> {
    let station_power = station
        .max_power_for(connector)
        .ok_or(ValidationError::StationConnector(connector.as_str()))?;
    let vehicle_power = vehicle
        .max_power_for(connector)
        .ok_or(ValidationError::VehicleConnector(connector.as_str()))?;
    Ok(station_power.min(vehicle_power))
}

/// Fastest compatible connector at `station`, if any.
///
/// Ties go to the connector listed first by the station.
pub fn best_connector(station: &ChargingStation, vehicle: &VehicleProfile) -> Option<(ConnectorType, f64)> {
    let mut best: Option<(ConnectorType, f64)> = None;
    for offered in &station.connectors {
        let Ok(power) = charging_power(station, offered.connector, vehicle) else {
            continue;
        };
        if power <= 0.0 {
            continue;
        }
        if best.is_none_or(|(_, current)| power > current) {
            best = Some((offered.connector, power));
        }
    }
    best
}
