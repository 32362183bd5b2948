//! Route planning pipeline.
//!
//! One call to [`Planner::plan`] runs the whole pipeline for one trip: base
//! route, corridor stations, reachability graph, label search, charge
//! optimization and result assembly. Nothing is shared between calls except
//! the read-only station catalog.

use std::sync::OnceLock;

use rayon::ThreadPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::assembler::{assemble, infeasible};
use crate::corridor::CorridorIndex;
use crate::energy::EnergyModel;
use crate::error::{PlanError, ValidationError};
use crate::graph::{GraphBuilder, NodeId, ReachabilityGraph, EPSILON};
use crate::model::{Coordinate, PlanOutcome, PlanResult, TripRequest};
use crate::optimizer::optimize_stops;
use crate::polyline::Polyline;
use crate::search::{search, Infeasible, SearchPath};
use crate::traits::{DirectionsProvider, StationCatalog};

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// SOC fraction that must remain on arrival at every node.
    pub reserve_fraction: f64,
    /// Maximum lateral distance of a usable station from the base route.
    pub corridor_buffer_km: f64,
    /// Size of the worker pool shared by every request's directions lookups.
    pub max_parallel_lookups: usize,
    pub energy: EnergyModel,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            reserve_fraction: 0.10,
            corridor_buffer_km: 15.0,
            max_parallel_lookups: 8,
            energy: EnergyModel::default(),
        }
    }
}

pub struct Planner<D, C> {
    directions: D,
    catalog: C,
    config: PlannerConfig,
    /// Built on first use, then reused by every plan.
    lookup_pool: OnceLock<ThreadPool>,
}

impl<D: DirectionsProvider, C: StationCatalog> Planner<D, C> {
    pub fn new(directions: D, catalog: C, config: PlannerConfig) -> Self {
        Self {
            directions,
            catalog,
            config,
            lookup_pool: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn directions(&self) -> &D {
        &self.directions
    }

    fn lookup_pool(&self) -> Result<&ThreadPool, PlanError> {
        if let Some(pool) = self.lookup_pool.get() {
            return Ok(pool);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.max_parallel_lookups.max(1))
            .thread_name(|i| format!("segment-lookup-{}", i))
            .build()?;
        // A concurrent first plan may have won the race; its pool is kept.
        Ok(self.lookup_pool.get_or_init(|| pool))
    }

    /// Plans `trip`, checking `cancel` between pipeline stages.
    ///
    /// Infeasible trips are a successful result with the matching
    /// [`PlanOutcome`]; only invalid input, cancellation and worker pool
    /// failures are errors.
    pub fn plan(&self, trip: &TripRequest, cancel: &CancellationToken) -> Result<PlanResult, PlanError> {
        validate_trip(trip)?;
        let reserve = self.config.reserve_fraction;
        let vehicle = &trip.vehicle;

        checkpoint(cancel, "base route")?;
        let base = match self.directions.segment(trip.origin, trip.destination) {
            Ok(segment) => Some(segment),
            Err(err) => {
                warn!(error = %err, "base route lookup failed, using straight corridor");
                None
            }
        };

        let direct_arrival_soc = base.as_ref().and_then(|segment| {
            match self.config.energy.energy_for_segment(segment, vehicle) {
                Ok(kwh) => Some(trip.current_soc - kwh / vehicle.usable_capacity_kwh),
                Err(err) => {
                    warn!(error = %err, "base route segment is unusable");
                    None
                }
            }
        });
        let direct_feasible = direct_arrival_soc.is_some_and(|soc| soc + EPSILON >= reserve);

        checkpoint(cancel, "corridor")?;
        let candidates = if direct_feasible {
            debug!("direct drive is feasible, skipping corridor");
            Vec::new()
        } else {
            let route = base
                .as_ref()
                .map(|segment| segment.polyline.clone())
                .unwrap_or_else(|| Polyline::new(vec![trip.origin.as_tuple(), trip.destination.as_tuple()]));
            CorridorIndex::new(self.catalog.stations()).candidate_stations(
                &route,
                vehicle,
                self.config.corridor_buffer_km,
            )
        };

        checkpoint(cancel, "graph")?;
        let graph = GraphBuilder::new(
            &self.directions,
            self.config.energy,
            reserve,
            self.config.max_parallel_lookups,
        )
        .with_segment(NodeId::ORIGIN, NodeId::DESTINATION, base)
        .with_pool(self.lookup_pool()?)
        .build(trip.origin, trip.destination, &candidates, vehicle)?;

        checkpoint(cancel, "search")?;
        let path = match search(&graph, trip.current_soc, reserve) {
            Ok(path) => path,
            Err(reason) => {
                let outcome = match reason {
                    Infeasible::NoStationsAvailable => PlanOutcome::NoStationsAvailable,
                    Infeasible::NoFeasibleRoute => PlanOutcome::NoFeasibleRoute,
                };
                info!(
                    ?outcome,
                    stations = graph.station_count(),
                    dropped_edges = graph.dropped_edges(),
                    "trip cannot be planned"
                );
                return Ok(infeasible(trip, outcome));
            }
        };

        checkpoint(cancel, "optimize")?;
        let result = finish_path(trip, &graph, &path, reserve);
        if !result.is_planned() {
            return Ok(result);
        }
        info!(
            stops = result.stops.len(),
            distance_km = result.total_distance_km,
            minutes = result.total_time_minutes,
            final_soc = result.final_arrival_soc,
            "trip planned"
        );
        Ok(result)
    }
}

/// Charge amounts and assembly for a found path. An inconsistent path is
/// reported as [`PlanOutcome::NoFeasibleRoute`].
fn finish_path(trip: &TripRequest, graph: &ReachabilityGraph, path: &SearchPath, reserve: f64) -> PlanResult {
    match optimize_stops(graph, path, trip.current_soc, reserve) {
        Ok(stops) => assemble(trip, graph, path, stops),
        Err(err) => {
            error!(error = %err, path = ?path.nodes(), "search returned an inconsistent path");
            infeasible(trip, PlanOutcome::NoFeasibleRoute)
        }
    }
}

fn checkpoint(cancel: &CancellationToken, stage: &'static str) -> Result<(), PlanError> {
    if cancel.is_cancelled() {
        debug!(stage, "planning cancelled");
        return Err(PlanError::Cancelled { stage });
    }
    Ok(())
}

/// Checks the invariants every trip must satisfy before planning.
pub fn validate_trip(trip: &TripRequest) -> Result<(), ValidationError> {
    validate_coordinate("start", trip.origin)?;
    validate_coordinate("destination", trip.destination)?;

    if !(trip.current_soc.is_finite() && trip.current_soc > 0.0 && trip.current_soc <= 1.0) {
        return Err(ValidationError::StateOfCharge(trip.current_soc * 100.0));
    }

    let vehicle = &trip.vehicle;
    if !(vehicle.usable_capacity_kwh.is_finite() && vehicle.usable_capacity_kwh > 0.0) {
        return Err(ValidationError::BatteryCapacity(vehicle.usable_capacity_kwh));
    }
    if !(vehicle.consumption_kwh_per_km.is_finite() && vehicle.consumption_kwh_per_km > 0.0) {
        return Err(ValidationError::Consumption(vehicle.consumption_kwh_per_km));
    }
    for (port, charging) in [("vehicle.chargingAC", &vehicle.ac), ("vehicle.chargingDC", &vehicle.dc)] {
        if let Some(charging) = charging {
            if !(charging.max_power_kw.is_finite() && charging.max_power_kw > 0.0) {
                return Err(ValidationError::PortPower {
                    port,
                    power: charging.max_power_kw,
                });
            }
        }
    }
    if vehicle.connectors().is_empty() {
        return Err(ValidationError::NoConnectors);
    }
    Ok(())
}

fn validate_coordinate(field: &'static str, coordinate: Coordinate) -> Result<(), ValidationError> {
    if coordinate.is_valid() {
        Ok(())
    } else {
        Err(ValidationError::Coordinate {
            field,
            reason: format!("({}, {}) is out of range", coordinate.lat, coordinate.lng),
        })
    }
}
