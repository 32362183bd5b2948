//! Result assembler: packages a path and its stops into a [`PlanResult`].

use chrono::{DateTime, Duration, Utc};

use crate::graph::ReachabilityGraph;
use crate::model::{ChargingStop, PlanOutcome, PlanResult, TripRequest};
use crate::search::SearchPath;

pub fn assemble(
    trip: &TripRequest,
    graph: &ReachabilityGraph,
    path: &SearchPath,
    mut stops: Vec<ChargingStop>,
) -> PlanResult {
    let mut total_distance_km = 0.0;
    let mut elapsed_minutes = 0.0;
    let mut soc = trip.current_soc;
    let mut pending = stops.iter_mut().peekable();

    for (leg, edge) in path.edges(graph).into_iter().enumerate() {
        total_distance_km += edge.distance_km;
        elapsed_minutes += edge.duration_minutes;
        soc -= graph.soc_cost(edge);

        if let Some(stop) = pending.next_if(|stop| stop.leg_index == leg) {
            stop.arrival_time = Some(offset(trip.departure_time, elapsed_minutes));
            elapsed_minutes += stop.charging_minutes;
            soc = stop.charge_to_soc;
        }
    }

    PlanResult {
        outcome: PlanOutcome::Planned,
        stops,
        total_distance_km,
        total_time_minutes: elapsed_minutes,
        departure_time: trip.departure_time,
        estimated_arrival: offset(trip.departure_time, elapsed_minutes),
        final_arrival_soc: soc,
    }
}

/// Result for a trip that cannot be planned.
pub fn infeasible(trip: &TripRequest, outcome: PlanOutcome) -> PlanResult {
    PlanResult {
        outcome,
        stops: Vec::new(),
        total_distance_km: 0.0,
        total_time_minutes: 0.0,
        departure_time: trip.departure_time,
        estimated_arrival: trip.departure_time,
        final_arrival_soc: trip.current_soc,
    }
}

fn offset(start: DateTime<Utc>, minutes: f64) -> DateTime<Utc> {
    start + Duration::milliseconds((minutes * 60_000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::EnergyModel;
    use crate::graph::{Edge, GraphNode, NodeId, StationNode};
    use crate::model::{
        ChargingPort, ChargingStation, ConnectorType, Coordinate, StationConnector, StationStatus, VehicleProfile,
    };
    use crate::optimizer::optimize_stops;
    use crate::search::search;
    use chrono::TimeZone;

    fn trip(current_soc: f64) -> TripRequest {
        TripRequest {
            origin: Coordinate::new(0.0, 0.0),
            destination: Coordinate::new(0.0, 1.5),
            vehicle: VehicleProfile {
                usable_capacity_kwh: 40.0,
                consumption_kwh_per_km: 0.18,
                elevation: None,
                ac: None,
                dc: Some(ChargingPort {
                    max_power_kw: 50.0,
                    connectors: vec![ConnectorType::Ccs2],
                }),
            },
            current_soc,
            departure_time: Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap(),
        }
    }

    fn graph() -> ReachabilityGraph {
        let station = GraphNode::Station(StationNode {
            station: ChargingStation {
                id: "mid".to_string(),
                name: "Midway".to_string(),
                location: Coordinate::new(0.0, 0.4),
                connectors: vec![StationConnector {
                    connector: ConnectorType::Ccs2,
                    max_power_kw: 50.0,
                }],
                status: StationStatus::Active,
                price_per_minute: None,
            },
            connector: ConnectorType::Ccs2,
            power_kw: 50.0,
            along_route_km: 40.0,
        });
        let edge = |from: usize, to: usize, km: f64| Edge {
            from: NodeId(from),
            to: NodeId(to),
            distance_km: km,
            duration_minutes: km * 0.6,
            energy_kwh: km * 0.18,
        };
        ReachabilityGraph::from_edges(
            vec![
                GraphNode::Origin(Coordinate::new(0.0, 0.0)),
                GraphNode::Destination(Coordinate::new(0.0, 1.5)),
                station,
            ],
            vec![edge(0, 1, 150.0), edge(0, 2, 40.0), edge(2, 1, 110.0)],
            40.0,
            EnergyModel::default(),
        )
    }

    #[test]
    fn test_direct_plan_totals() {
        let trip = trip(0.8);
        let g = graph();
        let path = search(&g, 0.8, 0.1).unwrap();
        let result = assemble(&trip, &g, &path, Vec::new());

        assert!(result.is_planned());
        assert!(result.stops.is_empty());
        assert!((result.total_distance_km - 150.0).abs() < 1e-9);
        assert!((result.total_time_minutes - 90.0).abs() < 1e-9);
        assert!((result.final_arrival_soc - 0.125).abs() < 1e-9);
        assert_eq!(
            result.estimated_arrival,
            Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_stop_arrival_time_and_totals() {
        let trip = trip(0.3);
        let g = graph();
        let path = search(&g, 0.3, 0.1).unwrap();
        let stops = optimize_stops(&g, &path, 0.3, 0.1).unwrap();
        let result = assemble(&trip, &g, &path, stops);

        assert_eq!(result.stops.len(), 1);
        let stop = &result.stops[0];
        assert_eq!(
            stop.arrival_time,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 24, 0).unwrap())
        );
        assert!((result.total_distance_km - 150.0).abs() < 1e-9);
        assert!((result.total_time_minutes - (90.0 + stop.charging_minutes)).abs() < 1e-9);
        assert!((result.total_time_minutes - path.total_minutes()).abs() < 1e-9);
        assert!((stop.charge_to_soc - 0.595).abs() < 1e-9);
        assert!((result.final_arrival_soc - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_infeasible_result() {
        let trip = trip(0.3);
        let result = infeasible(&trip, PlanOutcome::NoStationsAvailable);
        assert_eq!(result.outcome, PlanOutcome::NoStationsAvailable);
        assert!(result.stops.is_empty());
        assert_eq!(result.total_distance_km, 0.0);
        assert_eq!(result.total_time_minutes, 0.0);
        assert_eq!(result.estimated_arrival, trip.departure_time);
        assert_eq!(result.final_arrival_soc, 0.3);
    }
}
