//! Charge amount optimizer.
//!
//! Replays a stop sequence chosen by the search and settles how much to
//! charge at each station: exactly enough to reach the next node with the
//! reserve intact. Stations the vehicle can pass without charging produce
//! no stop.

use crate::error::OptimizerError;
use crate::graph::{NodeId, ReachabilityGraph, EPSILON};
use crate::model::ChargingStop;
use crate::search::SearchPath;

pub fn optimize_stops(
    graph: &ReachabilityGraph,
    path: &SearchPath,
    current_soc: f64,
    reserve_fraction: f64,
) -> Result<Vec<ChargingStop>, OptimizerError> {
    let nodes = path.nodes();
    if nodes.first() != Some(&NodeId::ORIGIN) || nodes.last() != Some(&NodeId::DESTINATION) {
        return Err(OptimizerError::InternalInconsistency(format!(
            "path {:?} does not run from origin to destination",
            nodes
        )));
    }

    let capacity = graph.usable_capacity_kwh();
    let mut soc = current_soc;
    let mut stops = Vec::new();

    for (leg, pair) in nodes.windows(2).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        let edge = graph.edge(from, to).ok_or_else(|| {
            OptimizerError::InternalInconsistency(format!("no edge from node {} to node {}", from.0, to.0))
        })?;
        let cost = graph.soc_cost(edge);
        let target = reserve_fraction + cost;

        if soc + EPSILON < target {
            let Some(node) = graph.node(from).as_station() else {
                return Err(OptimizerError::InternalInconsistency(format!(
                    "leg {} needs {:.4} SOC but node {} cannot charge",
                    leg, target, from.0
                )));
            };
            if target > 1.0 + EPSILON {
                return Err(OptimizerError::InternalInconsistency(format!(
                    "charge target {:.4} at station {} exceeds a full battery",
                    target, node.station.id
                )));
            }

            let charge_to = target.min(1.0);
            stops.push(ChargingStop {
                station_id: node.station.id.clone(),
                station_name: node.station.name.clone(),
                connector: node.connector,
                // `from` sits at path position `leg`, reached by the leg before.
                leg_index: leg - 1,
                arrival_soc: soc,
                charge_to_soc: charge_to,
                charging_minutes: graph.charge_minutes(from, soc, charge_to),
                energy_added_kwh: (charge_to - soc) * capacity,
                arrival_time: None,
            });
            soc = charge_to;
        }

        soc -= cost;
        if soc + EPSILON < reserve_fraction {
            return Err(OptimizerError::InternalInconsistency(format!(
                "arrival SOC {:.4} at node {} is below the reserve",
                soc, to.0
            )));
        }
    }

    Ok(stops)
}
