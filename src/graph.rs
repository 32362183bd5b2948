//! Reachability graph builder.
//!
//! Nodes are the trip origin, the destination and every corridor station.
//! An edge is a direct drive between two nodes whose energy fits in the
//! battery above the reserve, so it could be driven at least from a full
//! charge. Everything else is left out, which keeps the graph sparse.

use std::collections::HashMap;

use rayon::prelude::*;
use rayon::ThreadPool;
use tracing::{debug, warn};

use crate::corridor::CorridorStation;
use crate::energy::{best_connector, EnergyModel};
use crate::error::PlanError;
use crate::model::{ChargingStation, ConnectorType, Coordinate, RoadSegment, VehicleProfile};
use crate::traits::DirectionsProvider;

/// Slack for floating point comparisons on energy and SOC.
pub const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const ORIGIN: NodeId = NodeId(0);
    pub const DESTINATION: NodeId = NodeId(1);
}

/// A station the vehicle can charge at, with the connector it would use.
#[derive(Debug, Clone, PartialEq)]
pub struct StationNode {
    pub station: ChargingStation,
    pub connector: ConnectorType,
    pub power_kw: f64,
    pub along_route_km: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GraphNode {
    Origin(Coordinate),
    Destination(Coordinate),
    Station(StationNode),
}

impl GraphNode {
    pub fn location(&self) -> Coordinate {
        match self {
            GraphNode::Origin(location) | GraphNode::Destination(location) => *location,
            GraphNode::Station(node) => node.station.location,
        }
    }

    pub fn as_station(&self) -> Option<&StationNode> {
        match self {
            GraphNode::Station(node) => Some(node),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub distance_km: f64,
    pub duration_minutes: f64,
    pub energy_kwh: f64,
}

/// Simple directed graph with at most one edge per ordered node pair.
#[derive(Debug, Clone)]
pub struct ReachabilityGraph {
    nodes: Vec<GraphNode>,
    adjacency: Vec<Vec<Edge>>,
    usable_capacity_kwh: f64,
    energy: EnergyModel,
    dropped_edges: usize,
}

impl ReachabilityGraph {
    /// Assembles a graph from precomputed edges.
    ///
    /// Self-loops and edges into the origin are discarded; when an ordered
    /// pair appears more than once the fastest edge wins.
    pub fn from_edges(
        nodes: Vec<GraphNode>,
        edges: impl IntoIterator<Item = Edge>,
        usable_capacity_kwh: f64,
        energy: EnergyModel,
    ) -> Self {
        let mut adjacency: Vec<Vec<Edge>> = vec![Vec::new(); nodes.len()];
        for edge in edges {
            if edge.from == edge.to || edge.to == NodeId::ORIGIN || edge.from == NodeId::DESTINATION {
                continue;
            }
            let outgoing = &mut adjacency[edge.from.0];
            match outgoing.iter_mut().find(|existing| existing.to == edge.to) {
                Some(existing) if existing.duration_minutes > edge.duration_minutes => *existing = edge,
                Some(_) => {}
                None => outgoing.push(edge),
            }
        }
        for outgoing in &mut adjacency {
            outgoing.sort_by_key(|edge| edge.to);
        }

        Self {
            nodes,
            adjacency,
            usable_capacity_kwh,
            energy,
            dropped_edges: 0,
        }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> &GraphNode {
        &self.nodes[id.0]
    }

    pub fn edges_from(&self, id: NodeId) -> &[Edge] {
        &self.adjacency[id.0]
    }

    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&Edge> {
        self.adjacency[from.0].iter().find(|edge| edge.to == to)
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    pub fn station_count(&self) -> usize {
        self.nodes.len() - 2
    }

    pub fn usable_capacity_kwh(&self) -> f64 {
        self.usable_capacity_kwh
    }

    /// Edges lost to failed directions lookups.
    pub fn dropped_edges(&self) -> usize {
        self.dropped_edges
    }

    /// SOC fraction consumed by `edge`.
    pub fn soc_cost(&self, edge: &Edge) -> f64 {
        edge.energy_kwh / self.usable_capacity_kwh
    }

    /// Minutes spent charging at `node` from `soc_from` to `soc_to`. Zero for
    /// nodes that are not stations.
    pub fn charge_minutes(&self, node: NodeId, soc_from: f64, soc_to: f64) -> f64 {
        match self.node(node) {
            GraphNode::Station(station) => {
                self.energy
                    .charge_minutes(station.power_kw, self.usable_capacity_kwh, soc_from, soc_to)
            }
            _ => 0.0,
        }
    }
}

/// Builds a [`ReachabilityGraph`], fetching node-pair segments from the
/// directions collaborator on a bounded worker pool.
pub struct GraphBuilder<'a, D: DirectionsProvider> {
    directions: &'a D,
    energy: EnergyModel,
    reserve_fraction: f64,
    max_parallel_lookups: usize,
    pool: Option<&'a ThreadPool>,
    /// `None` marks a pair whose lookup already failed.
    memo: HashMap<(NodeId, NodeId), Option<RoadSegment>>,
}

impl<'a, D: DirectionsProvider> GraphBuilder<'a, D> {
    pub fn new(directions: &'a D, energy: EnergyModel, reserve_fraction: f64, max_parallel_lookups: usize) -> Self {
        Self {
            directions,
            energy,
            reserve_fraction,
            max_parallel_lookups: max_parallel_lookups.max(1),
            pool: None,
            memo: HashMap::new(),
        }
    }

    /// Records an already known segment (or known failure) so it is not
    /// fetched again.
    pub fn with_segment(mut self, from: NodeId, to: NodeId, segment: Option<RoadSegment>) -> Self {
        self.memo.insert((from, to), segment);
        self
    }

    /// Runs lookups on `pool` instead of a pool built for this graph alone.
    pub fn with_pool(mut self, pool: &'a ThreadPool) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn build(
        mut self,
        origin: Coordinate,
        destination: Coordinate,
        stations: &[CorridorStation],
        vehicle: &VehicleProfile,
    ) -> Result<ReachabilityGraph, PlanError> {
        let mut nodes = vec![GraphNode::Origin(origin), GraphNode::Destination(destination)];
        for candidate in stations {
            if let Some((connector, power_kw)) = best_connector(&candidate.station, vehicle) {
                nodes.push(GraphNode::Station(StationNode {
                    station: candidate.station.clone(),
                    connector,
                    power_kw,
                    along_route_km: candidate.along_route_km,
                }));
            }
        }

        let station_ids: Vec<NodeId> = (2..nodes.len()).map(NodeId).collect();
        let sources = std::iter::once(NodeId::ORIGIN).chain(station_ids.iter().copied());
        let pairs: Vec<(NodeId, NodeId)> = sources
            .flat_map(|from| {
                station_ids
                    .iter()
                    .copied()
                    .chain(std::iter::once(NodeId::DESTINATION))
                    .filter(move |&to| to != from)
                    .map(move |to| (from, to))
            })
            .collect();

        let dropped_edges = self.fetch_missing(&nodes, &pairs)?;

        let max_edge_kwh = vehicle.usable_capacity_kwh * (1.0 - self.reserve_fraction);
        let mut edges: Vec<Edge> = Vec::with_capacity(pairs.len());
        let mut oversized = 0usize;
        let mut invalid = 0usize;

        for &(from, to) in &pairs {
            let Some(Some(segment)) = self.memo.get(&(from, to)) else {
                continue;
            };
            let energy_kwh = match self.energy.energy_for_segment(segment, vehicle) {
                Ok(energy) => energy,
                Err(err) => {
                    warn!(from = from.0, to = to.0, error = %err, "discarding unusable segment");
                    invalid += 1;
                    continue;
                }
            };
            if energy_kwh > max_edge_kwh + EPSILON {
                oversized += 1;
                continue;
            }
            edges.push(Edge {
                from,
                to,
                distance_km: segment.distance_km,
                duration_minutes: segment.duration_minutes,
                energy_kwh,
            });
        }

        let mut graph = ReachabilityGraph::from_edges(nodes, edges, vehicle.usable_capacity_kwh, self.energy);
        graph.dropped_edges = dropped_edges + invalid;

        debug!(
            nodes = graph.nodes.len(),
            edges = graph.edge_count(),
            oversized,
            dropped = graph.dropped_edges,
            "reachability graph built"
        );

        Ok(graph)
    }

    /// Looks up every pair not yet memoized. Returns how many lookups failed.
    fn fetch_missing(&mut self, nodes: &[GraphNode], pairs: &[(NodeId, NodeId)]) -> Result<usize, PlanError> {
        let missing: Vec<(NodeId, NodeId)> = pairs
            .iter()
            .copied()
            .filter(|pair| !self.memo.contains_key(pair))
            .collect();
        let known_failures = pairs
            .iter()
            .filter(|pair| matches!(self.memo.get(pair), Some(None)))
            .count();
        if missing.is_empty() {
            return Ok(known_failures);
        }

        let own_pool;
        let (pool, workers) = match self.pool {
            Some(pool) => (pool, missing.len().min(pool.current_num_threads())),
            None => {
                let workers = missing.len().min(self.max_parallel_lookups);
                own_pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(workers)
                    .thread_name(|i| format!("segment-lookup-{}", i))
                    .build()?;
                (&own_pool, workers)
            }
        };

        let directions = self.directions;
        let results: Vec<((NodeId, NodeId), Option<RoadSegment>)> = pool.install(|| {
            missing
                .par_iter()
                .map(|&(from, to)| {
                    let segment = match directions.segment(nodes[from.0].location(), nodes[to.0].location()) {
                        Ok(segment) => Some(segment),
                        Err(err) => {
                            warn!(from = from.0, to = to.0, error = %err, "dropping edge after directions failure");
                            None
                        }
                    };
                    ((from, to), segment)
                })
                .collect()
        });

        let failed = results.iter().filter(|(_, segment)| segment.is_none()).count();
        self.memo.extend(results);
        debug!(lookups = missing.len(), failed, workers, "segment lookups finished");

        Ok(failed + known_failures)
    }
}
