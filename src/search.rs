//! Multi-criteria label-setting search over the reachability graph.
//!
//! A label is a (node, arrival SOC, elapsed minutes) triple. Labels are
//! expanded in order of elapsed time, so the first label settled at the
//! destination is the fastest plan. At a single node a label is dominated by
//! any already settled label with at least the same SOC, since that one was
//! also reached no later.
//!
//! Charging follows a charge-just-enough rule: before leaving a station the
//! vehicle tops up to exactly what the next edge needs plus the reserve,
//! and nothing when it already has that much. The origin never charges.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tracing::debug;

use crate::graph::{Edge, NodeId, ReachabilityGraph, EPSILON};

/// Why no path exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Infeasible {
    /// The graph has no station nodes at all.
    NoStationsAvailable,
    /// Stations exist but none of their combinations reach the destination.
    NoFeasibleRoute,
}

/// One node of the chosen path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStep {
    pub node: NodeId,
    pub arrival_soc: f64,
    /// SOC when leaving; above `arrival_soc` only where the vehicle charged.
    pub departure_soc: f64,
    pub dwell_minutes: f64,
    /// Minutes since departure from the origin at arrival.
    pub arrival_minutes: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub labels_created: usize,
    pub labels_expanded: usize,
    pub labels_pruned: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchPath {
    pub steps: Vec<PathStep>,
    pub stats: SearchStats,
}

impl SearchPath {
    pub fn nodes(&self) -> Vec<NodeId> {
        self.steps.iter().map(|step| step.node).collect()
    }

    /// Edges between consecutive steps, in driving order.
    pub fn edges<'g>(&self, graph: &'g ReachabilityGraph) -> Vec<&'g Edge> {
        self.steps
            .windows(2)
            .filter_map(|pair| graph.edge(pair[0].node, pair[1].node))
            .collect()
    }

    pub fn total_minutes(&self) -> f64 {
        self.steps.last().map_or(0.0, |step| step.arrival_minutes)
    }

    pub fn final_soc(&self) -> f64 {
        self.steps.last().map_or(0.0, |step| step.arrival_soc)
    }
}

#[derive(Debug, Clone, Copy)]
struct Label {
    node: NodeId,
    soc: f64,
    minutes: f64,
    predecessor: Option<usize>,
    /// SOC the predecessor left with, after any charging there.
    predecessor_departure_soc: f64,
    predecessor_dwell_minutes: f64,
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    minutes: f64,
    soc: f64,
    label: usize,
}

// Flipped so the max-heap pops the earliest label first; equal times favour
// higher SOC, then the older label.
impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .minutes
            .total_cmp(&self.minutes)
            .then_with(|| self.soc.total_cmp(&other.soc))
            .then_with(|| other.label.cmp(&self.label))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

/// Finds the fastest origin-to-destination path that never drops below
/// `reserve_fraction`, starting with `current_soc`.
///
/// A direct drive is returned as is whenever it is feasible, without
/// considering stations.
pub fn search(graph: &ReachabilityGraph, current_soc: f64, reserve_fraction: f64) -> Result<SearchPath, Infeasible> {
    if let Some(path) = direct_path(graph, current_soc, reserve_fraction) {
        debug!(minutes = path.total_minutes(), "direct drive is feasible");
        return Ok(path);
    }
    if graph.station_count() == 0 {
        return Err(Infeasible::NoStationsAvailable);
    }

    let mut stats = SearchStats::default();
    let mut labels = vec![Label {
        node: NodeId::ORIGIN,
        soc: current_soc,
        minutes: 0.0,
        predecessor: None,
        predecessor_departure_soc: current_soc,
        predecessor_dwell_minutes: 0.0,
    }];
    stats.labels_created = 1;

    let mut best_settled_soc = vec![f64::NEG_INFINITY; graph.nodes().len()];
    let mut queue = BinaryHeap::new();
    queue.push(QueueEntry {
        minutes: 0.0,
        soc: current_soc,
        label: 0,
    });

    while let Some(entry) = queue.pop() {
        let label = labels[entry.label];
        if label.soc <= best_settled_soc[label.node.0] + EPSILON {
            stats.labels_pruned += 1;
            continue;
        }
        best_settled_soc[label.node.0] = label.soc;

        if label.node == NodeId::DESTINATION {
            let steps = reconstruct(&labels, entry.label);
            debug!(
                created = stats.labels_created,
                expanded = stats.labels_expanded,
                pruned = stats.labels_pruned,
                minutes = label.minutes,
                "label search reached destination"
            );
            return Ok(SearchPath { steps, stats });
        }
        stats.labels_expanded += 1;

        let is_station = graph.node(label.node).as_station().is_some();
        for edge in graph.edges_from(label.node) {
            let cost = graph.soc_cost(edge);
            let required = reserve_fraction + cost;

            let (departure_soc, dwell_minutes) = if label.soc + EPSILON >= required {
                (label.soc, 0.0)
            } else if is_station && required <= 1.0 + EPSILON {
                let target = required.min(1.0);
                (target, graph.charge_minutes(label.node, label.soc, target))
            } else {
                continue;
            };

            let arrival_soc = departure_soc - cost;
            if arrival_soc <= best_settled_soc[edge.to.0] + EPSILON {
                stats.labels_pruned += 1;
                continue;
            }

            let minutes = label.minutes + dwell_minutes + edge.duration_minutes;
            labels.push(Label {
                node: edge.to,
                soc: arrival_soc,
                minutes,
                predecessor: Some(entry.label),
                predecessor_departure_soc: departure_soc,
                predecessor_dwell_minutes: dwell_minutes,
            });
            stats.labels_created += 1;
            queue.push(QueueEntry {
                minutes,
                soc: arrival_soc,
                label: labels.len() - 1,
            });
        }
    }

    debug!(
        created = stats.labels_created,
        expanded = stats.labels_expanded,
        pruned = stats.labels_pruned,
        "label search exhausted"
    );
    Err(Infeasible::NoFeasibleRoute)
}

fn direct_path(graph: &ReachabilityGraph, current_soc: f64, reserve_fraction: f64) -> Option<SearchPath> {
    let edge = graph.edge(NodeId::ORIGIN, NodeId::DESTINATION)?;
    let arrival_soc = current_soc - graph.soc_cost(edge);
    if arrival_soc + EPSILON < reserve_fraction {
        return None;
    }

    Some(SearchPath {
        steps: vec![
            PathStep {
                node: NodeId::ORIGIN,
                arrival_soc: current_soc,
                departure_soc: current_soc,
                dwell_minutes: 0.0,
                arrival_minutes: 0.0,
            },
            PathStep {
                node: NodeId::DESTINATION,
                arrival_soc,
                departure_soc: arrival_soc,
                dwell_minutes: 0.0,
                arrival_minutes: edge.duration_minutes,
            },
        ],
        stats: SearchStats::default(),
    })
}

fn reconstruct(labels: &[Label], last: usize) -> Vec<PathStep> {
    let mut chain = Vec::new();
    let mut cursor = Some(last);
    while let Some(index) = cursor {
        chain.push(labels[index]);
        cursor = labels[index].predecessor;
    }
    chain.reverse();

    let mut steps: Vec<PathStep> = chain
        .iter()
        .map(|label| PathStep {
            node: label.node,
            arrival_soc: label.soc,
            departure_soc: label.soc,
            dwell_minutes: 0.0,
            arrival_minutes: label.minutes,
        })
        .collect();

    // Charging decisions are stored on the label that follows them.
    for (i, label) in chain.iter().enumerate().skip(1) {
        steps[i - 1].departure_soc = label.predecessor_departure_soc;
        steps[i - 1].dwell_minutes = label.predecessor_dwell_minutes;
    }
    steps
}
