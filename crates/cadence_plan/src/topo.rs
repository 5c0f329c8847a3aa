//! Topological ordering.
//!
//! Ordering never fails: a cyclic graph yields its node list unchanged so
//! callers always get a deterministic order.

use crate::cycle::has_cycle;
use crate::graph::{Adjacency, Graph};
use cadence_core::StepId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Order nodes so that every prerequisite precedes its dependents.
///
/// Kahn's algorithm with a FIFO ready queue seeded in node order; successors
/// are released in edge insertion order. On a cyclic graph the node list is
/// returned as-is.
#[must_use]
pub fn order_by_dependencies(graph: &Graph) -> Vec<StepId> {
    if has_cycle(graph) {
        warn!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "dependency cycle detected; falling back to input order"
        );
        return graph.nodes().to_vec();
    }

    let adjacency = graph.adjacency();
    kahn_positions(graph.node_count(), &adjacency)
        .into_iter()
        .map(|i| graph.nodes()[i].clone())
        .collect()
}

/// Reverse of [`order_by_dependencies`]: dependents before prerequisites.
///
/// This is an ordering proxy, not a longest-path computation. See
/// [`weighted_critical_path`] for the weighted variant.
#[must_use]
pub fn critical_path(graph: &Graph) -> Vec<StepId> {
    let mut order = order_by_dependencies(graph);
    order.reverse();
    order
}

/// Kahn's algorithm over node positions. Positions never released by the
/// queue are appended in original order.
pub(crate) fn kahn_positions(node_count: usize, adjacency: &Adjacency) -> Vec<usize> {
    let mut in_degree = adjacency.in_degree.clone();
    let mut emitted = vec![false; node_count];
    let mut order = Vec::with_capacity(node_count);

    let mut ready: VecDeque<usize> = (0..node_count).filter(|&i| in_degree[i] == 0).collect();

    while let Some(node) = ready.pop_front() {
        emitted[node] = true;
        order.push(node);
        for &succ in &adjacency.successors[node] {
            in_degree[succ] -= 1;
            if in_degree[succ] == 0 {
                ready.push_back(succ);
            }
        }
    }

    if order.len() < node_count {
        debug!(
            stranded = node_count - order.len(),
            "appending nodes not released by the ready queue"
        );
        order.extend((0..node_count).filter(|&i| !emitted[i]));
    }

    order
}

/// The heaviest dependency path by summed edge weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPath {
    /// Nodes from the first prerequisite to the last dependent
    pub nodes: Vec<StepId>,
    /// Sum of edge weights along the path
    pub total_weight: f64,
}

/// Longest path by edge `weight` over an acyclic graph.
///
/// Returns `None` for a cyclic or empty graph. Ties keep the path ending at
/// the node reached first in topological order.
#[must_use]
pub fn weighted_critical_path(graph: &Graph) -> Option<WeightedPath> {
    if graph.is_empty() || has_cycle(graph) {
        return None;
    }

    let adjacency = graph.adjacency();
    let order = kahn_positions(graph.node_count(), &adjacency);

    let mut distance = vec![0.0f64; graph.node_count()];
    let mut previous: Vec<Option<usize>> = vec![None; graph.node_count()];

    // Incoming edges per node, in insertion order
    let mut incoming: Vec<Vec<(usize, f64)>> = vec![Vec::new(); graph.node_count()];
    for resolved in &adjacency.resolved {
        let weight = graph.edges()[resolved.edge_index].weight;
        incoming[resolved.to].push((resolved.from, weight));
    }

    for &node in &order {
        for &(from, weight) in &incoming[node] {
            let candidate = distance[from] + weight;
            if previous[node].is_none() || candidate > distance[node] {
                distance[node] = candidate;
                previous[node] = Some(from);
            }
        }
    }

    let mut end = order[0];
    for &node in &order {
        if distance[node] > distance[end] {
            end = node;
        }
    }

    let mut path = vec![end];
    let mut cursor = end;
    while let Some(prev) = previous[cursor] {
        path.push(prev);
        cursor = prev;
    }
    path.reverse();

    Some(WeightedPath {
        nodes: path.into_iter().map(|i| graph.nodes()[i].clone()).collect(),
        total_weight: distance[end],
    })
}
