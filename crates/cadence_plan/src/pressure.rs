//! Backward pressure propagation.
//!
//! A single pass over the edges in insertion order; not iterated to a fixed
//! point. A prerequisite picks up its dependent's pressure only if that
//! dependent's own edges were visited earlier, so the result approximates,
//! and can undercount, a full critical-path load.

use crate::graph::Graph;
use cadence_core::StepId;
use indexmap::IndexMap;

/// Baseline pressure used when the caller has no preference
pub const DEFAULT_BASELINE: f64 = 1.0;

/// Pressure per node.
///
/// Every node starts at `baseline`; then for each edge `(from, to)`,
/// `pressure[from] = max(pressure[from], pressure[to]) + criticality`.
/// Edges to unknown nodes are skipped.
#[must_use]
pub fn calculate_node_pressure(graph: &Graph, baseline: f64) -> IndexMap<StepId, f64> {
    let mut pressure: IndexMap<StepId, f64> = graph
        .nodes()
        .iter()
        .map(|id| (id.clone(), baseline))
        .collect();

    for edge in graph.edges() {
        let (Some(&from), Some(&to)) = (pressure.get(&edge.from), pressure.get(&edge.to)) else {
            continue;
        };
        if let Some(slot) = pressure.get_mut(&edge.from) {
            *slot = from.max(to) + edge.criticality;
        }
    }

    pressure
}

/// Nodes at or above `threshold`, hottest first; equal pressure keeps node order
#[must_use]
pub fn hot_nodes(pressure: &IndexMap<StepId, f64>, threshold: f64) -> Vec<StepId> {
    let mut hot: Vec<(&StepId, f64)> = pressure
        .iter()
        .filter(|(_, p)| **p >= threshold)
        .map(|(id, p)| (id, *p))
        .collect();
    hot.sort_by(|a, b| b.1.total_cmp(&a.1));
    hot.into_iter().map(|(id, _)| id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::graph::{Edge, Graph};

    fn edge(from: &str, to: &str, criticality: f64) -> Edge {
        Edge::new(id(from), id(to), 1.0, criticality)
    }

    #[test]
    fn test_baseline_without_edges() {
        let graph = Graph::from_parts(vec![id("a"), id("b")], vec![]);
        let pressure = calculate_node_pressure(&graph, 2.5);
        assert_eq!(pressure[&id("a")], 2.5);
        assert_eq!(pressure[&id("b")], 2.5);
    }

    #[test]
    fn test_single_edge_adds_criticality() {
        let graph = Graph::from_parts(vec![id("a"), id("b")], vec![edge("a", "b", 0.5)]);
        let pressure = calculate_node_pressure(&graph, DEFAULT_BASELINE);
        assert_eq!(pressure[&id("a")], 1.5);
        assert_eq!(pressure[&id("b")], 1.0);
    }

    #[test]
    fn test_single_pass_depends_on_edge_order() {
        let nodes = vec![id("a"), id("b"), id("c")];

        // b->c visited first, so a sees b's raised pressure
        let forward = Graph::from_parts(
            nodes.clone(),
            vec![edge("b", "c", 0.5), edge("a", "b", 0.5)],
        );
        let p = calculate_node_pressure(&forward, 1.0);
        assert_eq!(p[&id("a")], 2.0);

        // a->b visited first, so a never sees the later raise on b
        let backward = Graph::from_parts(nodes, vec![edge("a", "b", 0.5), edge("b", "c", 0.5)]);
        let p = calculate_node_pressure(&backward, 1.0);
        assert_eq!(p[&id("a")], 1.5);
        assert_eq!(p[&id("b")], 1.5);
    }

    #[test]
    fn test_unknown_endpoints_skipped() {
        let graph = Graph::from_parts(
            vec![id("a")],
            vec![edge("a", "ghost", 0.9), edge("ghost", "a", 0.9)],
        );
        let pressure = calculate_node_pressure(&graph, 1.0);
        assert_eq!(pressure.len(), 1);
        assert_eq!(pressure[&id("a")], 1.0);
    }

    #[test]
    fn test_hot_nodes_sorted_by_pressure() {
        let graph = Graph::from_parts(
            vec![id("a"), id("b"), id("c"), id("d")],
            vec![edge("c", "d", 0.75), edge("a", "b", 0.25), edge("b", "d", 0.5)],
        );
        let pressure = calculate_node_pressure(&graph, 1.0);
        let hot = hot_nodes(&pressure, 1.5);
        assert_eq!(names(&hot), vec!["c", "b"]);
        assert!(hot_nodes(&pressure, 10.0).is_empty());
    }
}
