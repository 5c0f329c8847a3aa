//! Graph diagnostics.
//!
//! Nothing here rejects a graph. The scheduler tolerates every issue listed;
//! diagnostics only make them visible.

use crate::cycle::find_multi_node_back_edge;
use crate::graph::Graph;
use cadence_core::StepId;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A structural oddity in a graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum GraphIssue {
    /// An edge names a node that is not in the node list
    #[error("edge {edge_index} ({from} -> {to}) references unknown step {missing}")]
    UnknownEndpoint {
        /// Position of the edge
        edge_index: usize,
        /// Edge source
        from: StepId,
        /// Edge target
        to: StepId,
        /// The endpoint that is missing
        missing: StepId,
    },
    /// A node id appears more than once
    #[error("step {node} is listed more than once")]
    DuplicateNode {
        /// Repeated node
        node: StepId,
    },
    /// A node depends on itself
    #[error("step {node} depends on itself")]
    SelfLoop {
        /// Offending node
        node: StepId,
    },
    /// The graph has a cycle; ordering falls back to input order
    #[error("dependency cycle through {from} -> {to}")]
    Cycle {
        /// Source of the back edge
        from: StepId,
        /// Target of the back edge
        to: StepId,
    },
}

/// Collect every issue in the graph, in a stable order
#[must_use]
pub fn diagnose(graph: &Graph) -> Vec<GraphIssue> {
    let mut issues = Vec::new();

    let mut seen: IndexSet<&StepId> = IndexSet::new();
    let mut reported: IndexSet<&StepId> = IndexSet::new();
    for node in graph.nodes() {
        if !seen.insert(node) && reported.insert(node) {
            issues.push(GraphIssue::DuplicateNode { node: node.clone() });
        }
    }

    for (edge_index, edge) in graph.edges().iter().enumerate() {
        for endpoint in [&edge.from, &edge.to] {
            if !seen.contains(endpoint) {
                issues.push(GraphIssue::UnknownEndpoint {
                    edge_index,
                    from: edge.from.clone(),
                    to: edge.to.clone(),
                    missing: endpoint.clone(),
                });
            }
        }
        if edge.from == edge.to {
            issues.push(GraphIssue::SelfLoop {
                node: edge.from.clone(),
            });
        }
    }

    // self-loops were reported above
    if let Some((from, to)) = find_multi_node_back_edge(graph) {
        let nodes = graph.nodes();
        issues.push(GraphIssue::Cycle {
            from: nodes[from].clone(),
            to: nodes[to].clone(),
        });
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::graph::{build_graph, Edge};

    #[test]
    fn test_clean_graph() {
        assert!(diagnose(&build_graph(&diamond())).is_empty());
    }

    #[test]
    fn test_unknown_endpoint_reported() {
        let graph = build_graph(&[step("a", 1.0, &["ghost"])]);
        let issues = diagnose(&graph);
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            &issues[0],
            GraphIssue::UnknownEndpoint { missing, edge_index: 0, .. } if missing.as_str() == "ghost"
        ));
        assert!(issues[0].to_string().contains("ghost"));
    }

    #[test]
    fn test_duplicate_reported_once() {
        let graph = Graph::from_parts(vec![id("a"), id("a"), id("a")], vec![]);
        assert_eq!(
            diagnose(&graph),
            vec![GraphIssue::DuplicateNode { node: id("a") }]
        );
    }

    #[test]
    fn test_self_loop_not_double_reported_as_cycle() {
        let graph = build_graph(&[step("a", 1.0, &["a"])]);
        assert_eq!(diagnose(&graph), vec![GraphIssue::SelfLoop { node: id("a") }]);
    }

    #[test]
    fn test_cycle_reported() {
        let graph = build_graph(&[step("a", 1.0, &["b"]), step("b", 1.0, &["a"])]);
        let issues = diagnose(&graph);
        assert_eq!(issues.len(), 1);
        assert!(matches!(issues[0], GraphIssue::Cycle { .. }));
    }

    #[test]
    fn test_self_loop_does_not_hide_other_cycle() {
        let graph = build_graph(&[
            step("a", 1.0, &["a"]),
            step("b", 1.0, &["c"]),
            step("c", 1.0, &["b"]),
        ]);
        let issues = diagnose(&graph);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0], GraphIssue::SelfLoop { node: id("a") });
        assert!(matches!(
            &issues[1],
            GraphIssue::Cycle { from, to } if from != to && from.as_str() != "a" && to.as_str() != "a"
        ));
    }

    #[test]
    fn test_issue_serializes_with_tag() {
        let issue = GraphIssue::SelfLoop { node: id("a") };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["issue"], "self_loop");
        assert_eq!(json["node"], "a");

        let edge_issue = diagnose(&Graph::from_parts(
            vec![],
            vec![Edge::new(id("x"), id("y"), 0.0, 0.0)],
        ));
        assert_eq!(edge_issue.len(), 2);
    }
}
