//! Cycle detection.

use crate::graph::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Visited,
}

/// Whether the graph contains a directed cycle.
///
/// Depth-first search with a visiting/visited marker; returns on the first
/// edge into a node that is still on the stack. Iterative, O(V+E). Edges to
/// unknown nodes are ignored.
#[must_use]
pub fn has_cycle(graph: &Graph) -> bool {
    find_back_edge(graph).is_some()
}

/// Node positions `(from, to)` of the first back edge found, if any
pub(crate) fn find_back_edge(graph: &Graph) -> Option<(usize, usize)> {
    search_back_edge(graph, true)
}

/// Like [`find_back_edge`], but self-loops are stepped over so a cycle
/// between distinct nodes is still found
pub(crate) fn find_multi_node_back_edge(graph: &Graph) -> Option<(usize, usize)> {
    search_back_edge(graph, false)
}

fn search_back_edge(graph: &Graph, self_loops: bool) -> Option<(usize, usize)> {
    let adjacency = graph.adjacency();
    let mut marks = vec![Mark::Unvisited; graph.node_count()];
    // (node, index of the next successor to look at)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for root in 0..graph.node_count() {
        if marks[root] != Mark::Unvisited {
            continue;
        }
        marks[root] = Mark::Visiting;
        stack.push((root, 0));

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            match adjacency.successors[node].get(next) {
                Some(&succ) => {
                    frame.1 += 1;
                    if succ == node && !self_loops {
                        continue;
                    }
                    match marks[succ] {
                        Mark::Visiting => return Some((node, succ)),
                        Mark::Unvisited => {
                            marks[succ] = Mark::Visiting;
                            stack.push((succ, 0));
                        }
                        Mark::Visited => {}
                    }
                }
                None => {
                    marks[node] = Mark::Visited;
                    stack.pop();
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixtures::*;
    use crate::graph::{build_graph, Edge};

    #[test]
    fn test_acyclic_diamond() {
        assert!(!has_cycle(&build_graph(&diamond())));
    }

    #[test]
    fn test_empty_graph_has_no_cycle() {
        assert!(!has_cycle(&Graph::default()));
    }

    #[test]
    fn test_two_node_cycle() {
        let steps = vec![step("A", 1.0, &["B"]), step("B", 1.0, &["A"])];
        assert!(has_cycle(&build_graph(&steps)));
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let steps = vec![step("A", 1.0, &["A"])];
        assert!(has_cycle(&build_graph(&steps)));
    }

    #[test]
    fn test_long_cycle_behind_acyclic_prefix() {
        let steps = vec![
            step("root", 1.0, &[]),
            step("a", 1.0, &["root", "c"]),
            step("b", 1.0, &["a"]),
            step("c", 1.0, &["b"]),
        ];
        let graph = build_graph(&steps);
        assert!(has_cycle(&graph));
        assert!(find_back_edge(&graph).is_some());
    }

    #[test]
    fn test_multi_node_search_steps_over_self_loop() {
        let steps = vec![
            step("a", 1.0, &["a"]),
            step("b", 1.0, &["c"]),
            step("c", 1.0, &["b"]),
        ];
        let graph = build_graph(&steps);
        assert_eq!(find_back_edge(&graph), Some((0, 0)));
        let (from, to) = find_multi_node_back_edge(&graph).unwrap();
        assert_ne!(from, to);

        let lone = build_graph(&[step("a", 1.0, &["a"])]);
        assert_eq!(find_multi_node_back_edge(&lone), None);
    }

    #[test]
    fn test_shared_descendant_is_not_cycle() {
        // Two paths into D: visiting D a second time is a cross edge, not a back edge
        let graph = build_graph(&diamond());
        assert_eq!(find_back_edge(&graph), None);
    }

    #[test]
    fn test_unknown_endpoint_ignored() {
        let graph = Graph::from_parts(
            vec![id("A")],
            vec![
                Edge::new(id("A"), id("ghost"), 1.0, 0.0),
                Edge::new(id("ghost"), id("A"), 1.0, 0.0),
            ],
        );
        assert!(!has_cycle(&graph));
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let mut steps = vec![step("n0", 1.0, &[])];
        for i in 1..20_000 {
            let prev = format!("n{}", i - 1);
            steps.push(step(&format!("n{}", i), 1.0, &[prev.as_str()]));
        }
        assert!(!has_cycle(&build_graph(&steps)));
    }
}
