//! Step dependency graph.
//!
//! A [`Graph`] is built once from a step list and never modified. Edges point
//! from a prerequisite to the step that depends on it. Edges may name steps
//! that are not in the node list; every algorithm in this crate skips them.

use cadence_core::{CoreError, CoreResult, StepId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A unit of work supplied by the scenario source.
///
/// Deserializing goes through [`StepRecord::new`], so decoded records carry
/// the same duration guarantee as constructed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawStepRecord")]
pub struct StepRecord {
    /// Step identifier
    pub id: StepId,
    /// Expected duration in minutes
    pub expected_duration_minutes: f64,
    /// Steps that must run before this one
    #[serde(default)]
    pub dependencies: Vec<StepId>,
}

impl StepRecord {
    /// Create a step record
    ///
    /// # Errors
    ///
    /// Returns error if the duration is negative or not finite
    pub fn new(
        id: StepId,
        expected_duration_minutes: f64,
        dependencies: Vec<StepId>,
    ) -> CoreResult<Self> {
        if !expected_duration_minutes.is_finite() || expected_duration_minutes < 0.0 {
            return Err(CoreError::Validation {
                field: format!("step {} expectedDurationMinutes", id),
                reason: format!("must be a non-negative number, got {}", expected_duration_minutes),
            });
        }
        Ok(Self {
            id,
            expected_duration_minutes,
            dependencies,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawStepRecord {
    id: StepId,
    expected_duration_minutes: f64,
    #[serde(default)]
    dependencies: Vec<StepId>,
}

impl TryFrom<RawStepRecord> for StepRecord {
    type Error = CoreError;

    fn try_from(raw: RawStepRecord) -> CoreResult<Self> {
        Self::new(raw.id, raw.expected_duration_minutes, raw.dependencies)
    }
}

/// Cost and pressure attached to one edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeWeight {
    /// Generic cost
    pub weight: f64,
    /// Pressure contribution, roughly in [0, 1]
    pub criticality: f64,
}

/// Derives edge weights while a graph is built
pub trait EdgeWeighting {
    /// Weigh the edge from `dependency` to `dependent`
    fn weigh(&self, dependency: &StepId, dependent: &StepRecord) -> EdgeWeight;
}

/// Default weighting: the dependent step's duration is the cost, and
/// criticality saturates towards 1 as that duration grows past an hour
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationWeighting;

impl EdgeWeighting for DurationWeighting {
    fn weigh(&self, _dependency: &StepId, dependent: &StepRecord) -> EdgeWeight {
        let minutes = dependent.expected_duration_minutes.max(0.0);
        EdgeWeight {
            weight: minutes,
            criticality: minutes / (minutes + 60.0),
        }
    }
}

impl<F> EdgeWeighting for F
where
    F: Fn(&StepId, &StepRecord) -> EdgeWeight,
{
    fn weigh(&self, dependency: &StepId, dependent: &StepRecord) -> EdgeWeight {
        self(dependency, dependent)
    }
}

/// A dependency edge: `to` depends on `from`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Prerequisite step
    pub from: StepId,
    /// Dependent step
    pub to: StepId,
    /// Generic cost
    pub weight: f64,
    /// Pressure contribution
    pub criticality: f64,
}

impl Edge {
    /// Create a new edge
    #[must_use]
    pub fn new(from: StepId, to: StepId, weight: f64, criticality: f64) -> Self {
        Self {
            from,
            to,
            weight,
            criticality,
        }
    }
}

/// Immutable dependency graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<StepId>,
    edges: Vec<Edge>,
}

impl Graph {
    /// Build a graph from steps with the default weighting
    #[must_use]
    pub fn build(steps: &[StepRecord]) -> Self {
        Self::build_with(steps, &DurationWeighting)
    }

    /// Build a graph from steps with a caller-supplied weighting.
    ///
    /// Nodes follow step order; edges follow step order, then each step's
    /// dependency order.
    #[must_use]
    pub fn build_with(steps: &[StepRecord], weighting: &dyn EdgeWeighting) -> Self {
        let nodes = steps.iter().map(|s| s.id.clone()).collect();
        let edges = steps
            .iter()
            .flat_map(|step| {
                step.dependencies.iter().map(move |dep| {
                    let w = weighting.weigh(dep, step);
                    Edge::new(dep.clone(), step.id.clone(), w.weight, w.criticality)
                })
            })
            .collect();
        Self { nodes, edges }
    }

    /// Assemble a graph from explicit parts
    #[must_use]
    pub fn from_parts(nodes: Vec<StepId>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Nodes in input order
    #[must_use]
    pub fn nodes(&self) -> &[StepId] {
        &self.nodes
    }

    /// Edges in insertion order
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Whether a node is present
    #[must_use]
    pub fn contains(&self, id: &StepId) -> bool {
        self.nodes.contains(id)
    }

    /// Nodes that depend on the given node
    #[must_use]
    pub fn dependents(&self, id: &StepId) -> Vec<&StepId> {
        self.edges
            .iter()
            .filter(|e| &e.from == id)
            .map(|e| &e.to)
            .collect()
    }

    /// Nodes the given node depends on
    #[must_use]
    pub fn dependencies(&self, id: &StepId) -> Vec<&StepId> {
        self.edges
            .iter()
            .filter(|e| &e.to == id)
            .map(|e| &e.from)
            .collect()
    }

    /// Get total node count
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get total edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Check if graph is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Index-based adjacency over known nodes.
    ///
    /// A repeated node id resolves to its first position. Edges touching an
    /// unknown id are left out.
    pub(crate) fn adjacency(&self) -> Adjacency {
        let mut position: IndexMap<&StepId, usize> = IndexMap::with_capacity(self.nodes.len());
        for (i, id) in self.nodes.iter().enumerate() {
            position.entry(id).or_insert(i);
        }

        let mut successors = vec![Vec::new(); self.nodes.len()];
        let mut in_degree = vec![0usize; self.nodes.len()];
        let mut resolved = Vec::with_capacity(self.edges.len());

        for (edge_index, edge) in self.edges.iter().enumerate() {
            let (Some(&from), Some(&to)) = (position.get(&edge.from), position.get(&edge.to))
            else {
                continue;
            };
            successors[from].push(to);
            in_degree[to] += 1;
            resolved.push(ResolvedEdge {
                edge_index,
                from,
                to,
            });
        }

        Adjacency {
            successors,
            in_degree,
            resolved,
        }
    }
}

/// Build a graph from steps with the default weighting
#[must_use]
pub fn build_graph(steps: &[StepRecord]) -> Graph {
    Graph::build(steps)
}

/// An edge whose endpoints both resolved to node positions
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedEdge {
    pub edge_index: usize,
    pub from: usize,
    pub to: usize,
}

/// Successor lists and in-degrees keyed by node position
#[derive(Debug, Clone)]
pub(crate) struct Adjacency {
    pub successors: Vec<Vec<usize>>,
    pub in_degree: Vec<usize>,
    pub resolved: Vec<ResolvedEdge>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn id(name: &str) -> StepId {
        StepId::new(name).unwrap()
    }

    pub fn step(name: &str, minutes: f64, deps: &[&str]) -> StepRecord {
        StepRecord::new(id(name), minutes, deps.iter().map(|d| id(d)).collect()).unwrap()
    }

    /// A, B->A, C->A, D->B,C
    pub fn diamond() -> Vec<StepRecord> {
        vec![
            step("A", 5.0, &[]),
            step("B", 10.0, &["A"]),
            step("C", 10.0, &["A"]),
            step("D", 1.0, &["B", "C"]),
        ]
    }

    pub fn names(ids: &[StepId]) -> Vec<&str> {
        ids.iter().map(StepId::as_str).collect()
    }
}
