//! cadence planner
//!
//! Builds dependency graphs from step records and orders them: cycle
//! detection, topological ordering, pressure analysis and strategy-driven
//! schedule composition with plan timelines.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod composer;
pub mod config;
pub mod cycle;
pub mod graph;
pub mod plan;
pub mod pressure;
pub mod strategy;
pub mod timeline;
pub mod topo;
pub mod validate;

pub use composer::{Schedule, ScheduleComposer, ScheduleRequest};
pub use config::{ComposerConfig, MAX_FRAME_INTERVAL_SECS};
pub use cycle::has_cycle;
pub use graph::{build_graph, DurationWeighting, Edge, EdgeWeight, EdgeWeighting, Graph, StepRecord};
pub use plan::{Plan, PlanState};
pub use pressure::{calculate_node_pressure, hot_nodes, DEFAULT_BASELINE};
pub use strategy::Strategy;
pub use timeline::{build_plan_timeline, build_plan_timeline_with, FrameStage, TimelineFrame};
pub use topo::{critical_path, order_by_dependencies, weighted_critical_path, WeightedPath};
pub use validate::{diagnose, GraphIssue};
