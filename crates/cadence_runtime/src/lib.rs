//! cadence runtime
//!
//! Typed stage chains and the executor that runs them: one stage at a time,
//! failures as values, a hash-linked audit trail per run, and a scenario
//! engine that runs a chain over a freshly composed plan.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod audit;
pub mod chain;
pub mod config;
pub mod context;
pub mod engine;
pub mod executor;
pub mod logging;
pub mod monitor;
pub mod stage;

pub use audit::{
    AuditError, AuditTrail, ExecutionRecord, MemorySink, NullSink, RunReport, StageOutcome,
    TelemetrySink, TracingSink,
};
pub use chain::{Chain, ChainError};
pub use config::ExecutorConfig;
pub use context::PluginContext;
pub use engine::{EngineError, ScenarioEngine, ScenarioRun, ScenarioSource, StaticScenarioSource};
pub use executor::{ChainExecutor, ChainReport, ChainResult, ChainState};
pub use logging::init_logging;
pub use monitor::RunMetrics;
pub use stage::{FnStage, Stage, StageDefinition, StageFailure, StageResult};
