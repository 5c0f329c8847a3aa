//! Scenario engine: fetch steps, compose a schedule, run a chain over the plan.

use crate::chain::{Chain, ChainError};
use crate::context::PluginContext;
use crate::executor::{ChainExecutor, ChainReport};
use async_trait::async_trait;
use cadence_core::{Clock, CoreError, CoreResult, ScenarioId, SystemClock};
use cadence_plan::{Plan, Schedule, ScheduleComposer, ScheduleRequest, StepRecord, Strategy};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Supplies step definitions for a scenario
#[async_trait]
pub trait ScenarioSource: Send + Sync {
    /// Steps of the scenario
    async fn steps(&self, scenario: &ScenarioId) -> CoreResult<Vec<StepRecord>>;

    /// Signal windows observed for the scenario
    async fn signal_window_count(&self, scenario: &ScenarioId) -> CoreResult<usize>;
}

/// A fixed, in-memory set of scenarios
#[derive(Debug, Clone, Default)]
pub struct StaticScenarioSource {
    scenarios: IndexMap<ScenarioId, (Vec<StepRecord>, usize)>,
}

impl StaticScenarioSource {
    /// Empty source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a scenario
    #[must_use]
    pub fn with_scenario(
        mut self,
        scenario: ScenarioId,
        steps: Vec<StepRecord>,
        signal_window_count: usize,
    ) -> Self {
        self.scenarios.insert(scenario, (steps, signal_window_count));
        self
    }

    fn lookup(&self, scenario: &ScenarioId) -> CoreResult<&(Vec<StepRecord>, usize)> {
        self.scenarios.get(scenario).ok_or_else(|| CoreError::NotFound {
            kind: "Scenario".to_string(),
            id: scenario.to_string(),
        })
    }
}

#[async_trait]
impl ScenarioSource for StaticScenarioSource {
    async fn steps(&self, scenario: &ScenarioId) -> CoreResult<Vec<StepRecord>> {
        Ok(self.lookup(scenario)?.0.clone())
    }

    async fn signal_window_count(&self, scenario: &ScenarioId) -> CoreResult<usize> {
        Ok(self.lookup(scenario)?.1)
    }
}

/// Scenario run failure before any stage ran
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The scenario source failed
    #[error("scenario source: {0}")]
    Source(#[from] CoreError),
    /// The chain is malformed
    #[error("chain rejected: {0}")]
    Chain(#[from] ChainError),
}

/// Schedule and chain report of one scenario run
#[derive(Debug, Clone)]
pub struct ScenarioRun<O> {
    /// The composed schedule
    pub schedule: Schedule,
    /// Outcome of the chain seeded with the plan
    pub report: ChainReport<O>,
}

/// Composes a schedule per scenario and executes a chain against its plan
pub struct ScenarioEngine<S> {
    source: S,
    composer: ScheduleComposer,
    executor: ChainExecutor,
    clock: Arc<dyn Clock>,
}

impl<S: ScenarioSource> ScenarioEngine<S> {
    /// Create an engine
    #[must_use]
    pub fn new(source: S, composer: ScheduleComposer, executor: ChainExecutor) -> Self {
        Self {
            source,
            composer,
            executor,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different clock for `ordered_at`
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The executor
    #[must_use]
    pub fn executor(&self) -> &ChainExecutor {
        &self.executor
    }

    /// Compose a schedule for `scenario` without running anything
    ///
    /// # Errors
    ///
    /// Returns error if the source fails
    pub async fn schedule(
        &self,
        scenario: &ScenarioId,
        scheduled_by: &str,
        strategy: Option<Strategy>,
    ) -> CoreResult<Schedule> {
        let steps = self.source.steps(scenario).await?;
        let windows = self.source.signal_window_count(scenario).await?;
        let request = ScheduleRequest::new(scenario.clone(), windows, scheduled_by, self.clock.now());
        Ok(self.composer.compose_schedule(&request, &steps, strategy))
    }

    /// Schedule `scenario` and run `chain` seeded with the resulting plan
    ///
    /// # Errors
    ///
    /// Returns error if the source fails or the chain is malformed. Stage
    /// failures are reported in the run, not here.
    pub async fn run<O>(
        &self,
        scenario: &ScenarioId,
        ctx: &PluginContext,
        chain: &Chain<Plan, O>,
        strategy: Option<Strategy>,
        cancel: &CancellationToken,
    ) -> Result<ScenarioRun<O>, EngineError>
    where
        O: Serialize + DeserializeOwned + Send + 'static,
    {
        let scheduled_by = format!("{}/{}", ctx.namespace, ctx.tenant_id);
        let schedule = self.schedule(scenario, &scheduled_by, strategy).await?;
        info!(
            scenario = %scenario,
            plan = %schedule.plan.id,
            strategy = %schedule.strategy,
            "running chain over plan"
        );

        let report = self
            .executor
            .execute_with_cancel(chain, ctx, schedule.plan.clone(), cancel)
            .await?;

        Ok(ScenarioRun { schedule, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemorySink;
    use crate::config::ExecutorConfig;
    use crate::stage::fixtures::def;
    use crate::stage::{FnStage, StageFailure, StageResult};
    use cadence_core::{ManualClock, RequestId, StepId, TenantId};
    use cadence_plan::{ComposerConfig, PlanState};
    use chrono::{DateTime, Utc};

    fn step(id: &str, minutes: f64, deps: &[&str]) -> StepRecord {
        StepRecord::new(
            StepId::new(id).unwrap(),
            minutes,
            deps.iter().map(|d| StepId::new(d).unwrap()).collect(),
        )
        .unwrap()
    }

    fn scenario() -> ScenarioId {
        ScenarioId::new("dr-drill").unwrap()
    }

    fn engine(sink: Arc<MemorySink>) -> ScenarioEngine<StaticScenarioSource> {
        let source = StaticScenarioSource::new().with_scenario(
            scenario(),
            vec![
                step("verify", 5.0, &["failover"]),
                step("snapshot", 10.0, &[]),
                step("failover", 20.0, &["snapshot"]),
            ],
            2,
        );
        let clock = Arc::new(ManualClock::new(DateTime::<Utc>::UNIX_EPOCH));
        let executor = ChainExecutor::new(ExecutorConfig::default())
            .with_sink(sink)
            .with_clock(clock.clone());
        ScenarioEngine::new(source, ScheduleComposer::new(ComposerConfig::default()), executor)
            .with_clock(clock)
    }

    fn ctx() -> PluginContext {
        PluginContext::new(
            TenantId::new("acme").unwrap(),
            RequestId::new("req-9").unwrap(),
            "ops",
            DateTime::<Utc>::UNIX_EPOCH,
        )
    }

    /// Walks the plan queue to the end, returning the steps in run order
    fn drain() -> FnStage<Plan, Vec<String>, impl Fn(&PluginContext, Plan) -> StageResult<Vec<String>>> {
        FnStage::new(def("drain"), |_: &PluginContext, plan: Plan| {
            let mut ran = Vec::new();
            let mut current = plan;
            loop {
                let (head, next) = current.advance();
                match head {
                    Some(step) => ran.push(step.to_string()),
                    None => break,
                }
                current = next;
            }
            Ok(ran)
        })
    }

    #[tokio::test]
    async fn test_run_executes_chain_over_plan() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(sink.clone());
        let chain = Chain::new(drain());

        let run = engine
            .run(&scenario(), &ctx(), &chain, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(run.schedule.strategy, Strategy::DependencyFirst);
        assert_eq!(run.schedule.plan.scheduled_by, "ops/acme");
        assert_eq!(run.schedule.plan.state, PlanState::Ready);
        assert_eq!(
            run.report.result.value,
            Some(vec![
                "snapshot".to_string(),
                "failover".to_string(),
                "verify".to_string()
            ])
        );
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn test_explicit_strategy_reaches_plan() {
        let engine = engine(Arc::new(MemorySink::new()));
        let schedule = engine
            .schedule(&scenario(), "tests", Some(Strategy::Criticality))
            .await
            .unwrap();
        let order: Vec<&str> = schedule.plan.selected.iter().map(StepId::as_str).collect();
        assert_eq!(order, vec!["failover", "snapshot", "verify"]);
    }

    #[tokio::test]
    async fn test_unknown_scenario() {
        let engine = engine(Arc::new(MemorySink::new()));
        let chain = Chain::new(drain());
        let err = engine
            .run(
                &ScenarioId::new("missing").unwrap(),
                &ctx(),
                &chain,
                None,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Source(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_stage_failure_is_reported_not_raised() {
        let sink = Arc::new(MemorySink::new());
        let engine = engine(sink.clone());
        let gate = FnStage::new(def("gate"), |_: &PluginContext, plan: Plan| -> StageResult<Plan> {
            if plan.selected.len() > 2 {
                Err(StageFailure::new("too many steps for the change window"))
            } else {
                Ok(plan)
            }
        });
        let chain = Chain::new(gate).then(drain());

        let run = engine
            .run(&scenario(), &ctx(), &chain, None, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!run.report.result.ok);
        assert_eq!(run.report.run.audit.len(), 1);
        assert_eq!(sink.reports()[0].errors, run.report.result.errors);
    }
}
