//! Schedule composition: strategy resolution, plan construction, timeline.

use crate::config::ComposerConfig;
use crate::graph::{build_graph, StepRecord};
use crate::plan::{Plan, PlanState};
use crate::pressure::{calculate_node_pressure, hot_nodes};
use crate::strategy::Strategy;
use crate::timeline::{build_plan_timeline_with, TimelineFrame};
use crate::validate::{diagnose, GraphIssue};
use cadence_core::{Hash, PlanId, ScenarioId, StepId};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Caller-side facts about one scheduling call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRequest {
    /// Scenario the steps belong to
    pub scenario_id: ScenarioId,
    /// Number of signal windows observed for the scenario
    pub signal_window_count: usize,
    /// Recorded as the plan's `scheduledBy`
    pub scheduled_by: String,
    /// Decision time; also the first timeline frame
    pub ordered_at: DateTime<Utc>,
}

impl ScheduleRequest {
    /// Create a request
    #[must_use]
    pub fn new(
        scenario_id: ScenarioId,
        signal_window_count: usize,
        scheduled_by: impl Into<String>,
        ordered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            scenario_id,
            signal_window_count,
            scheduled_by: scheduled_by.into(),
            ordered_at,
        }
    }
}

/// Output of [`ScheduleComposer::compose_schedule`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    /// The ordered plan
    pub plan: Plan,
    /// Execution windows starting at the request's `ordered_at`
    pub windows: Vec<TimelineFrame>,
    /// `signal_window_count + step count`
    pub load: usize,
    /// Strategy actually used
    pub strategy: Strategy,
    /// Pressure per step
    pub pressure: IndexMap<StepId, f64>,
    /// Steps at or above the hot threshold, hottest first
    pub hot_nodes: Vec<StepId>,
    /// Structural issues found in the step graph
    pub issues: Vec<GraphIssue>,
}

/// Turns step lists into plans
#[derive(Debug, Clone, Default)]
pub struct ScheduleComposer {
    config: ComposerConfig,
}

impl ScheduleComposer {
    /// Create a composer
    #[must_use]
    pub fn new(config: ComposerConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// Order `steps` and wrap the order in a plan and a timeline.
    ///
    /// An explicit `strategy` wins; otherwise it is resolved from the
    /// request's signal window count. Graph issues are reported in the
    /// schedule and logged, never rejected.
    #[must_use]
    pub fn compose_schedule(
        &self,
        request: &ScheduleRequest,
        steps: &[StepRecord],
        strategy: Option<Strategy>,
    ) -> Schedule {
        let strategy = Strategy::resolve(
            strategy,
            request.signal_window_count,
            self.config.sla_window_threshold,
        );
        debug!(
            scenario = %request.scenario_id,
            %strategy,
            signal_windows = request.signal_window_count,
            "strategy resolved"
        );

        let graph = build_graph(steps);
        let issues = diagnose(&graph);
        for issue in &issues {
            warn!(scenario = %request.scenario_id, %issue, "step graph issue");
        }

        let order = strategy.order(steps);
        let load = request.signal_window_count + steps.len();
        let state = if load > self.config.active_load_threshold {
            PlanState::Active
        } else {
            PlanState::Ready
        };

        let plan = Plan::new(
            plan_id(&request.scenario_id, strategy, &order),
            request.scenario_id.clone(),
            order,
            state,
            request.ordered_at,
            request.scheduled_by.clone(),
        );

        let pressure = calculate_node_pressure(&graph, self.config.pressure_baseline);
        let hot = hot_nodes(&pressure, self.config.hot_pressure_threshold);

        let windows = build_plan_timeline_with(
            &self.config,
            &plan,
            request.ordered_at,
            strategy,
            self.config.default_frame_limit,
        );

        info!(
            plan = %plan.id,
            %strategy,
            steps = plan.selected.len(),
            load,
            state = %plan.state,
            hot = hot.len(),
            "schedule composed"
        );

        Schedule {
            plan,
            windows,
            load,
            strategy,
            pressure,
            hot_nodes: hot,
            issues,
        }
    }

    /// Timeline for an existing plan using this composer's spacing and floor
    #[must_use]
    pub fn build_plan_timeline(
        &self,
        plan: &Plan,
        start_at: DateTime<Utc>,
        strategy: Strategy,
        limit: Option<usize>,
    ) -> Vec<TimelineFrame> {
        build_plan_timeline_with(
            &self.config,
            plan,
            start_at,
            strategy,
            limit.unwrap_or(self.config.default_frame_limit),
        )
    }
}

/// Same scenario, strategy and order always give the same id
fn plan_id(scenario: &ScenarioId, strategy: Strategy, order: &[StepId]) -> PlanId {
    let parts = [scenario.as_str(), strategy.as_str()]
        .into_iter()
        .chain(order.iter().map(StepId::as_str));
    PlanId::from_digest(&Hash::compute_parts(parts))
}
