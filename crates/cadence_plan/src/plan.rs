//! Plans: the materialized output of a scheduling decision.
//!
//! A [`Plan`] is a value. Lifecycle changes return a new plan and leave the
//! original untouched.

use cadence_core::{CoreError, CoreResult, PlanId, ScenarioId, StepId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    /// Being assembled
    Draft,
    /// Ordered and waiting to start
    Ready,
    /// Executing
    Active,
    /// Paused between execution windows
    Cooldown,
    /// Finished
    Completed,
    /// Abandoned
    Aborted,
}

impl PlanState {
    /// Lower-case name used in signatures and logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Cooldown => "cooldown",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Whether moving from `self` to `next` is allowed
    #[must_use]
    pub const fn can_transition_to(self, next: PlanState) -> bool {
        use PlanState::*;
        matches!(
            (self, next),
            (Draft, Ready | Active | Aborted)
                | (Ready, Active | Aborted)
                | (Active, Cooldown | Completed | Aborted)
                | (Cooldown, Active | Completed | Aborted)
        )
    }
}

impl fmt::Display for PlanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered step list plus state metadata.
///
/// `selected` is the original decision. `queue` starts equal to it and
/// shrinks through [`Plan::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Plan identifier
    pub id: PlanId,
    /// Scenario the steps came from
    pub scenario_id: ScenarioId,
    /// Steps in the decided order
    pub selected: Vec<StepId>,
    /// Steps still to run
    pub queue: Vec<StepId>,
    /// Lifecycle state
    pub state: PlanState,
    /// When the order was decided
    pub ordered_at: DateTime<Utc>,
    /// Who or what made the decision
    pub scheduled_by: String,
}

impl Plan {
    /// Create a plan whose queue mirrors `selected`
    #[must_use]
    pub fn new(
        id: PlanId,
        scenario_id: ScenarioId,
        selected: Vec<StepId>,
        state: PlanState,
        ordered_at: DateTime<Utc>,
        scheduled_by: impl Into<String>,
    ) -> Self {
        Self {
            id,
            scenario_id,
            queue: selected.clone(),
            selected,
            state,
            ordered_at,
            scheduled_by: scheduled_by.into(),
        }
    }

    /// A copy of this plan in state `next`
    ///
    /// # Errors
    ///
    /// Returns error if the transition is not allowed
    pub fn transition(&self, next: PlanState) -> CoreResult<Plan> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::Validation {
                field: format!("plan {} state", self.id),
                reason: format!("cannot move from {} to {}", self.state, next),
            });
        }
        Ok(Plan {
            state: next,
            ..self.clone()
        })
    }

    /// A copy of this plan with the head of the queue removed.
    ///
    /// Returns the removed step alongside the new plan; `None` when the queue
    /// is already empty.
    #[must_use]
    pub fn advance(&self) -> (Option<StepId>, Plan) {
        let mut next = self.clone();
        let head = if next.queue.is_empty() {
            None
        } else {
            Some(next.queue.remove(0))
        };
        (head, next)
    }

    /// Step that runs next
    #[must_use]
    pub fn next_step(&self) -> Option<&StepId> {
        self.queue.first()
    }

    /// Whether every selected step has left the queue
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::Hash;

    fn sample(state: PlanState) -> Plan {
        let ids = ["a", "b", "c"]
            .iter()
            .map(|s| StepId::new(s).unwrap())
            .collect();
        Plan::new(
            PlanId::from_digest(&Hash::compute(b"sample")),
            ScenarioId::new("drill").unwrap(),
            ids,
            state,
            DateTime::<Utc>::UNIX_EPOCH,
            "tests",
        )
    }

    #[test]
    fn test_new_plan_queue_mirrors_selected() {
        let plan = sample(PlanState::Ready);
        assert_eq!(plan.queue, plan.selected);
    }

    #[test]
    fn test_advance_leaves_selected_untouched() {
        let plan = sample(PlanState::Active);
        let (head, next) = plan.advance();
        assert_eq!(head.unwrap().as_str(), "a");
        assert_eq!(next.queue.len(), 2);
        assert_eq!(next.selected.len(), 3);
        // original unchanged
        assert_eq!(plan.queue.len(), 3);
        assert_eq!(next.next_step().unwrap().as_str(), "b");
    }

    #[test]
    fn test_advance_empty_queue() {
        let (_, drained) = sample(PlanState::Active).advance();
        let (_, drained) = drained.advance();
        let (_, drained) = drained.advance();
        assert!(drained.is_drained());
        let (head, still) = drained.advance();
        assert!(head.is_none());
        assert!(still.is_drained());
    }

    #[test]
    fn test_allowed_transitions() {
        let plan = sample(PlanState::Ready);
        let active = plan.transition(PlanState::Active).unwrap();
        assert_eq!(active.state, PlanState::Active);
        assert_eq!(plan.state, PlanState::Ready);

        let cooling = active.transition(PlanState::Cooldown).unwrap();
        let resumed = cooling.transition(PlanState::Active).unwrap();
        let done = resumed.transition(PlanState::Completed).unwrap();
        assert!(done.state.is_terminal());
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(sample(PlanState::Completed).transition(PlanState::Active).is_err());
        assert!(sample(PlanState::Ready).transition(PlanState::Cooldown).is_err());
        assert!(sample(PlanState::Aborted).transition(PlanState::Ready).is_err());
        assert!(sample(PlanState::Active).transition(PlanState::Draft).is_err());
    }

    #[test]
    fn test_plan_serde_shape() {
        let json = serde_json::to_value(sample(PlanState::Cooldown)).unwrap();
        assert_eq!(json["state"], "cooldown");
        assert_eq!(json["scenarioId"], "drill");
        assert!(json["orderedAt"].is_string());
        assert_eq!(json["queue"].as_array().unwrap().len(), 3);
    }
}
