//! Synthetic execution-window timelines.
//!
//! Frames are derived from plan identity and strategy name only. They carry
//! no execution telemetry.

use crate::config::ComposerConfig;
use crate::plan::Plan;
use crate::strategy::Strategy;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What a window is for; alternates starting with `Schedule`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStage {
    /// Even index
    Schedule,
    /// Odd index
    Execute,
}

/// One execution-window marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineFrame {
    /// Position in the timeline
    pub index: usize,
    /// Window start
    pub at: DateTime<Utc>,
    /// Window purpose
    pub stage: FrameStage,
    /// `planId:selected:queue:state:window:index:strategy=name`
    pub signature: String,
}

/// Build a timeline with default settings: `limit` frames at most, 60 seconds
/// apart, never fewer than 6
#[must_use]
pub fn build_plan_timeline(
    plan: &Plan,
    start_at: DateTime<Utc>,
    strategy: Strategy,
    limit: usize,
) -> Vec<TimelineFrame> {
    build_plan_timeline_with(&ComposerConfig::default(), plan, start_at, strategy, limit)
}

/// Build a timeline using the spacing and floor from `config`.
///
/// Frame count is `selected.len() + 1` clamped to `[min_frames, limit]`; the
/// floor wins when `limit` is below it. Frames stop early at the last
/// instant `DateTime<Utc>` can represent.
#[must_use]
pub fn build_plan_timeline_with(
    config: &ComposerConfig,
    plan: &Plan,
    start_at: DateTime<Utc>,
    strategy: Strategy,
    limit: usize,
) -> Vec<TimelineFrame> {
    let ceiling = limit.max(config.min_frames);
    let count = (plan.selected.len() + 1).clamp(config.min_frames, ceiling);
    let interval = Duration::try_seconds(config.frame_interval_secs);

    let mut frames = Vec::with_capacity(count);
    let mut at = start_at;
    for index in 0..count {
        let stage = if index % 2 == 0 {
            FrameStage::Schedule
        } else {
            FrameStage::Execute
        };
        frames.push(TimelineFrame {
            index,
            at,
            stage,
            signature: frame_signature(plan, index, strategy),
        });
        match interval.and_then(|step| at.checked_add_signed(step)) {
            Some(next) => at = next,
            None => break,
        }
    }
    frames
}

fn frame_signature(plan: &Plan, index: usize, strategy: Strategy) -> String {
    format!(
        "{}:{}:{}:{}:window:{}:strategy={}",
        plan.id,
        plan.selected.len(),
        plan.queue.len(),
        plan.state,
        index,
        strategy
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanState;
    use cadence_core::{Hash, PlanId, ScenarioId, StepId};

    fn plan_with(steps: usize) -> Plan {
        let ids = (0..steps)
            .map(|i| StepId::new(format!("s{}", i)).unwrap())
            .collect();
        Plan::new(
            PlanId::from_digest(&Hash::compute(b"timeline")),
            ScenarioId::new("drill").unwrap(),
            ids,
            PlanState::Ready,
            DateTime::<Utc>::UNIX_EPOCH,
            "tests",
        )
    }

    #[test]
    fn test_floor_of_six_frames() {
        let frames = build_plan_timeline(&plan_with(1), DateTime::<Utc>::UNIX_EPOCH, Strategy::Fifo, 20);
        assert_eq!(frames.len(), 6);
    }

    #[test]
    fn test_step_count_plus_one() {
        let frames = build_plan_timeline(&plan_with(9), DateTime::<Utc>::UNIX_EPOCH, Strategy::Fifo, 20);
        assert_eq!(frames.len(), 10);
    }

    #[test]
    fn test_limit_caps_frames() {
        let frames = build_plan_timeline(&plan_with(40), DateTime::<Utc>::UNIX_EPOCH, Strategy::Fifo, 12);
        assert_eq!(frames.len(), 12);
    }

    #[test]
    fn test_floor_wins_over_small_limit() {
        let frames = build_plan_timeline(&plan_with(40), DateTime::<Utc>::UNIX_EPOCH, Strategy::Fifo, 2);
        assert_eq!(frames.len(), 6);
    }

    #[test]
    fn test_frames_spaced_and_alternating() {
        let start = DateTime::<Utc>::UNIX_EPOCH + Duration::hours(3);
        let frames = build_plan_timeline(&plan_with(7), start, Strategy::SlaAware, 20);
        assert_eq!(frames[0].at, start);
        for pair in frames.windows(2) {
            assert_eq!(pair[1].at - pair[0].at, Duration::seconds(60));
        }
        assert!(frames.iter().all(|f| (f.index % 2 == 0) == (f.stage == FrameStage::Schedule)));
    }

    #[test]
    fn test_signature_format() {
        let plan = plan_with(3);
        let frames = build_plan_timeline(&plan, DateTime::<Utc>::UNIX_EPOCH, Strategy::DependencyFirst, 20);
        assert_eq!(
            frames[4].signature,
            format!("{}:3:3:ready:window:4:strategy=dependency-first", plan.id)
        );
    }

    #[test]
    fn test_custom_spacing() {
        let config = ComposerConfig {
            frame_interval_secs: 5,
            min_frames: 2,
            ..ComposerConfig::default()
        };
        let frames = build_plan_timeline_with(
            &config,
            &plan_with(0),
            DateTime::<Utc>::UNIX_EPOCH,
            Strategy::Fifo,
            20,
        );
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].at - frames[0].at, Duration::seconds(5));
    }

    #[test]
    fn test_frames_stop_at_representable_end() {
        let near_end = DateTime::<Utc>::MAX_UTC - Duration::seconds(150);
        let frames = build_plan_timeline(&plan_with(3), near_end, Strategy::Fifo, 20);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].at, near_end + Duration::seconds(120));

        let config = ComposerConfig {
            frame_interval_secs: i64::MAX,
            ..ComposerConfig::default()
        };
        let frames = build_plan_timeline_with(
            &config,
            &plan_with(3),
            DateTime::<Utc>::UNIX_EPOCH,
            Strategy::Fifo,
            20,
        );
        assert_eq!(frames.len(), 1);
    }
}
