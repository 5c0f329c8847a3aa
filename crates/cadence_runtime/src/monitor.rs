//! Per-run metrics.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stage counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Stages invoked
    pub stages_invoked: u64,
    /// Stages that returned a value
    pub stages_succeeded: u64,
    /// Stages that reported failure
    pub stages_failed: u64,
    /// Stages that panicked
    pub stages_panicked: u64,
    /// Stages cut off by the time limit
    pub stages_timed_out: u64,
    /// Wall time spent inside stages
    pub total_stage_millis: u64,
}

impl RunMetrics {
    /// Create new metrics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an invocation and the time it took
    pub fn record_invocation(&mut self, elapsed: Duration) {
        self.stages_invoked += 1;
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.total_stage_millis = self.total_stage_millis.saturating_add(millis);
    }

    /// Record a success
    pub fn record_success(&mut self) {
        self.stages_succeeded += 1;
    }

    /// Record a reported failure
    pub fn record_failure(&mut self) {
        self.stages_failed += 1;
    }

    /// Record a panic
    pub fn record_panic(&mut self) {
        self.stages_panicked += 1;
    }

    /// Record a timeout
    pub fn record_timeout(&mut self) {
        self.stages_timed_out += 1;
    }

    /// Get success rate (0.0 - 1.0)
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.stages_invoked == 0 {
            return 1.0;
        }
        self.stages_succeeded as f64 / self.stages_invoked as f64
    }

    /// Stages that did not return a value, for any reason
    #[must_use]
    pub fn unsuccessful(&self) -> u64 {
        self.stages_failed + self.stages_panicked + self.stages_timed_out
    }
}
