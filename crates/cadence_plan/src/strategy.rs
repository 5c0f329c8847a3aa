//! Named ordering strategies.

use crate::graph::{build_graph, StepRecord};
use crate::topo::order_by_dependencies;
use cadence_core::{CoreError, StepId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a step list is turned into a run order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Input order, dependencies ignored
    Fifo,
    /// Longest expected duration first; stable on ties
    Criticality,
    /// Topological order over the step graph
    DependencyFirst,
    /// Currently identical to `DependencyFirst`; named separately so its
    /// policy can change without touching callers
    SlaAware,
}

impl Strategy {
    /// Every strategy, in declaration order
    pub const ALL: [Strategy; 4] = [
        Strategy::Fifo,
        Strategy::Criticality,
        Strategy::DependencyFirst,
        Strategy::SlaAware,
    ];

    /// Kebab-case name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fifo => "fifo",
            Self::Criticality => "criticality",
            Self::DependencyFirst => "dependency-first",
            Self::SlaAware => "sla-aware",
        }
    }

    /// Pick a strategy: an explicit one wins, otherwise `sla-aware` when the
    /// signal window count exceeds `sla_window_threshold`, else
    /// `dependency-first`.
    #[must_use]
    pub fn resolve(
        explicit: Option<Strategy>,
        signal_window_count: usize,
        sla_window_threshold: usize,
    ) -> Strategy {
        match explicit {
            Some(strategy) => strategy,
            None if signal_window_count > sla_window_threshold => Strategy::SlaAware,
            None => Strategy::DependencyFirst,
        }
    }

    /// Order `steps` under this strategy
    #[must_use]
    pub fn order(self, steps: &[StepRecord]) -> Vec<StepId> {
        match self {
            Self::Fifo => steps.iter().map(|s| s.id.clone()).collect(),
            Self::Criticality => {
                let mut sorted: Vec<&StepRecord> = steps.iter().collect();
                // sort_by is stable
                sorted.sort_by(|a, b| {
                    b.expected_duration_minutes
                        .total_cmp(&a.expected_duration_minutes)
                });
                sorted.into_iter().map(|s| s.id.clone()).collect()
            }
            Self::DependencyFirst | Self::SlaAware => order_by_dependencies(&build_graph(steps)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| {
                CoreError::validation(
                    "strategy",
                    format!(
                        "unknown strategy `{}`; expected one of fifo, criticality, dependency-first, sla-aware",
                        s
                    ),
                )
            })
    }
}
