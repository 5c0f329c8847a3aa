//! Executor configuration.

use cadence_core::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for [`crate::ChainExecutor`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Namespace given to contexts built by the executor
    pub default_namespace: String,
    /// Per-stage time limit; `None` lets stages run unbounded
    pub stage_timeout_ms: Option<u64>,
    /// Turn stage panics into failures instead of unwinding through the caller
    pub capture_panics: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_namespace: "default".to_string(),
            stage_timeout_ms: None,
            capture_panics: true,
        }
    }
}

impl ExecutorConfig {
    /// Parse from JSON; missing fields take their defaults
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or the values are invalid
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    ///
    /// # Errors
    ///
    /// Returns the first invalid field
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_namespace.trim().is_empty() {
            return Err(CoreError::validation(
                "default_namespace",
                "must not be empty",
            ));
        }
        if self.stage_timeout_ms == Some(0) {
            return Err(CoreError::validation(
                "stage_timeout_ms",
                "must be positive when set",
            ));
        }
        Ok(())
    }

    /// Per-stage time limit
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }

    /// Set the per-stage time limit
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }
}
