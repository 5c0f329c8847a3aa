//! Per-run plugin context.

use cadence_core::{RequestId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Read-only facts shared by every stage of one run.
///
/// Built once per execution and handed to stages by shared reference, so no
/// stage can change what a later stage sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginContext {
    /// Tenant the run belongs to
    pub tenant_id: TenantId,
    /// Caller correlation id
    pub request_id: RequestId,
    /// Namespace stages operate in
    pub namespace: String,
    /// When the run began
    pub started_at: DateTime<Utc>,
    /// Free-form stage configuration
    #[serde(default)]
    pub config: serde_json::Value,
}

impl PluginContext {
    /// Create a context with empty stage configuration
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        request_id: RequestId,
        namespace: impl Into<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            request_id,
            namespace: namespace.into(),
            started_at,
            config: serde_json::Value::Null,
        }
    }

    /// Attach stage configuration
    #[must_use]
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    /// Look up a top-level configuration entry
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&serde_json::Value> {
        self.config.get(key)
    }
}
