//! Audit trail and telemetry sinks.
//!
//! Every stage invocation appends one [`ExecutionRecord`]. Records are linked
//! by BLAKE3 digest: each digest covers the record's content and the previous
//! record's digest, so editing or dropping a record breaks the chain.

use crate::executor::ChainState;
use crate::monitor::RunMetrics;
use cadence_core::{Clock, Hash, RequestId, RunId, StageId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// How one stage invocation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StageOutcome {
    /// Returned a value
    Succeeded,
    /// Reported failure
    Failed {
        /// Reported errors
        errors: Vec<String>,
    },
    /// Panicked; converted to a failure
    Panicked {
        /// Panic payload text
        message: String,
    },
    /// Exceeded the stage time limit
    TimedOut {
        /// The limit that was hit
        after_ms: u64,
    },
}

impl StageOutcome {
    /// Whether the stage produced a value
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    fn digest_text(&self) -> String {
        match self {
            Self::Succeeded => "succeeded".to_string(),
            Self::Failed { errors } => format!("failed:{}", errors.join("\u{1f}")),
            Self::Panicked { message } => format!("panicked:{}", message),
            Self::TimedOut { after_ms } => format!("timed_out:{}", after_ms),
        }
    }
}

/// One stage invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Position in the trail, from zero
    pub sequence: u64,
    /// Stage invoked
    pub stage_id: StageId,
    /// Invocation start
    pub started_at: DateTime<Utc>,
    /// Invocation end
    pub finished_at: DateTime<Utc>,
    /// Value handed to the stage
    pub input: Value,
    /// Value returned, if any
    pub output: Option<Value>,
    /// How the invocation ended
    pub outcome: StageOutcome,
    /// Digest of the previous record, or the empty hash
    pub prior_digest: Hash,
    /// Digest of this record
    pub digest: Hash,
}

impl ExecutionRecord {
    fn compute_digest(&self) -> Hash {
        let sequence = self.sequence.to_string();
        let started = self.started_at.to_rfc3339();
        let finished = self.finished_at.to_rfc3339();
        let input = self.input.to_string();
        let output = self
            .output
            .as_ref()
            .map_or_else(String::new, Value::to_string);
        let outcome = self.outcome.digest_text();
        let prior = self.prior_digest.to_hex();
        Hash::compute_parts([
            prior.as_str(),
            sequence.as_str(),
            self.stage_id.as_str(),
            started.as_str(),
            finished.as_str(),
            input.as_str(),
            output.as_str(),
            outcome.as_str(),
        ])
    }
}

/// Audit chain verification failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuditError {
    /// A record does not point at its predecessor
    #[error("record {position} does not link to the previous record")]
    BrokenLink {
        /// Record position
        position: usize,
    },
    /// A record's content no longer matches its digest
    #[error("record {position} content does not match its digest")]
    DigestMismatch {
        /// Record position
        position: usize,
    },
    /// Sequence numbers are not contiguous
    #[error("record {position} has sequence {found}")]
    Sequence {
        /// Record position
        position: usize,
        /// Sequence number found
        found: u64,
    },
}

/// Ordered, hash-linked records of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    records: Vec<ExecutionRecord>,
}

impl AuditTrail {
    /// Empty trail
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, linking it to the current tip
    pub fn append(
        &mut self,
        stage_id: StageId,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        input: Value,
        output: Option<Value>,
        outcome: StageOutcome,
    ) -> &ExecutionRecord {
        let mut record = ExecutionRecord {
            sequence: self.records.len() as u64,
            stage_id,
            started_at,
            finished_at,
            input,
            output,
            outcome,
            prior_digest: self.tip(),
            digest: Hash::empty(),
        };
        record.digest = record.compute_digest();
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    /// Digest of the last record, or the empty hash
    #[must_use]
    pub fn tip(&self) -> Hash {
        self.records.last().map_or_else(Hash::empty, |r| r.digest)
    }

    /// Records in invocation order
    #[must_use]
    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Recompute every digest and link
    ///
    /// # Errors
    ///
    /// Returns the first record that does not check out
    pub fn verify(&self) -> Result<(), AuditError> {
        let mut prior = Hash::empty();
        for (position, record) in self.records.iter().enumerate() {
            if record.sequence != position as u64 {
                return Err(AuditError::Sequence {
                    position,
                    found: record.sequence,
                });
            }
            if record.prior_digest != prior {
                return Err(AuditError::BrokenLink { position });
            }
            if record.compute_digest() != record.digest {
                return Err(AuditError::DigestMismatch { position });
            }
            prior = record.digest;
        }
        Ok(())
    }
}

/// Everything a sink receives about one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Run identifier
    pub run_id: RunId,
    /// Tenant from the context
    pub tenant_id: TenantId,
    /// Request from the context
    pub request_id: RequestId,
    /// Final state
    pub state: ChainState,
    /// Errors that ended the run, empty on success
    pub errors: Vec<String>,
    /// Stage records
    pub audit: AuditTrail,
    /// Counters
    pub metrics: RunMetrics,
    /// When the report was produced
    pub generated_at: DateTime<Utc>,
}

impl RunReport {
    /// Whether the run succeeded
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.state == ChainState::Succeeded
    }
}

/// Receives a report after every run, completed or abandoned
pub trait TelemetrySink: Send + Sync {
    /// Take a finished run's report
    fn publish(&self, report: &RunReport);
}

/// Discards reports
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish(&self, _report: &RunReport) {}
}

/// Keeps reports in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: Mutex<Vec<RunReport>>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports received so far
    #[must_use]
    pub fn reports(&self) -> Vec<RunReport> {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of reports received
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether nothing was received
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TelemetrySink for MemorySink {
    fn publish(&self, report: &RunReport) {
        self.reports
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report.clone());
    }
}

/// Emits a summary event per report
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn publish(&self, report: &RunReport) {
        if report.succeeded() {
            info!(
                run = %report.run_id,
                tenant = %report.tenant_id,
                stages = report.audit.len(),
                wall_ms = report.metrics.total_stage_millis,
                "chain run succeeded"
            );
        } else {
            warn!(
                run = %report.run_id,
                tenant = %report.tenant_id,
                stages = report.audit.len(),
                errors = ?report.errors,
                "chain run failed"
            );
        }
    }
}

/// Holds the trail of a run in progress and guarantees the sink hears about
/// it exactly once: through [`AuditScope::finish`], or on drop if the run
/// never finished.
pub(crate) struct AuditScope {
    run_id: RunId,
    tenant_id: TenantId,
    request_id: RequestId,
    trail: AuditTrail,
    metrics: RunMetrics,
    state: ChainState,
    sink: Arc<dyn TelemetrySink>,
    clock: Arc<dyn Clock>,
    published: bool,
}

impl AuditScope {
    pub(crate) fn open(
        run_id: RunId,
        tenant_id: TenantId,
        request_id: RequestId,
        sink: Arc<dyn TelemetrySink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            run_id,
            tenant_id,
            request_id,
            trail: AuditTrail::new(),
            metrics: RunMetrics::new(),
            state: ChainState::Pending,
            sink,
            clock,
            published: false,
        }
    }

    pub(crate) fn trail_mut(&mut self) -> &mut AuditTrail {
        &mut self.trail
    }

    pub(crate) fn metrics_mut(&mut self) -> &mut RunMetrics {
        &mut self.metrics
    }

    pub(crate) fn state(&self) -> ChainState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ChainState) {
        self.state = state;
    }

    /// Publish and hand back the report
    pub(crate) fn finish(mut self, state: ChainState, errors: Vec<String>) -> RunReport {
        self.state = state;
        let report = self.report(errors);
        self.sink.publish(&report);
        self.published = true;
        report
    }

    fn report(&mut self, errors: Vec<String>) -> RunReport {
        RunReport {
            run_id: self.run_id,
            tenant_id: self.tenant_id.clone(),
            request_id: self.request_id.clone(),
            state: self.state,
            errors,
            audit: std::mem::take(&mut self.trail),
            metrics: std::mem::take(&mut self.metrics),
            generated_at: self.clock.now(),
        }
    }
}

impl Drop for AuditScope {
    fn drop(&mut self) {
        if self.published {
            return;
        }
        warn!(run = %self.run_id, state = ?self.state, "chain run dropped before completion");
        self.state = self.state.fail();
        let report = self.report(vec!["run dropped before completion".to_string()]);
        self.sink.publish(&report);
        self.published = true;
    }
}
