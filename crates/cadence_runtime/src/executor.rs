//! Sequential chain executor.
//!
//! Runs the stages of a [`Chain`] one at a time against a seed input. Every
//! invocation is recorded; the first stage that does not return a value ends
//! the run, and its errors become the run's errors. Stage failures, panics,
//! timeouts and cancellation are all returned as values.

use crate::audit::{AuditScope, NullSink, RunReport, StageOutcome, TelemetrySink};
use crate::chain::{Chain, ChainError, ErasedStage};
use crate::config::ExecutorConfig;
use crate::context::PluginContext;
use crate::stage::StageResult;
use cadence_core::{Clock, RequestId, RunId, SystemClock, TenantId};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where a run is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChainState {
    /// Not started
    Pending,
    /// Invoking the stage at `stage_index`
    Running {
        /// Position of the stage in the chain
        stage_index: usize,
    },
    /// Every stage returned a value
    Succeeded,
    /// A stage did not return a value, or the run stopped before one
    Failed {
        /// Stage that ended the run; `None` if none had started
        stage_index: Option<usize>,
    },
}

impl ChainState {
    /// Whether the run is over
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }

    /// Move to running the stage at `stage_index`
    #[must_use]
    pub const fn begin(self, stage_index: usize) -> Self {
        if self.is_terminal() {
            return self;
        }
        Self::Running { stage_index }
    }

    /// Move to `Succeeded`
    #[must_use]
    pub const fn succeed(self) -> Self {
        if self.is_terminal() {
            return self;
        }
        Self::Succeeded
    }

    /// Move to `Failed`, remembering the running stage
    #[must_use]
    pub const fn fail(self) -> Self {
        match self {
            Self::Pending => Self::Failed { stage_index: None },
            Self::Running { stage_index } => Self::Failed {
                stage_index: Some(stage_index),
            },
            terminal => terminal,
        }
    }
}

/// Terminal value of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainResult<O> {
    /// Whether every stage returned a value
    pub ok: bool,
    /// Final output, present when `ok`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<O>,
    /// Errors of the stage that ended the run, empty when `ok`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// When the result was produced
    pub generated_at: DateTime<Utc>,
}

impl<O> ChainResult<O> {
    /// A successful result
    #[must_use]
    pub fn success(value: O, generated_at: DateTime<Utc>) -> Self {
        Self {
            ok: true,
            value: Some(value),
            errors: Vec::new(),
            generated_at,
        }
    }

    /// A failed result
    #[must_use]
    pub fn failure(errors: Vec<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            ok: false,
            value: None,
            errors,
            generated_at,
        }
    }

    /// Value on success, errors otherwise
    ///
    /// # Errors
    ///
    /// Returns the run's errors if it failed
    pub fn into_result(self) -> Result<O, Vec<String>> {
        match self.value {
            Some(value) if self.ok => Ok(value),
            _ => Err(self.errors),
        }
    }
}

/// Typed result plus the report the sink received
#[derive(Debug, Clone)]
pub struct ChainReport<O> {
    /// Typed outcome
    pub result: ChainResult<O>,
    /// Audit trail, metrics and final state
    pub run: RunReport,
}

impl<O> ChainReport<O> {
    /// Run identifier
    #[must_use]
    pub fn run_id(&self) -> RunId {
        self.run.run_id
    }

    /// Final state
    #[must_use]
    pub fn state(&self) -> ChainState {
        self.run.state
    }
}

enum Invocation {
    Completed(StageResult<Value>),
    Panicked(String),
    TimedOut(Duration),
}

/// Runs chains
pub struct ChainExecutor {
    config: ExecutorConfig,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn TelemetrySink>,
}

impl ChainExecutor {
    /// Executor with the system clock and no telemetry
    #[must_use]
    pub fn new(config: ExecutorConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            sink: Arc::new(NullSink),
        }
    }

    /// Use a different clock for timestamps
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Send run reports to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn TelemetrySink>) -> Self {
        self.sink = sink;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Build a context in the configured namespace, started now
    #[must_use]
    pub fn context(&self, tenant_id: TenantId, request_id: RequestId) -> PluginContext {
        PluginContext::new(
            tenant_id,
            request_id,
            self.config.default_namespace.clone(),
            self.clock.now(),
        )
    }

    /// Run `chain` against `seed`
    ///
    /// # Errors
    ///
    /// Returns error if the chain is malformed; nothing runs in that case
    pub async fn execute<I, O>(
        &self,
        chain: &Chain<I, O>,
        ctx: &PluginContext,
        seed: I,
    ) -> Result<ChainReport<O>, ChainError>
    where
        I: Serialize + DeserializeOwned + Send + 'static,
        O: Serialize + DeserializeOwned + Send + 'static,
    {
        self.execute_with_cancel(chain, ctx, seed, &CancellationToken::new())
            .await
    }

    /// Run `chain` against `seed`, checking `cancel` before each stage
    ///
    /// # Errors
    ///
    /// Returns error if the chain is malformed; nothing runs in that case
    pub async fn execute_with_cancel<I, O>(
        &self,
        chain: &Chain<I, O>,
        ctx: &PluginContext,
        seed: I,
        cancel: &CancellationToken,
    ) -> Result<ChainReport<O>, ChainError>
    where
        I: Serialize + DeserializeOwned + Send + 'static,
        O: Serialize + DeserializeOwned + Send + 'static,
    {
        chain.validate()?;

        let run_id = RunId::new();
        let mut scope = AuditScope::open(
            run_id,
            ctx.tenant_id.clone(),
            ctx.request_id.clone(),
            self.sink.clone(),
            self.clock.clone(),
        );
        info!(run = %run_id, tenant = %ctx.tenant_id, stages = chain.len(), "chain run started");

        let mut current = match serde_json::to_value(seed) {
            Ok(value) => value,
            Err(e) => {
                return Ok(self.fail(scope, vec![format!("seed input could not be encoded: {}", e)]));
            }
        };

        for (index, stage) in chain.stages().iter().enumerate() {
            let stage_id = stage.definition().id.clone();

            if cancel.is_cancelled() {
                info!(run = %run_id, stage = %stage_id, "chain run cancelled");
                return Ok(self.fail(scope, vec![format!("cancelled before stage {}", stage_id)]));
            }

            scope.set_state(scope.state().begin(index));
            debug!(run = %run_id, stage = %stage_id, index, "stage started");

            let started_at = self.clock.now();
            let started = Instant::now();
            let invocation = self.invoke(stage.as_ref(), ctx, current.clone()).await;
            let finished_at = self.clock.now();
            scope.metrics_mut().record_invocation(started.elapsed());

            let (outcome, output, errors) = match invocation {
                Invocation::Completed(Ok(value)) => {
                    scope.metrics_mut().record_success();
                    (StageOutcome::Succeeded, Some(value), Vec::new())
                }
                Invocation::Completed(Err(failure)) => {
                    scope.metrics_mut().record_failure();
                    let mut errors = failure.errors;
                    if errors.is_empty() {
                        errors.push(format!("stage {} failed without detail", stage_id));
                    }
                    (
                        StageOutcome::Failed {
                            errors: errors.clone(),
                        },
                        None,
                        errors,
                    )
                }
                Invocation::Panicked(message) => {
                    scope.metrics_mut().record_panic();
                    let error = format!("stage {} panicked: {}", stage_id, message);
                    (StageOutcome::Panicked { message }, None, vec![error])
                }
                Invocation::TimedOut(limit) => {
                    scope.metrics_mut().record_timeout();
                    let after_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
                    let error = format!("stage {} timed out after {}ms", stage_id, after_ms);
                    (StageOutcome::TimedOut { after_ms }, None, vec![error])
                }
            };

            scope.trail_mut().append(
                stage_id.clone(),
                started_at,
                finished_at,
                current,
                output.clone(),
                outcome,
            );

            match output {
                Some(value) => {
                    debug!(run = %run_id, stage = %stage_id, "stage finished");
                    current = value;
                }
                None => {
                    warn!(run = %run_id, stage = %stage_id, ?errors, "stage failed; stopping chain");
                    return Ok(self.fail(scope, errors));
                }
            }
        }

        match serde_json::from_value::<O>(current) {
            Ok(value) => {
                let state = scope.state().succeed();
                let run = scope.finish(state, Vec::new());
                info!(run = %run_id, "chain run succeeded");
                Ok(ChainReport {
                    result: ChainResult::success(value, run.generated_at),
                    run,
                })
            }
            Err(e) => Ok(self.fail(scope, vec![format!("chain output could not be decoded: {}", e)])),
        }
    }

    fn fail<O>(&self, scope: AuditScope, errors: Vec<String>) -> ChainReport<O> {
        let state = scope.state().fail();
        let run = scope.finish(state, errors.clone());
        ChainReport {
            result: ChainResult::failure(errors, run.generated_at),
            run,
        }
    }

    async fn invoke(&self, stage: &dyn ErasedStage, ctx: &PluginContext, input: Value) -> Invocation {
        let capture_panics = self.config.capture_panics;
        let guarded = async move {
            let run = stage.run_value(ctx, input);
            if capture_panics {
                match AssertUnwindSafe(run).catch_unwind().await {
                    Ok(result) => Invocation::Completed(result),
                    Err(payload) => Invocation::Panicked(panic_message(payload.as_ref())),
                }
            } else {
                Invocation::Completed(run.await)
            }
        };

        match self.config.stage_timeout() {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .unwrap_or(Invocation::TimedOut(limit)),
            None => guarded.await,
        }
    }
}

impl Default for ChainExecutor {
    fn default() -> Self {
        Self::new(ExecutorConfig::default())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
