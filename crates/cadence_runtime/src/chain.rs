//! Typed stage chains.
//!
//! `Chain<I, O>` only grows through [`Chain::then`], which requires the next
//! stage's input to be the current output type, so a mismatched chain does
//! not compile. Internally stages are stored type-erased over JSON values so
//! every input and output can be written to the audit trail.

use crate::context::PluginContext;
use crate::stage::{Stage, StageDefinition, StageFailure, StageResult};
use async_trait::async_trait;
use cadence_core::StageId;
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Chain rejected before execution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// Two stages share an id
    #[error("stage id {id} appears at positions {first} and {second}")]
    DuplicateStage {
        /// Repeated id
        id: StageId,
        /// First position
        first: usize,
        /// Later position
        second: usize,
    },
    /// A declared dependency is not in the chain
    #[error("stage {stage} depends on {dependency}, which is not in the chain")]
    UnknownDependency {
        /// Declaring stage
        stage: StageId,
        /// Missing dependency
        dependency: StageId,
    },
    /// A declared dependency runs at or after the declaring stage
    #[error("stage {stage} depends on {dependency}, which does not run before it")]
    DependencyNotBefore {
        /// Declaring stage
        stage: StageId,
        /// Misplaced dependency
        dependency: StageId,
    },
}

/// Object-safe view of a stage over JSON values
#[async_trait]
pub(crate) trait ErasedStage: Send + Sync {
    fn definition(&self) -> &StageDefinition;

    async fn run_value(&self, ctx: &PluginContext, input: Value) -> StageResult<Value>;
}

struct Erased<S>(S);

#[async_trait]
impl<S: Stage> ErasedStage for Erased<S> {
    fn definition(&self) -> &StageDefinition {
        self.0.definition()
    }

    async fn run_value(&self, ctx: &PluginContext, input: Value) -> StageResult<Value> {
        let id = &self.0.definition().id;
        let input: S::Input = serde_json::from_value(input)
            .map_err(|e| StageFailure::new(format!("stage {} could not decode its input: {}", id, e)))?;
        let output = self.0.run(ctx, input).await?;
        serde_json::to_value(output)
            .map_err(|e| StageFailure::new(format!("stage {} could not encode its output: {}", id, e)))
    }
}

/// An ordered list of stages taking `I` to `O`
pub struct Chain<I, O> {
    stages: Vec<Arc<dyn ErasedStage>>,
    _types: PhantomData<fn(I) -> O>,
}

impl<T> Chain<T, T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// A chain with no stages; executing it returns the seed
    #[must_use]
    pub fn empty() -> Self {
        Self {
            stages: Vec::new(),
            _types: PhantomData,
        }
    }
}

impl<I, O> Chain<I, O>
where
    I: Serialize + DeserializeOwned + Send + 'static,
    O: Serialize + DeserializeOwned + Send + 'static,
{
    /// A chain of one stage
    #[must_use]
    pub fn new<S>(stage: S) -> Self
    where
        S: Stage<Input = I, Output = O> + 'static,
    {
        Self {
            stages: vec![Arc::new(Erased(stage))],
            _types: PhantomData,
        }
    }

    /// Append a stage that consumes this chain's output
    #[must_use]
    pub fn then<S>(self, stage: S) -> Chain<I, S::Output>
    where
        S: Stage<Input = O> + 'static,
    {
        let mut stages = self.stages;
        stages.push(Arc::new(Erased(stage)));
        Chain {
            stages,
            _types: PhantomData,
        }
    }

    /// Number of stages
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the chain has no stages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage definitions in run order
    pub fn definitions(&self) -> impl Iterator<Item = &StageDefinition> {
        self.stages.iter().map(|s| s.definition())
    }

    /// Stage ids in run order
    #[must_use]
    pub fn stage_ids(&self) -> Vec<StageId> {
        self.definitions().map(|d| d.id.clone()).collect()
    }

    /// Check stage ids are unique and every declared dependency runs earlier
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in stage order
    pub fn validate(&self) -> Result<(), ChainError> {
        let mut positions: IndexMap<&StageId, usize> = IndexMap::with_capacity(self.stages.len());
        for (index, definition) in self.definitions().enumerate() {
            if let Some(&first) = positions.get(&definition.id) {
                return Err(ChainError::DuplicateStage {
                    id: definition.id.clone(),
                    first,
                    second: index,
                });
            }
            positions.insert(&definition.id, index);
        }

        for (index, definition) in self.definitions().enumerate() {
            for dependency in &definition.dependencies {
                match positions.get(dependency) {
                    None => {
                        return Err(ChainError::UnknownDependency {
                            stage: definition.id.clone(),
                            dependency: dependency.clone(),
                        })
                    }
                    Some(&at) if at >= index => {
                        return Err(ChainError::DependencyNotBefore {
                            stage: definition.id.clone(),
                            dependency: dependency.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }

    pub(crate) fn stages(&self) -> &[Arc<dyn ErasedStage>] {
        &self.stages
    }
}

impl<I, O> Clone for Chain<I, O> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
            _types: PhantomData,
        }
    }
}

impl<I, O> std::fmt::Debug for Chain<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.definition().id.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
