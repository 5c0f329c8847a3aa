//! Stage definitions and the `Stage` trait.

use crate::context::PluginContext;
use async_trait::async_trait;
use cadence_core::{StageId, Version};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Result of one stage invocation
pub type StageResult<T> = Result<T, StageFailure>;

/// A stage reported failure. Carried verbatim into the chain result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{}", .errors.join("; "))]
pub struct StageFailure {
    /// Error messages, most significant first
    pub errors: Vec<String>,
}

impl StageFailure {
    /// Failure with a single message
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }

    /// Failure with several messages
    #[must_use]
    pub fn many(errors: Vec<String>) -> Self {
        Self { errors }
    }
}

/// Identity and declared dependencies of a stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Unique within a chain
    pub id: StageId,
    /// Human-readable name
    pub name: String,
    /// Free-form category, e.g. `transform` or `gate`
    pub kind: String,
    /// Stage version
    pub version: Version,
    /// Labels for filtering and reporting
    #[serde(default)]
    pub tags: Vec<String>,
    /// Stages that must appear earlier in the same chain
    #[serde(default)]
    pub dependencies: Vec<StageId>,
}

impl StageDefinition {
    /// Create a definition at version 0.1.0 with no tags or dependencies
    #[must_use]
    pub fn new(id: StageId, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: kind.into(),
            version: Version::default(),
            tags: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the version
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Add tags
    #[must_use]
    pub fn with_tags<T: Into<String>>(mut self, tags: impl IntoIterator<Item = T>) -> Self {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Add declared dependencies
    #[must_use]
    pub fn with_dependencies(mut self, dependencies: impl IntoIterator<Item = StageId>) -> Self {
        self.dependencies.extend(dependencies);
        self
    }

    /// Whether the stage carries a tag
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// One step of a processing chain.
///
/// `run` should be safe to retry: the same context and input give the same
/// outcome. Stages never see each other's state except through their input.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Input type
    type Input: Serialize + DeserializeOwned + Send + 'static;
    /// Output type
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Stage identity
    fn definition(&self) -> &StageDefinition;

    /// Transform the input
    async fn run(&self, ctx: &PluginContext, input: Self::Input) -> StageResult<Self::Output>;
}

/// A stage backed by a synchronous closure
pub struct FnStage<I, O, F> {
    definition: StageDefinition,
    f: F,
    _types: PhantomData<fn(I) -> O>,
}

impl<I, O, F> FnStage<I, O, F>
where
    F: Fn(&PluginContext, I) -> StageResult<O> + Send + Sync,
{
    /// Wrap a closure
    #[must_use]
    pub fn new(definition: StageDefinition, f: F) -> Self {
        Self {
            definition,
            f,
            _types: PhantomData,
        }
    }
}

impl<I, O, F> std::fmt::Debug for FnStage<I, O, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStage")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<I, O, F> Stage for FnStage<I, O, F>
where
    I: Serialize + DeserializeOwned + Send + 'static,
    O: Serialize + DeserializeOwned + Send + 'static,
    F: Fn(&PluginContext, I) -> StageResult<O> + Send + Sync,
{
    type Input = I;
    type Output = O;

    fn definition(&self) -> &StageDefinition {
        &self.definition
    }

    async fn run(&self, ctx: &PluginContext, input: I) -> StageResult<O> {
        (self.f)(ctx, input)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn def(id: &str) -> StageDefinition {
        StageDefinition::new(StageId::new(id).unwrap(), id, "transform")
    }

    pub fn add(id: &str, n: i64) -> impl Stage<Input = i64, Output = i64> + use<> {
        FnStage::new(def(id), move |_: &PluginContext, x: i64| Ok(x + n))
    }
}
