//! Template action contract
//!
//! An action receives its input as JSON, does its work inside
//! [`ActionContext`], and publishes named outputs. Side-effecting steps go
//! through [`ActionContext::checkpoint`] so a retried run with the same run
//! id skips whatever already succeeded.

use crate::error::{Result, ScaffolderError};
use async_trait::async_trait;
use scaffolder_checkpoint::{CheckpointExecutor, RunId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait TemplateAction: Send + Sync {
    /// Identifier used in templates, e.g. `publish:bitbucketCloud`
    fn id(&self) -> &str;

    fn description(&self) -> &str;

    /// Whether the action does something meaningful in a dry run
    fn supports_dry_run(&self) -> bool {
        false
    }

    async fn handle(&self, ctx: &mut ActionContext) -> Result<()>;
}

/// Action metadata for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionMetadata {
    pub id: String,
    pub description: String,
    pub supports_dry_run: bool,
}

/// Everything one action invocation sees
pub struct ActionContext {
    input: Value,
    workspace_path: PathBuf,
    dry_run: bool,
    executor: CheckpointExecutor,
    outputs: Map<String, Value>,
}

impl ActionContext {
    pub fn new(input: Value, workspace_path: impl Into<PathBuf>, executor: CheckpointExecutor) -> Self {
        Self {
            input,
            workspace_path: workspace_path.into(),
            dry_run: false,
            executor,
            outputs: Map::new(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    /// Deserialize the raw input into the action's typed input struct
    pub fn parse_input<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.input.clone()).map_err(|e| ScaffolderError::Input(e.to_string()))
    }

    pub fn workspace_path(&self) -> &Path {
        &self.workspace_path
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn run_id(&self) -> &RunId {
        self.executor.run_id()
    }

    /// Run `step` once per run under `key`; see [`CheckpointExecutor::checkpoint`]
    pub async fn checkpoint<T, F, Fut>(&self, key: impl Into<String>, step: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.executor.checkpoint(key, step).await
    }

    pub fn output(&mut self, name: impl Into<String>, value: impl Serialize) -> Result<()> {
        self.outputs.insert(name.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    pub fn into_outputs(self) -> Map<String, Value> {
        self.outputs
    }
}

/// Run id for an invocation that was not given one: the action id plus the
/// `repoUrl` input, so retries of the same publish land in the same run.
pub fn derive_run_id(action_id: &str, input: &Value) -> Result<RunId> {
    let repo_url = input
        .get("repoUrl")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            ScaffolderError::Input(
                "cannot derive a run id without a repoUrl input; pass an explicit run id".to_string(),
            )
        })?;
    Ok(RunId::from_parts([action_id, repo_url])?)
}
