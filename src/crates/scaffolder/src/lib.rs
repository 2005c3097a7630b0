//! # scaffolder - Checkpointed publishing actions
//!
//! Template actions that create remote source-control resources and push
//! initial content:
//!
//! - `publish:bitbucketCloud` creates a Bitbucket Cloud repository and
//!   pushes the workspace as its first commit
//! - `gitlab:group:ensureExists` creates any missing groups along a GitLab
//!   group path
//!
//! Every external side effect runs through a
//! [`scaffolder_checkpoint::CheckpointExecutor`], so re-running a failed
//! action with the same run id resumes at the step that failed.
//!
//! ## Example
//!
//! ```rust,ignore
//! use scaffolder::{ActionContext, ActionRegistry, ScmIntegrations};
//! use scaffolder_checkpoint::{CheckpointExecutor, RunId, SqliteCheckpointStore};
//! use std::sync::Arc;
//! use utils::AppConfig;
//!
//! let config = Arc::new(AppConfig::load("app-config.yaml")?);
//! let integrations = Arc::new(ScmIntegrations::from_config(&config)?);
//! let registry = ActionRegistry::builtin(integrations, config)?;
//!
//! let store = Arc::new(SqliteCheckpointStore::connect("sqlite:state.db").await?);
//! let executor = CheckpointExecutor::new(store, RunId::new("bitbucket.org/acme/widget")?);
//! let mut ctx = ActionContext::new(input, "./workspace", executor);
//!
//! registry.execute("publish:bitbucketCloud", &mut ctx).await?;
//! println!("{}", serde_json::to_string_pretty(ctx.outputs())?);
//! ```

pub mod action;
pub mod actions;
pub mod error;
pub mod git;
pub mod integrations;
pub mod providers;
pub mod registry;
pub mod repo_url;

pub use action::{derive_run_id, ActionContext, ActionMetadata, TemplateAction};
pub use error::{Result, ScaffolderError};
pub use integrations::ScmIntegrations;
pub use registry::ActionRegistry;
pub use repo_url::{get_repo_source_directory, parse_repo_url, RepoSpec};
