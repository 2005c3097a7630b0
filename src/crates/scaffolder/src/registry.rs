//! Action registry

use crate::action::{ActionContext, ActionMetadata, TemplateAction};
use crate::actions::{GitlabGroupEnsureExistsAction, PublishBitbucketCloudAction};
use crate::error::{Result, ScaffolderError};
use crate::integrations::ScmIntegrations;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use utils::{AppConfig, ClientConfig, HttpClient};

/// Registered actions, keyed by id
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn TemplateAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self {
            actions: HashMap::new(),
        }
    }

    /// Registry holding `publish:bitbucketCloud` and `gitlab:group:ensureExists`
    pub fn builtin(integrations: Arc<ScmIntegrations>, config: Arc<AppConfig>) -> Result<Self> {
        let http = Arc::new(HttpClient::new(
            ClientConfig::new()
                .with_timeout(Duration::from_secs(60))
                .with_max_retries(3)
                .with_user_agent(concat!("scaffolder/", env!("CARGO_PKG_VERSION"))),
        )?);
        Ok(Self::with_http(integrations, config, http))
    }

    /// Built-in actions sharing the given HTTP client
    pub fn with_http(integrations: Arc<ScmIntegrations>, config: Arc<AppConfig>, http: Arc<HttpClient>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PublishBitbucketCloudAction::new(
            integrations.clone(),
            config,
            http.clone(),
        )));
        registry.register(Arc::new(GitlabGroupEnsureExistsAction::new(integrations, http)));
        registry
    }

    pub fn register(&mut self, action: Arc<dyn TemplateAction>) {
        self.actions.insert(action.id().to_string(), action);
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn TemplateAction>> {
        self.actions.get(id).cloned()
    }

    /// Registered ids, sorted
    pub fn list_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.actions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn list_metadata(&self) -> Vec<ActionMetadata> {
        self.list_ids()
            .into_iter()
            .filter_map(|id| self.actions.get(&id))
            .map(|action| ActionMetadata {
                id: action.id().to_string(),
                description: action.description().to_string(),
                supports_dry_run: action.supports_dry_run(),
            })
            .collect()
    }

    /// Run the action `id`. In a dry run, actions without dry-run support are skipped.
    pub async fn execute(&self, id: &str, ctx: &mut ActionContext) -> Result<()> {
        let action = self
            .get(id)
            .ok_or_else(|| ScaffolderError::ActionNotFound(id.to_string()))?;

        if ctx.is_dry_run() && !action.supports_dry_run() {
            tracing::info!("Skipping {} in dry run, action does not support it", id);
            return Ok(());
        }

        let span = tracing::info_span!("action", id = %id, run_id = %ctx.run_id());
        async {
            tracing::info!("Running action");
            let result = action.handle(ctx).await;
            match &result {
                Ok(()) => tracing::info!("Action completed"),
                Err(e) => tracing::warn!("Action failed: {}", e),
            }
            result
        }
        .instrument(span)
        .await
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use scaffolder_checkpoint::{CheckpointExecutor, InMemoryCheckpointStore, RunId};
    use serde_json::json;

    struct EchoAction;

    #[async_trait]
    impl TemplateAction for EchoAction {
        fn id(&self) -> &str {
            "debug:echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        async fn handle(&self, ctx: &mut ActionContext) -> Result<()> {
            let input = ctx.input().clone();
            ctx.output("echo", input)
        }
    }

    fn context(dry_run: bool) -> ActionContext {
        let store = Arc::new(InMemoryCheckpointStore::new());
        let executor = CheckpointExecutor::new(store, RunId::new("registry-test").unwrap());
        ActionContext::new(json!({"message": "hi"}), "/tmp", executor).with_dry_run(dry_run)
    }

    #[test]
    fn test_builtin_actions() {
        let registry =
            ActionRegistry::builtin(Arc::new(ScmIntegrations::default()), Arc::new(AppConfig::empty())).unwrap();

        assert_eq!(
            registry.list_ids(),
            vec!["gitlab:group:ensureExists", "publish:bitbucketCloud"]
        );
        let metadata = registry.list_metadata();
        assert!(metadata[0].supports_dry_run);
        assert!(!metadata[1].supports_dry_run);
    }

    #[tokio::test]
    async fn test_execute_registered_action() {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(EchoAction));

        let mut ctx = context(false);
        registry.execute("debug:echo", &mut ctx).await.unwrap();
        assert_eq!(ctx.outputs()["echo"], json!({"message": "hi"}));
    }

    #[tokio::test]
    async fn test_dry_run_skips_unsupported_action() {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(EchoAction));

        let mut ctx = context(true);
        registry.execute("debug:echo", &mut ctx).await.unwrap();
        assert!(ctx.outputs().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_action() {
        let registry = ActionRegistry::new();
        let err = registry.execute("missing:action", &mut context(false)).await.unwrap_err();
        assert!(matches!(err, ScaffolderError::ActionNotFound(_)));
    }

    #[tokio::test]
    async fn test_gitlab_dry_run_reports_placeholder_group() {
        let registry =
            ActionRegistry::builtin(Arc::new(ScmIntegrations::default()), Arc::new(AppConfig::empty())).unwrap();

        let store = Arc::new(InMemoryCheckpointStore::new());
        let executor = CheckpointExecutor::new(store, RunId::new("registry-test").unwrap());
        let input = json!({"repoUrl": "gitlab.com?repo=widget", "path": ["platform"]});
        let mut ctx = ActionContext::new(input, "/tmp", executor).with_dry_run(true);

        registry.execute("gitlab:group:ensureExists", &mut ctx).await.unwrap();
        assert_eq!(ctx.outputs()["groupId"], json!(42));
    }
}
