//! `gitlab:group:ensureExists`
//!
//! Walks a group path from the top and creates every group that does not
//! exist yet. Each creation is checkpointed under
//! `ensure.{name}.{slug}.{parentId}` (`null` for a top-level group), so a
//! retried run never creates the same group twice.

use crate::action::{ActionContext, TemplateAction};
use crate::error::{Result, ScaffolderError};
use crate::integrations::ScmIntegrations;
use crate::providers::gitlab::GitlabClient;
use crate::repo_url::parse_repo_url;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utils::HttpClient;

pub const ACTION_ID: &str = "gitlab:group:ensureExists";

/// Group id reported in dry runs
pub const DRY_RUN_GROUP_ID: u64 = 42;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathPart {
    pub name: String,
    pub slug: String,
}

/// One element of the `path` input: `"a/b"` or `{name, slug}`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PathItem {
    Path(String),
    Part(PathPart),
}

/// Flatten path items into groups, outermost first. A string item
/// contributes one group per `/`-separated segment, named after its slug.
pub fn expand_group_path(items: &[PathItem]) -> Vec<PathPart> {
    items
        .iter()
        .flat_map(|item| match item {
            PathItem::Path(path) => path
                .split('/')
                .map(|segment| PathPart {
                    name: segment.to_string(),
                    slug: segment.to_string(),
                })
                .collect::<Vec<_>>(),
            PathItem::Part(part) => vec![part.clone()],
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitlabGroupEnsureExistsInput {
    pub repo_url: String,
    pub token: Option<String>,
    pub path: Vec<PathItem>,
}

impl GitlabGroupEnsureExistsInput {
    pub fn validate(self) -> Result<Self> {
        if self.path.is_empty() {
            return Err(ScaffolderError::Input(
                "path must contain at least one group".to_string(),
            ));
        }
        Ok(self)
    }
}

pub struct GitlabGroupEnsureExistsAction {
    integrations: Arc<ScmIntegrations>,
    http: Arc<HttpClient>,
}

impl GitlabGroupEnsureExistsAction {
    pub fn new(integrations: Arc<ScmIntegrations>, http: Arc<HttpClient>) -> Self {
        Self { integrations, http }
    }
}

#[async_trait]
impl TemplateAction for GitlabGroupEnsureExistsAction {
    fn id(&self) -> &str {
        ACTION_ID
    }

    fn description(&self) -> &str {
        "Ensures a Gitlab group exists"
    }

    fn supports_dry_run(&self) -> bool {
        true
    }

    async fn handle(&self, ctx: &mut ActionContext) -> Result<()> {
        let input = ctx.parse_input::<GitlabGroupEnsureExistsInput>()?.validate()?;
        if ctx.is_dry_run() {
            ctx.output("groupId", DRY_RUN_GROUP_ID)?;
            return Ok(());
        }

        let spec = parse_repo_url(&input.repo_url)?;
        let client = GitlabClient::for_host(
            self.http.clone(),
            &self.integrations,
            &spec.host,
            input.token.as_deref(),
        )?;

        let mut current_path: Option<String> = None;
        let mut parent_id: Option<u64> = None;
        for part in expand_group_path(&input.path) {
            let full_path = match &current_path {
                Some(current) => format!("{}/{}", current, part.slug),
                None => part.slug.clone(),
            };

            let existing = client
                .search_groups(&full_path)
                .await?
                .into_iter()
                .find(|group| group.full_path == full_path);

            parent_id = match existing {
                Some(group) => Some(group.id),
                None => {
                    tracing::info!("creating missing group {}", full_path);
                    let key = format!(
                        "ensure.{}.{}.{}",
                        part.name,
                        part.slug,
                        parent_id.map_or_else(|| "null".to_string(), |id| id.to_string())
                    );
                    let client = &client;
                    let part = &part;
                    let parent = parent_id;
                    ctx.checkpoint(key, move || async move {
                        let group = client.create_group(&part.name, &part.slug, parent).await?;
                        Ok(Some(group.id))
                    })
                    .await?
                }
            };
            current_path = Some(full_path);
        }

        if let Some(group_id) = parent_id {
            ctx.output("groupId", group_id)?;
        }
        Ok(())
    }
}
