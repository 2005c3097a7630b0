//! `publish:bitbucketCloud`
//!
//! Creates a Bitbucket Cloud repository and pushes the workspace contents as
//! its initial commit. Both steps are checkpointed:
//!
//! - `create.repo.{host}.{repo}` records the clone and contents URLs
//! - `init.repo.and.push.{host}.{repo}` records the pushed commit hash
//!
//! A retry after a failed push therefore never asks Bitbucket to create the
//! repository a second time.

use crate::action::{ActionContext, TemplateAction};
use crate::error::{Result, ScaffolderError};
use crate::git::{init_repo_and_push, CommitSigner, GitAuth, GitAuthorInfo, GpgSigner, InitRepoOptions};
use crate::integrations::ScmIntegrations;
use crate::providers::bitbucket_cloud::{
    bitbucket_authorization_header, BitbucketCloudClient, BitbucketCredentials, CreateRepositoryRequest,
    CreatedRepository, RepoVisibility,
};
use crate::repo_url::{get_repo_source_directory, parse_repo_url};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use utils::{AppConfig, HttpClient};

pub const ACTION_ID: &str = "publish:bitbucketCloud";

/// Username Bitbucket expects alongside an access token for git over HTTPS
const TOKEN_AUTH_USERNAME: &str = "x-token-auth";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishBitbucketCloudInput {
    pub repo_url: String,
    pub description: Option<String>,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    #[serde(default)]
    pub repo_visibility: RepoVisibility,
    pub git_commit_message: Option<String>,
    pub source_path: Option<String>,
    pub token: Option<String>,
    #[serde(default)]
    pub sign_commit: bool,
}

fn default_branch() -> String {
    "master".to_string()
}

type SignerFactory = dyn Fn(&str) -> Arc<dyn CommitSigner> + Send + Sync;

pub struct PublishBitbucketCloudAction {
    integrations: Arc<ScmIntegrations>,
    config: Arc<AppConfig>,
    http: Arc<HttpClient>,
    signer_factory: Box<SignerFactory>,
}

impl PublishBitbucketCloudAction {
    pub fn new(integrations: Arc<ScmIntegrations>, config: Arc<AppConfig>, http: Arc<HttpClient>) -> Self {
        Self {
            integrations,
            config,
            http,
            signer_factory: Box::new(|key: &str| -> Arc<dyn CommitSigner> { Arc::new(GpgSigner::new(key)) }),
        }
    }

    /// Replace how a signing key is turned into a [`CommitSigner`]
    pub fn with_signer_factory(
        mut self,
        factory: impl Fn(&str) -> Arc<dyn CommitSigner> + Send + Sync + 'static,
    ) -> Self {
        self.signer_factory = Box::new(factory);
        self
    }
}

#[async_trait]
impl TemplateAction for PublishBitbucketCloudAction {
    fn id(&self) -> &str {
        ACTION_ID
    }

    fn description(&self) -> &str {
        "Initializes a git repository of the content in the workspace, and publishes it to Bitbucket Cloud."
    }

    async fn handle(&self, ctx: &mut ActionContext) -> Result<()> {
        let input: PublishBitbucketCloudInput = ctx.parse_input()?;
        let spec = parse_repo_url(&input.repo_url)?;

        let workspace = spec.workspace.clone().ok_or_else(|| {
            ScaffolderError::Input(format!(
                "Invalid URL provider was included in the repo URL to create {}, missing workspace",
                input.repo_url
            ))
        })?;
        let project = spec.project.clone().ok_or_else(|| {
            ScaffolderError::Input(format!(
                "Invalid URL provider was included in the repo URL to create {}, missing project",
                input.repo_url
            ))
        })?;

        let integration = self.integrations.bitbucket_cloud.by_host(&spec.host).ok_or_else(|| {
            ScaffolderError::Input(format!(
                "No matching integration configuration for host {}, please check your integrations config",
                spec.host
            ))
        })?;

        let authorization = match &input.token {
            Some(token) => bitbucket_authorization_header(&BitbucketCredentials::from_token(token))?,
            None => bitbucket_authorization_header(&BitbucketCredentials::from_integration(integration))?,
        };

        let client = BitbucketCloudClient::new(self.http.clone());
        let request = CreateRepositoryRequest {
            api_base_url: integration.api_base_url.clone(),
            authorization,
            workspace,
            project,
            repo: spec.repo.clone(),
            description: input.description.clone(),
            repo_visibility: input.repo_visibility,
            main_branch: input.default_branch.clone(),
        };

        let created: CreatedRepository = ctx
            .checkpoint(format!("create.repo.{}.{}", spec.host, spec.repo), || {
                client.create_repository(&request)
            })
            .await?;

        let auth = match &input.token {
            Some(token) => GitAuth {
                username: TOKEN_AUTH_USERNAME.to_string(),
                password: token.clone(),
            },
            None => match (&integration.username, &integration.app_password) {
                (Some(username), Some(app_password)) => GitAuth {
                    username: username.clone(),
                    password: app_password.clone(),
                },
                _ => {
                    return Err(ScaffolderError::Config(
                        "Credentials for Bitbucket Cloud integration required for this action.".to_string(),
                    ))
                }
            },
        };

        let signing_key = integration
            .commit_signing_key
            .clone()
            .or_else(|| self.config.get_optional_string("scaffolder.defaultCommitSigningKey"));
        let signer = match (input.sign_commit, signing_key) {
            (false, _) => None,
            (true, Some(key)) => Some((self.signer_factory)(&key)),
            (true, None) => {
                return Err(ScaffolderError::Config(
                    "Signing commits is enabled but no signing key is provided in the configuration"
                        .to_string(),
                ))
            }
        };

        let options = InitRepoOptions {
            dir: get_repo_source_directory(ctx.workspace_path(), input.source_path.as_deref())?,
            remote_url: created.remote_url.clone(),
            auth,
            default_branch: input.default_branch.clone(),
            commit_message: input
                .git_commit_message
                .clone()
                .filter(|message| !message.is_empty())
                .or_else(|| self.config.get_optional_string("scaffolder.defaultCommitMessage")),
            author: GitAuthorInfo {
                name: self.config.get_optional_string("scaffolder.defaultAuthor.name"),
                email: self.config.get_optional_string("scaffolder.defaultAuthor.email"),
            },
            signer,
        };

        let commit_hash: String = ctx
            .checkpoint(
                format!("init.repo.and.push.{}.{}", spec.host, spec.repo),
                move || async move { Ok(init_repo_and_push(options).await?.commit_hash) },
            )
            .await?;

        ctx.output("commitHash", commit_hash)?;
        ctx.output("remoteUrl", created.remote_url)?;
        ctx.output("repoContentsUrl", created.repo_contents_url)?;
        Ok(())
    }
}
