//! SCM integration registry
//!
//! Integrations are read from the `integrations` section of the app config:
//!
//! ```yaml
//! integrations:
//!   bitbucketCloud:
//!     - username: ${BITBUCKET_USERNAME}
//!       appPassword: ${BITBUCKET_APP_PASSWORD}
//!   gitlab:
//!     - host: gitlab.example.com
//!       token: ${GITLAB_TOKEN}
//! ```
//!
//! Unless a provider's public host (`bitbucket.org`, `gitlab.com`) is
//! configured explicitly, a credential-less entry for it is added alongside
//! the configured ones.

use crate::error::{Result, ScaffolderError};
use serde::Deserialize;
use utils::AppConfig;

pub const BITBUCKET_CLOUD_HOST: &str = "bitbucket.org";
pub const BITBUCKET_CLOUD_API_BASE_URL: &str = "https://api.bitbucket.org/2.0";
pub const GITLAB_HOST: &str = "gitlab.com";

/// A configured integration that serves one host
pub trait HostIntegration {
    fn host(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BitbucketCloudIntegrationConfig {
    #[serde(default = "default_bitbucket_host")]
    pub host: String,
    #[serde(default = "default_bitbucket_api_base_url")]
    pub api_base_url: String,
    pub username: Option<String>,
    pub app_password: Option<String>,
    pub token: Option<String>,
    pub commit_signing_key: Option<String>,
}

impl Default for BitbucketCloudIntegrationConfig {
    fn default() -> Self {
        Self {
            host: default_bitbucket_host(),
            api_base_url: default_bitbucket_api_base_url(),
            username: None,
            app_password: None,
            token: None,
            commit_signing_key: None,
        }
    }
}

impl HostIntegration for BitbucketCloudIntegrationConfig {
    fn host(&self) -> &str {
        &self.host
    }
}

fn default_bitbucket_host() -> String {
    BITBUCKET_CLOUD_HOST.to_string()
}

fn default_bitbucket_api_base_url() -> String {
    BITBUCKET_CLOUD_API_BASE_URL.to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GitlabIntegrationConfig {
    pub host: String,
    /// Defaults to `https://{host}/api/v4`
    #[serde(default)]
    pub api_base_url: String,
    pub token: Option<String>,
}

impl GitlabIntegrationConfig {
    pub fn new(host: impl Into<String>) -> Self {
        let mut config = Self {
            host: host.into(),
            api_base_url: String::new(),
            token: None,
        };
        config.normalize();
        config
    }

    fn normalize(&mut self) {
        if self.api_base_url.is_empty() {
            self.api_base_url = format!("https://{}/api/v4", self.host);
        }
        self.api_base_url = self.api_base_url.trim_end_matches('/').to_string();
    }
}

impl HostIntegration for GitlabIntegrationConfig {
    fn host(&self) -> &str {
        &self.host
    }
}

/// Integrations of one provider type
#[derive(Debug, Clone)]
pub struct IntegrationSet<T> {
    configs: Vec<T>,
}

impl<T: HostIntegration> IntegrationSet<T> {
    pub fn new(configs: Vec<T>) -> Self {
        Self { configs }
    }

    pub fn by_host(&self, host: &str) -> Option<&T> {
        self.configs.iter().find(|c| c.host() == host)
    }

    pub fn list(&self) -> &[T] {
        &self.configs
    }
}

/// All configured source-control integrations
#[derive(Debug, Clone)]
pub struct ScmIntegrations {
    pub bitbucket_cloud: IntegrationSet<BitbucketCloudIntegrationConfig>,
    pub gitlab: IntegrationSet<GitlabIntegrationConfig>,
}

impl ScmIntegrations {
    pub fn new(
        mut bitbucket_cloud: Vec<BitbucketCloudIntegrationConfig>,
        mut gitlab: Vec<GitlabIntegrationConfig>,
    ) -> Self {
        if !bitbucket_cloud.iter().any(|c| c.host == BITBUCKET_CLOUD_HOST) {
            bitbucket_cloud.push(BitbucketCloudIntegrationConfig::default());
        }
        for config in &mut bitbucket_cloud {
            config.api_base_url = config.api_base_url.trim_end_matches('/').to_string();
        }

        if !gitlab.iter().any(|c| c.host == GITLAB_HOST) {
            gitlab.push(GitlabIntegrationConfig::new(GITLAB_HOST));
        }
        for config in &mut gitlab {
            config.normalize();
        }

        Self {
            bitbucket_cloud: IntegrationSet::new(bitbucket_cloud),
            gitlab: IntegrationSet::new(gitlab),
        }
    }

    /// Read `integrations.bitbucketCloud` and `integrations.gitlab`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let bitbucket_cloud = config
            .get_typed::<Vec<BitbucketCloudIntegrationConfig>>("integrations.bitbucketCloud")
            .map_err(|e| ScaffolderError::Config(format!("integrations.bitbucketCloud: {}", e)))?
            .unwrap_or_default();
        let gitlab = config
            .get_typed::<Vec<GitlabIntegrationConfig>>("integrations.gitlab")
            .map_err(|e| ScaffolderError::Config(format!("integrations.gitlab: {}", e)))?
            .unwrap_or_default();

        tracing::debug!(
            "Loaded {} Bitbucket Cloud and {} GitLab integrations",
            bitbucket_cloud.len(),
            gitlab.len()
        );
        Ok(Self::new(bitbucket_cloud, gitlab))
    }
}

impl Default for ScmIntegrations {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}
