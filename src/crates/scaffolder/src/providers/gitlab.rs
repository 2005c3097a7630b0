//! GitLab groups API client

use crate::error::{Result, ScaffolderError};
use crate::integrations::ScmIntegrations;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utils::{AuthHelper, HttpClient};

/// How requests authenticate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitlabAuth {
    /// Personal/project access token from the integration config (`PRIVATE-TOKEN`)
    PrivateToken(String),
    /// User OAuth token passed to the action (`Authorization: Bearer`)
    OAuth(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSchema {
    pub id: u64,
    pub full_path: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub parent_id: Option<u64>,
}

pub struct GitlabClient {
    http: Arc<HttpClient>,
    api_base_url: String,
    auth: GitlabAuth,
}

impl GitlabClient {
    pub fn new(http: Arc<HttpClient>, api_base_url: impl Into<String>, auth: GitlabAuth) -> Self {
        Self {
            http,
            api_base_url: api_base_url.into(),
            auth,
        }
    }

    /// Client for `host`, preferring a caller-supplied token over the integration's.
    pub fn for_host(
        http: Arc<HttpClient>,
        integrations: &ScmIntegrations,
        host: &str,
        token: Option<&str>,
    ) -> Result<Self> {
        let integration = integrations.gitlab.by_host(host).ok_or_else(|| {
            ScaffolderError::Input(format!(
                "No matching integration configuration for host {}, please check your integrations config",
                host
            ))
        })?;

        let auth = match (token, &integration.token) {
            (Some(token), _) => GitlabAuth::OAuth(token.to_string()),
            (None, Some(token)) => GitlabAuth::PrivateToken(token.clone()),
            (None, None) => {
                return Err(ScaffolderError::Input(format!("No token available for host {}", host)))
            }
        };

        Ok(Self::new(http, integration.api_base_url.clone(), auth))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .http
            .request(method, &format!("{}{}", self.api_base_url, path));
        match &self.auth {
            GitlabAuth::PrivateToken(token) => req.header("PRIVATE-TOKEN", token),
            GitlabAuth::OAuth(token) => req.header(AUTHORIZATION, AuthHelper::bearer_token(token)),
        }
    }

    /// `GET /groups?search=`; GitLab matches on name and path, not only full path
    pub async fn search_groups(&self, search: &str) -> Result<Vec<GroupSchema>> {
        let response = self
            .http
            .send(self.request(Method::GET, "/groups").query(&[("search", search)]))
            .await?;
        let response = ensure_success(response, "search groups").await?;
        Ok(response.json().await.map_err(utils::UtilsError::from)?)
    }

    /// `POST /groups`, nested under `parent_id` when given
    pub async fn create_group(&self, name: &str, path: &str, parent_id: Option<u64>) -> Result<GroupSchema> {
        let mut body = serde_json::json!({ "name": name, "path": path });
        if let Some(parent_id) = parent_id {
            body["parent_id"] = parent_id.into();
        }

        let response = self
            .http
            .send(self.request(Method::POST, "/groups").json(&body))
            .await?;
        let response = ensure_success(response, "create group").await?;
        let group: GroupSchema = response.json().await.map_err(utils::UtilsError::from)?;

        tracing::info!("Created GitLab group {} ({})", group.full_path, group.id);
        Ok(group)
    }
}

async fn ensure_success(response: Response, operation: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(ScaffolderError::Provider(format!(
        "GitLab failed to {}, {} {}, {}",
        operation,
        status.as_u16(),
        status.canonical_reason().unwrap_or_default(),
        text
    )))
}
