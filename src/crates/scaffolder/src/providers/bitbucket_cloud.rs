//! Bitbucket Cloud REST client

use crate::error::{Result, ScaffolderError};
use crate::integrations::BitbucketCloudIntegrationConfig;
use reqwest::header::AUTHORIZATION;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utils::{AuthHelper, HttpClient};

/// Credentials accepted by the Bitbucket Cloud API
#[derive(Debug, Clone, Default)]
pub struct BitbucketCredentials {
    pub token: Option<String>,
    pub username: Option<String>,
    pub app_password: Option<String>,
}

impl BitbucketCredentials {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn from_integration(config: &BitbucketCloudIntegrationConfig) -> Self {
        Self {
            token: config.token.clone(),
            username: config.username.clone(),
            app_password: config.app_password.clone(),
        }
    }
}

/// `Authorization` header value: Bearer for a token, Basic for username + app password
pub fn bitbucket_authorization_header(credentials: &BitbucketCredentials) -> Result<String> {
    if let Some(token) = &credentials.token {
        return Ok(AuthHelper::bearer_token(token));
    }
    match (&credentials.username, &credentials.app_password) {
        (Some(username), Some(app_password)) => Ok(AuthHelper::basic_auth(username, app_password)),
        _ => Err(ScaffolderError::Config(
            "Authorization has not been provided for Bitbucket Cloud. Please add either username + appPassword to the Integrations config or a user login auth token"
                .to_string(),
        )),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoVisibility {
    #[default]
    Private,
    Public,
}

impl RepoVisibility {
    pub fn is_private(self) -> bool {
        self == RepoVisibility::Private
    }
}

#[derive(Debug, Clone)]
pub struct CreateRepositoryRequest {
    pub api_base_url: String,
    pub authorization: String,
    pub workspace: String,
    pub project: String,
    pub repo: String,
    pub description: Option<String>,
    pub repo_visibility: RepoVisibility,
    pub main_branch: String,
}

/// Result of the create-repository step, recorded as its checkpoint value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRepository {
    pub remote_url: String,
    pub repo_contents_url: String,
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    links: RepositoryLinks,
}

#[derive(Debug, Deserialize)]
struct RepositoryLinks {
    #[serde(default)]
    clone: Vec<NamedLink>,
    html: Link,
}

#[derive(Debug, Deserialize)]
struct NamedLink {
    name: String,
    href: String,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

pub struct BitbucketCloudClient {
    http: Arc<HttpClient>,
}

impl BitbucketCloudClient {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    /// `POST {apiBaseUrl}/repositories/{workspace}/{repo}`
    ///
    /// Anything but `200 OK` is an error carrying the status and response body.
    pub async fn create_repository(&self, request: &CreateRepositoryRequest) -> Result<CreatedRepository> {
        let url = format!(
            "{}/repositories/{}/{}",
            request.api_base_url, request.workspace, request.repo
        );
        let body = json!({
            "scm": "git",
            "description": request.description,
            "is_private": request.repo_visibility.is_private(),
            "project": { "key": request.project },
        });

        let response = self
            .http
            .send(
                self.http
                    .request(Method::POST, &url)
                    .header(AUTHORIZATION, &request.authorization)
                    .json(&body),
            )
            .await
            .map_err(|e| ScaffolderError::Provider(format!("Unable to create repository, {}", e)))?;

        let status = response.status();
        if status != StatusCode::OK {
            let text = response.text().await.unwrap_or_default();
            return Err(ScaffolderError::Provider(format!(
                "Unable to create repository, {} {}, {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or_default(),
                text
            )));
        }

        let payload: RepositoryResponse = response.json().await.map_err(|e| {
            ScaffolderError::Provider(format!("Unable to create repository, invalid response: {}", e))
        })?;

        let remote_url = payload
            .links
            .clone
            .into_iter()
            .rev()
            .find(|link| link.name == "https")
            .map(|link| link.href)
            .unwrap_or_default();

        tracing::info!("Created Bitbucket Cloud repository {}/{}", request.workspace, request.repo);
        // The create endpoint cannot set the main branch; the first push does.
        Ok(CreatedRepository {
            remote_url,
            repo_contents_url: format!("{}/src/{}", payload.links.html.href, request.main_branch),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utils::ClientConfig;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(api_base_url: String) -> CreateRepositoryRequest {
        CreateRepositoryRequest {
            api_base_url,
            authorization: "Bearer abc".to_string(),
            workspace: "acme".to_string(),
            project: "WEB".to_string(),
            repo: "widget".to_string(),
            description: Some("Widget service".to_string()),
            repo_visibility: RepoVisibility::Public,
            main_branch: "main".to_string(),
        }
    }

    fn client() -> BitbucketCloudClient {
        BitbucketCloudClient::new(Arc::new(HttpClient::new(ClientConfig::new()).unwrap()))
    }

    #[test]
    fn test_token_header() {
        let header = bitbucket_authorization_header(&BitbucketCredentials::from_token("abc")).unwrap();
        assert_eq!(header, "Bearer abc");
    }

    #[test]
    fn test_basic_header() {
        let credentials = BitbucketCredentials {
            username: Some("user".into()),
            app_password: Some("pass".into()),
            ..Default::default()
        };
        assert_eq!(
            bitbucket_authorization_header(&credentials).unwrap(),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn test_missing_credentials() {
        let credentials = BitbucketCredentials {
            username: Some("user".into()),
            ..Default::default()
        };
        assert!(matches!(
            bitbucket_authorization_header(&credentials),
            Err(ScaffolderError::Config(_))
        ));
    }

    #[test]
    fn test_visibility_deserializes_lowercase() {
        let visibility: RepoVisibility = serde_json::from_str("\"public\"").unwrap();
        assert_eq!(visibility, RepoVisibility::Public);
        assert!(RepoVisibility::default().is_private());
    }

    #[tokio::test]
    async fn test_create_repository() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2.0/repositories/acme/widget"))
            .and(header("authorization", "Bearer abc"))
            .and(body_json(json!({
                "scm": "git",
                "description": "Widget service",
                "is_private": false,
                "project": {"key": "WEB"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "links": {
                    "clone": [
                        {"name": "ssh", "href": "git@bitbucket.org:acme/widget.git"},
                        {"name": "https", "href": "https://bitbucket.org/acme/widget.git"}
                    ],
                    "html": {"href": "https://bitbucket.org/acme/widget"}
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client()
            .create_repository(&request(format!("{}/2.0", server.uri())))
            .await
            .unwrap();

        assert_eq!(created.remote_url, "https://bitbucket.org/acme/widget.git");
        assert_eq!(created.repo_contents_url, "https://bitbucket.org/acme/widget/src/main");
    }

    #[tokio::test]
    async fn test_non_200_is_error_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("repository already exists"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client()
            .create_repository(&request(server.uri()))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Unable to create repository, 400 Bad Request, repository already exists"
        );
    }

    #[tokio::test]
    async fn test_created_201_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_string("{}"))
            .mount(&server)
            .await;

        let err = client()
            .create_repository(&request(server.uri()))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Unable to create repository, 201 Created"));
    }
}
