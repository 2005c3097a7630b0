//! HTTP plumbing shared by the SCM provider clients.
//!
//! [`HttpClient`] wraps a `reqwest::Client` with default headers and a
//! [`RetryPolicy`]. Only idempotent methods are ever resent: a POST that
//! creates a repository or group goes out once, and whatever comes back
//! (including a 5xx) is handed to the caller to interpret.
//!
//! ```rust,ignore
//! use utils::client::{AuthHelper, ClientConfig, HttpClient};
//! use reqwest::Method;
//!
//! let client = HttpClient::new(ClientConfig::new().with_max_retries(2))?;
//! let request = client
//!     .request(Method::GET, "https://gitlab.com/api/v4/groups")
//!     .header("Authorization", AuthHelper::bearer_token(&token));
//! let response = client.send(request).await?;
//! ```

use crate::error::{Result, UtilsError};
use reqwest::{Client, Method, Request, RequestBuilder, Response};
use serde::Serialize;
use std::time::Duration;

/// Exponential backoff between resends of an idempotent request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl RetryPolicy {
    /// No resends at all.
    pub const NONE: RetryPolicy = RetryPolicy {
        max_retries: 0,
        initial_delay: Duration::ZERO,
        multiplier: 1,
    };

    /// Delay before resend number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay
            .saturating_mul(self.multiplier.saturating_pow(retry))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            multiplier: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
    pub default_headers: Vec<(String, String)>,
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            default_headers: Vec::new(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Header sent with every request built through [`HttpClient::request`].
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether a request may be resent without risking a duplicate side effect.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

pub struct HttpClient {
    config: ClientConfig,
    client: Client,
}

impl HttpClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent);
        }
        let client = builder.build()?;

        Ok(Self { config, client })
    }

    /// Start a request with the default headers applied.
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.config
            .default_headers
            .iter()
            .fold(self.client.request(method, url), |req, (name, value)| {
                req.header(name, value)
            })
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        self.send(self.request(Method::GET, url)).await
    }

    pub async fn post_json<T: Serialize>(&self, url: &str, body: &T) -> Result<Response> {
        self.send(self.request(Method::POST, url).json(body)).await
    }

    /// Send a prepared request.
    ///
    /// Idempotent requests are resent on timeouts, connect failures and 5xx
    /// responses, up to the configured retry count. The last response is
    /// returned as-is; status interpretation is the caller's job.
    pub async fn send(&self, req: RequestBuilder) -> Result<Response> {
        let request = req.build().map_err(|e| UtilsError::Request(e.to_string()))?;
        let policy = if is_idempotent(request.method()) {
            self.config.retry
        } else {
            RetryPolicy::NONE
        };

        let mut retry = 0;
        loop {
            let outcome = self.client.execute(replay(&request)?).await.map_err(UtilsError::from);
            if retry >= policy.max_retries || !should_retry(&outcome) {
                return outcome;
            }

            match &outcome {
                Ok(response) => tracing::debug!(
                    method = %request.method(),
                    url = %request.url(),
                    status = %response.status(),
                    retry,
                    "Retrying after server error"
                ),
                Err(e) => tracing::debug!(
                    method = %request.method(),
                    url = %request.url(),
                    error = %e,
                    retry,
                    "Retrying after transport error"
                ),
            }

            tokio::time::sleep(policy.delay_for(retry)).await;
            retry += 1;
        }
    }
}

fn replay(request: &Request) -> Result<Request> {
    request
        .try_clone()
        .ok_or_else(|| UtilsError::Request("streaming request body cannot be resent".to_string()))
}

fn should_retry(outcome: &Result<Response>) -> bool {
    match outcome {
        Ok(response) => response.status().is_server_error(),
        Err(e) => e.is_transient(),
    }
}

/// Authorization header values.
pub struct AuthHelper;

impl AuthHelper {
    pub fn bearer_token(token: &str) -> String {
        format!("Bearer {}", token)
    }

    pub fn basic_auth(username: &str, password: &str) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", username, password));
        format!("Basic {}", encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_client(max_retries: u32) -> HttpClient {
        HttpClient::new(ClientConfig::new().with_retry(RetryPolicy {
            max_retries,
            initial_delay: Duration::from_millis(1),
            multiplier: 2,
        }))
        .unwrap()
    }

    #[test]
    fn test_config_builders() {
        let config = ClientConfig::new()
            .with_timeout(Duration::from_secs(10))
            .with_max_retries(2)
            .with_user_agent("scaffolder/1.0")
            .with_header("X-Custom", "value");

        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(config.user_agent.as_deref(), Some("scaffolder/1.0"));
        assert_eq!(config.default_headers, vec![("X-Custom".to_string(), "value".to_string())]);
    }

    #[test]
    fn test_retry_delays_grow() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(RetryPolicy::NONE.delay_for(5), Duration::ZERO);
    }

    #[test]
    fn test_idempotent_methods() {
        assert!(is_idempotent(&Method::GET));
        assert!(is_idempotent(&Method::PUT));
        assert!(!is_idempotent(&Method::POST));
        assert!(!is_idempotent(&Method::PATCH));
    }

    #[test]
    fn test_auth_header_values() {
        assert_eq!(AuthHelper::bearer_token("abc"), "Bearer abc");

        let basic = AuthHelper::basic_auth("user", "pass");
        let encoded = basic.strip_prefix("Basic ").unwrap();
        let decoded = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, b"user:pass");
    }

    #[tokio::test]
    async fn test_default_headers_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .and(header("X-Client", "scaffolder"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpClient::new(ClientConfig::new().with_header("X-Client", "scaffolder")).unwrap();
        let response = client.get(&format!("{}/ping", server.uri())).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_get_is_resent_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/groups"))
            .respond_with(ResponseTemplate::new(502))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let response = fast_client(3).get(&format!("{}/groups", server.uri())).await.unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_last_server_error_is_returned() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let response = fast_client(2).get(&format!("{}/flaky", server.uri())).await.unwrap();
        assert_eq!(response.status(), 503);
    }

    #[tokio::test]
    async fn test_client_error_is_not_resent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let response = fast_client(3).get(&format!("{}/missing", server.uri())).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_post_is_never_resent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repositories/ws/widget"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let response = fast_client(3)
            .post_json(
                &format!("{}/repositories/ws/widget", server.uri()),
                &serde_json::json!({"scm": "git"}),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), 500);
    }
}
