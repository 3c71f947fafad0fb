//! Search-engine and dashboard HTTP client (reqwest-based).
//!
//! Provides a `SearchClient` that talks to the search engine's admin REST API
//! (lifecycle policies, index templates, indices, roles, role mappings) and to
//! the dashboard's saved-objects API (data views). Both endpoints share one
//! set of basic-auth credentials.

use crate::error::{SearchError, SearchResult};
use crate::models::{AcknowledgedResponse, ClusterInfo};
use lodestar_core::RetryPolicy;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Username/password pair for basic authentication.
#[derive(Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Connection settings for [`SearchClient::new`].
#[derive(Debug, Clone)]
pub struct SearchConnection {
    /// Search engine base URL (e.g. `https://es.example.com:9200`).
    pub base_url: String,
    /// Dashboard base URL. Data-view operations fail with a configuration
    /// error when unset.
    pub dashboard_url: Option<String>,
    pub credentials: BasicCredentials,
    pub timeout: Duration,
    pub tls_verify: bool,
    pub retry: RetryPolicy,
}

/// Health check result for one endpoint.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthCheckResult {
    /// Which endpoint was probed (`search` or `dashboard`).
    pub endpoint: &'static str,
    pub healthy: bool,
    pub checked_at: chrono::DateTime<chrono::Utc>,
    /// Version string reported by the endpoint, if healthy.
    pub version: Option<String>,
    pub error: Option<String>,
}

/// Which base URL a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Endpoint {
    Search,
    Dashboard,
}

/// HTTP client for the search engine and its dashboard.
#[derive(Debug, Clone)]
pub struct SearchClient {
    base_url: String,
    dashboard_url: Option<String>,
    credentials: BasicCredentials,
    http_client: Client,
    retry: RetryPolicy,
}

impl SearchClient {
    /// Create a new client.
    pub fn new(connection: SearchConnection) -> SearchResult<Self> {
        if !connection.tls_verify {
            warn!(
                url = %connection.base_url,
                "TLS certificate verification is disabled for the search backend"
            );
        }

        let http_client = Client::builder()
            .timeout(connection.timeout)
            .danger_accept_invalid_certs(!connection.tls_verify)
            .user_agent(concat!("lodestar/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SearchError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(
            connection.base_url,
            connection.dashboard_url,
            connection.credentials,
            http_client,
        )
        .with_retry_policy(connection.retry))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    ///
    /// Retries are disabled until [`Self::with_retry_policy`] is called.
    #[must_use]
    pub fn with_http_client(
        base_url: String,
        dashboard_url: Option<String>,
        credentials: BasicCredentials,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            dashboard_url: dashboard_url.map(|u| u.trim_end_matches('/').to_string()),
            credentials,
            http_client,
            retry: RetryPolicy::none(),
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn dashboard_url(&self) -> Option<&str> {
        self.dashboard_url.as_deref()
    }

    // ── Discovery ─────────────────────────────────────────────────────

    /// `GET /` on the search engine.
    pub async fn cluster_info(&self) -> SearchResult<ClusterInfo> {
        let url = format!("{}/", self.base_url);
        self.execute_json("cluster_info", Method::GET, &url, None, Endpoint::Search)
            .await
    }

    /// Probe the search engine.
    pub async fn health_check(&self) -> HealthCheckResult {
        let checked_at = chrono::Utc::now();
        match self.cluster_info().await {
            Ok(info) => HealthCheckResult {
                endpoint: "search",
                healthy: true,
                checked_at,
                version: Some(info.version.number),
                error: None,
            },
            Err(e) => HealthCheckResult {
                endpoint: "search",
                healthy: false,
                checked_at,
                version: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Probe the dashboard via `GET /api/status`.
    pub async fn dashboard_health_check(&self) -> HealthCheckResult {
        let checked_at = chrono::Utc::now();
        let result = match self.dashboard_url() {
            Some(base) => {
                let url = format!("{base}/api/status");
                self.execute_json::<Value>(
                    "dashboard_status",
                    Method::GET,
                    &url,
                    None,
                    Endpoint::Dashboard,
                )
                .await
            }
            None => Err(SearchError::DashboardNotConfigured),
        };
        match result {
            Ok(status) => HealthCheckResult {
                endpoint: "dashboard",
                healthy: true,
                checked_at,
                version: status["version"]["number"].as_str().map(str::to_string),
                error: None,
            },
            Err(e) => HealthCheckResult {
                endpoint: "dashboard",
                healthy: false,
                checked_at,
                version: None,
                error: Some(e.to_string()),
            },
        }
    }

    // ── Lifecycle policies ────────────────────────────────────────────

    /// Fetch a lifecycle policy. The response's `{name: {...}}` wrapper is removed.
    pub async fn get_lifecycle_policy(&self, name: &str) -> SearchResult<Value> {
        let url = format!("{}/_ilm/policy/{}", self.base_url, encode(name));
        let body: Value = self
            .execute_json("get_lifecycle_policy", Method::GET, &url, None, Endpoint::Search)
            .await?;
        unwrap_named(body, name)
    }

    pub async fn put_lifecycle_policy(
        &self,
        name: &str,
        body: &Value,
    ) -> SearchResult<AcknowledgedResponse> {
        let url = format!("{}/_ilm/policy/{}", self.base_url, encode(name));
        debug!(policy = %name, "Writing lifecycle policy");
        self.execute_json(
            "put_lifecycle_policy",
            Method::PUT,
            &url,
            Some(body),
            Endpoint::Search,
        )
        .await
    }

    // ── Index templates ───────────────────────────────────────────────

    pub async fn index_template_exists(&self, name: &str) -> SearchResult<bool> {
        let url = format!("{}/_index_template/{}", self.base_url, encode(name));
        self.execute_head("index_template_exists", &url).await
    }

    /// Fetch an index template body (the `index_template` member of the
    /// matching entry).
    pub async fn get_index_template(&self, name: &str) -> SearchResult<Value> {
        let url = format!("{}/_index_template/{}", self.base_url, encode(name));
        let body: Value = self
            .execute_json("get_index_template", Method::GET, &url, None, Endpoint::Search)
            .await?;
        body.get("index_templates")
            .and_then(Value::as_array)
            .and_then(|templates| {
                templates
                    .iter()
                    .find(|t| t.get("name").and_then(Value::as_str) == Some(name))
            })
            .and_then(|t| t.get("index_template").cloned())
            .ok_or_else(|| SearchError::NotFound(format!("index template {name}")))
    }

    pub async fn put_index_template(
        &self,
        name: &str,
        body: &Value,
    ) -> SearchResult<AcknowledgedResponse> {
        let url = format!("{}/_index_template/{}", self.base_url, encode(name));
        debug!(template = %name, "Writing index template");
        self.execute_json(
            "put_index_template",
            Method::PUT,
            &url,
            Some(body),
            Endpoint::Search,
        )
        .await
    }

    // ── Indices ───────────────────────────────────────────────────────

    pub async fn index_exists(&self, name: &str) -> SearchResult<bool> {
        let url = format!("{}/{}", self.base_url, encode(name));
        self.execute_head("index_exists", &url).await
    }

    pub async fn get_index(&self, name: &str) -> SearchResult<Value> {
        let url = format!("{}/{}", self.base_url, encode(name));
        let body: Value = self
            .execute_json("get_index", Method::GET, &url, None, Endpoint::Search)
            .await?;
        unwrap_named(body, name)
    }

    pub async fn create_index(&self, name: &str, body: &Value) -> SearchResult<AcknowledgedResponse> {
        let url = format!("{}/{}", self.base_url, encode(name));
        debug!(index = %name, "Creating index");
        self.execute_json("create_index", Method::PUT, &url, Some(body), Endpoint::Search)
            .await
    }

    // ── Roles ─────────────────────────────────────────────────────────

    /// Fetch a role body. The response's `{name: {...}}` wrapper is removed.
    pub async fn get_role(&self, name: &str) -> SearchResult<Value> {
        let url = format!("{}/_security/role/{}", self.base_url, encode(name));
        let body: Value = self
            .execute_json("get_role", Method::GET, &url, None, Endpoint::Search)
            .await?;
        unwrap_named(body, name)
    }

    /// Create or replace a role. Any 2xx response counts as accepted.
    pub async fn put_role(&self, name: &str, body: &Value) -> SearchResult<()> {
        let url = format!("{}/_security/role/{}", self.base_url, encode(name));
        debug!(role = %name, "Writing role");
        self.execute_json::<Value>("put_role", Method::PUT, &url, Some(body), Endpoint::Search)
            .await?;
        Ok(())
    }

    // ── Role mappings ─────────────────────────────────────────────────

    pub async fn get_role_mapping(&self, name: &str) -> SearchResult<Value> {
        let url = format!("{}/_security/role_mapping/{}", self.base_url, encode(name));
        let body: Value = self
            .execute_json("get_role_mapping", Method::GET, &url, None, Endpoint::Search)
            .await?;
        unwrap_named(body, name)
    }

    /// Create or replace a role mapping. Any 2xx response counts as accepted.
    pub async fn put_role_mapping(&self, name: &str, body: &Value) -> SearchResult<()> {
        let url = format!("{}/_security/role_mapping/{}", self.base_url, encode(name));
        debug!(mapping = %name, "Writing role mapping");
        self.execute_json::<Value>(
            "put_role_mapping",
            Method::PUT,
            &url,
            Some(body),
            Endpoint::Search,
        )
        .await?;
        Ok(())
    }

    // ── Data views (dashboard) ────────────────────────────────────────

    pub async fn get_data_view(&self, id: &str) -> SearchResult<Value> {
        let url = format!("{}/api/saved_objects/index-pattern/{}", self.dashboard()?, encode(id));
        self.execute_json("get_data_view", Method::GET, &url, None, Endpoint::Dashboard)
            .await
    }

    /// Create (or overwrite) a data view saved object. Any 2xx response
    /// counts as accepted.
    pub async fn put_data_view(&self, id: &str, body: &Value) -> SearchResult<()> {
        let url = format!(
            "{}/api/saved_objects/index-pattern/{}?overwrite=true",
            self.dashboard()?,
            encode(id)
        );
        debug!(data_view = %id, "Writing data view");
        self.execute_json::<Value>(
            "put_data_view",
            Method::POST,
            &url,
            Some(body),
            Endpoint::Dashboard,
        )
        .await?;
        Ok(())
    }

    // ── Internal helpers ──────────────────────────────────────────────

    fn dashboard(&self) -> SearchResult<&str> {
        self.dashboard_url
            .as_deref()
            .ok_or(SearchError::DashboardNotConfigured)
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        endpoint: Endpoint,
    ) -> RequestBuilder {
        let mut builder = self
            .http_client
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password));
        if endpoint == Endpoint::Dashboard {
            builder = builder.header("kbn-xsrf", "true");
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        body: Option<&Value>,
        endpoint: Endpoint,
    ) -> SearchResult<T> {
        let this = self;
        self.retry
            .execute(operation, move || {
                let request = this.request(method.clone(), url, body, endpoint);
                async move {
                    let response = request.send().await?;
                    this.handle_response(response).await
                }
            })
            .await
    }

    /// `HEAD` probe: 200 is present, 404 is absent, anything else is an error.
    async fn execute_head(&self, operation: &str, url: &str) -> SearchResult<bool> {
        let this = self;
        self.retry
            .execute(operation, move || {
                let request = this.request(Method::HEAD, url, None, Endpoint::Search);
                async move {
                    let response = request.send().await?;
                    match response.status() {
                        status if status.is_success() => Ok(true),
                        StatusCode::NOT_FOUND => Ok(false),
                        _ => this.handle_error_response(response).await,
                    }
                }
            })
            .await
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> SearchResult<T> {
        let status = response.status();

        if status.is_success() {
            let body = response.text().await?;
            let body = if body.trim().is_empty() { "null" } else { body.as_str() };
            serde_json::from_str(body)
                .map_err(|e| SearchError::ParseError(format!("Failed to parse response: {e}")))
        } else {
            self.handle_error_response(response).await
        }
    }

    async fn handle_error_response<T>(&self, response: reqwest::Response) -> SearchResult<T> {
        let status = response.status();

        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let detail = if body.is_empty() {
            format!("HTTP {status}")
        } else {
            body
        };

        match status {
            StatusCode::NOT_FOUND => Err(SearchError::NotFound(detail)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SearchError::AuthError(
                format!("HTTP {}: {detail}", status.as_u16()),
            )),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Search backend rate limited, retry after {:?}s", retry_after);
                Err(SearchError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            s if s.is_server_error() => Err(SearchError::Server {
                status: s.as_u16(),
                detail,
            }),
            s => Err(SearchError::Rejected {
                status: s.as_u16(),
                detail,
            }),
        }
    }
}

fn encode(segment: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(segment)
}

/// Remove the `{name: {...}}` wrapper the admin APIs put around single-resource
/// GET responses. An empty object means the resource is absent.
fn unwrap_named(body: Value, name: &str) -> SearchResult<Value> {
    match body {
        Value::Object(mut map) => {
            if let Some(inner) = map.remove(name) {
                return Ok(inner);
            }
            // Index GETs through an alias are keyed by the concrete index.
            if map.len() == 1 {
                if let Some((_, inner)) = map.into_iter().next() {
                    return Ok(inner);
                }
            }
            Err(SearchError::NotFound(name.to_string()))
        }
        other => Err(SearchError::ParseError(format!(
            "expected an object keyed by '{name}', got {other}"
        ))),
    }
}
