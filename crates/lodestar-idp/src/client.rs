//! Identity-provider admin HTTP client (reqwest-based).
//!
//! Wraps the realm, group, realm-role and group role-mapping endpoints of the
//! admin REST API. Every call is scoped to one managed realm, except realm
//! lookup and creation which take the realm name explicitly.

use crate::auth::{IdpAuth, IdpCredentials};
use crate::error::{IdpError, IdpResult};
use crate::models::{GroupRepresentation, NewGroup, RealmRepresentation, RoleRepresentation};
use lodestar_core::RetryPolicy;
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on pages fetched for one listing.
const MAX_PAGES: u32 = 10_000;

/// Default page size for group listings.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Connection settings for [`IdpClient::new`].
#[derive(Debug, Clone)]
pub struct IdpConnection {
    /// Server root (e.g. `https://idp.example.com`).
    pub base_url: String,
    /// Realm the admin token is requested from.
    pub master_realm: String,
    /// Realm whose groups and roles are managed.
    pub realm: String,
    pub credentials: IdpCredentials,
    pub timeout: Duration,
    pub tls_verify: bool,
    pub retry: RetryPolicy,
}

/// Health check result for the identity provider.
#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub checked_at: chrono::DateTime<chrono::Utc>,
    /// Whether the managed realm exists (only known when healthy).
    pub realm_present: Option<bool>,
    pub error: Option<String>,
}

/// Admin API client for one managed realm.
#[derive(Debug, Clone)]
pub struct IdpClient {
    base_url: String,
    realm: String,
    auth: IdpAuth,
    http_client: Client,
    retry: RetryPolicy,
    page_size: u32,
}

impl IdpClient {
    /// Create a new client.
    pub fn new(connection: IdpConnection) -> IdpResult<Self> {
        if !connection.tls_verify {
            warn!(
                url = %connection.base_url,
                "TLS certificate verification is disabled for the identity provider"
            );
        }

        let http_client = Client::builder()
            .timeout(connection.timeout)
            .danger_accept_invalid_certs(!connection.tls_verify)
            .user_agent(concat!("lodestar/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IdpError::InvalidConfig(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self::with_http_client(
            connection.base_url,
            &connection.master_realm,
            connection.realm,
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
        master_realm: &str,
        realm: String,
        credentials: IdpCredentials,
        http_client: Client,
    ) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let auth = IdpAuth::new(&base_url, master_realm, credentials, http_client.clone());
        Self {
            base_url,
            realm,
            auth,
            http_client,
            retry: RetryPolicy::none(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The managed realm.
    #[must_use]
    pub fn realm(&self) -> &str {
        &self.realm
    }

    // ── Health ────────────────────────────────────────────────────────

    /// Obtain a token and look up the managed realm.
    pub async fn health_check(&self) -> HealthCheckResult {
        let checked_at = chrono::Utc::now();
        match self.get_realm(&self.realm).await {
            Ok(_) => HealthCheckResult {
                healthy: true,
                checked_at,
                realm_present: Some(true),
                error: None,
            },
            Err(IdpError::NotFound(_)) => HealthCheckResult {
                healthy: true,
                checked_at,
                realm_present: Some(false),
                error: None,
            },
            Err(e) => HealthCheckResult {
                healthy: false,
                checked_at,
                realm_present: None,
                error: Some(e.to_string()),
            },
        }
    }

    // ── Realms ────────────────────────────────────────────────────────

    pub async fn get_realm(&self, realm: &str) -> IdpResult<RealmRepresentation> {
        let url = format!("{}/admin/realms/{}", self.base_url, enc(realm));
        self.execute_json("get_realm", Method::GET, &url, &[], None)
            .await
    }

    /// Create an enabled realm.
    pub async fn create_realm(&self, realm: &str) -> IdpResult<()> {
        let url = format!("{}/admin/realms", self.base_url);
        let body = serde_json::to_value(RealmRepresentation {
            id: None,
            realm: realm.to_string(),
            enabled: true,
        })
        .map_err(|e| IdpError::ParseError(e.to_string()))?;
        debug!(realm = %realm, "Creating realm");
        self.execute("create_realm", Method::POST, &url, &[], Some(&body))
            .await?;
        Ok(())
    }

    // ── Groups ────────────────────────────────────────────────────────

    /// List every top-level group of the managed realm (all pages).
    pub async fn list_top_level_groups(&self) -> IdpResult<Vec<GroupRepresentation>> {
        let url = format!("{}/admin/realms/{}/groups", self.base_url, enc(&self.realm));
        self.paginate("list_top_level_groups", &url).await
    }

    /// List the direct children of a group (all pages).
    pub async fn list_child_groups(&self, parent_id: &str) -> IdpResult<Vec<GroupRepresentation>> {
        let url = format!(
            "{}/admin/realms/{}/groups/{}/children",
            self.base_url,
            enc(&self.realm),
            enc(parent_id)
        );
        self.paginate("list_child_groups", &url).await
    }

    /// Create a group (top-level when `parent_id` is `None`) and return its id.
    ///
    /// Returns [`IdpError::Conflict`] when a sibling with that name exists.
    pub async fn create_group(&self, parent_id: Option<&str>, name: &str) -> IdpResult<String> {
        let url = match parent_id {
            Some(parent) => format!(
                "{}/admin/realms/{}/groups/{}/children",
                self.base_url,
                enc(&self.realm),
                enc(parent)
            ),
            None => format!("{}/admin/realms/{}/groups", self.base_url, enc(&self.realm)),
        };
        let body = serde_json::to_value(NewGroup { name })
            .map_err(|e| IdpError::ParseError(e.to_string()))?;
        debug!(group = %name, parent = ?parent_id, "Creating group");
        let response = self
            .execute("create_group", Method::POST, &url, &[], Some(&body))
            .await?;

        if let Some(id) = location_id(&response) {
            return Ok(id);
        }
        // Some versions answer 201 with the representation instead of a Location.
        let text = response.text().await?;
        serde_json::from_str::<GroupRepresentation>(&text)
            .map(|g| g.id)
            .map_err(|_| IdpError::ParseError(format!("no group id in response for '{name}'")))
    }

    // ── Realm roles ───────────────────────────────────────────────────

    pub async fn get_realm_role(&self, name: &str) -> IdpResult<RoleRepresentation> {
        let url = format!(
            "{}/admin/realms/{}/roles/{}",
            self.base_url,
            enc(&self.realm),
            enc(name)
        );
        self.execute_json("get_realm_role", Method::GET, &url, &[], None)
            .await
    }

    /// Create a realm role. Returns [`IdpError::Conflict`] when it exists.
    pub async fn create_realm_role(&self, name: &str) -> IdpResult<()> {
        let url = format!("{}/admin/realms/{}/roles", self.base_url, enc(&self.realm));
        let body = serde_json::to_value(RoleRepresentation::named(name))
            .map_err(|e| IdpError::ParseError(e.to_string()))?;
        debug!(role = %name, "Creating realm role");
        self.execute("create_realm_role", Method::POST, &url, &[], Some(&body))
            .await?;
        Ok(())
    }

    // ── Group role mappings ───────────────────────────────────────────

    /// Realm roles directly assigned to a group.
    pub async fn group_realm_roles(&self, group_id: &str) -> IdpResult<Vec<RoleRepresentation>> {
        let url = self.group_role_mapping_url(group_id);
        self.execute_json("group_realm_roles", Method::GET, &url, &[], None)
            .await
    }

    /// Assign realm roles to a group. Roles must carry their ids.
    pub async fn assign_realm_roles(
        &self,
        group_id: &str,
        roles: &[RoleRepresentation],
    ) -> IdpResult<()> {
        let url = self.group_role_mapping_url(group_id);
        let body = serde_json::to_value(roles).map_err(|e| IdpError::ParseError(e.to_string()))?;
        debug!(group_id = %group_id, count = roles.len(), "Assigning realm roles");
        self.execute("assign_realm_roles", Method::POST, &url, &[], Some(&body))
            .await?;
        Ok(())
    }

    // ── Internal helpers ──────────────────────────────────────────────

    fn group_role_mapping_url(&self, group_id: &str) -> String {
        format!(
            "{}/admin/realms/{}/groups/{}/role-mappings/realm",
            self.base_url,
            enc(&self.realm),
            enc(group_id)
        )
    }

    /// Fetch every page of a `first`/`max` paginated listing.
    ///
    /// Stops early when a page repeats the previous one, which is what a
    /// server that ignores `first` returns.
    async fn paginate<T: DeserializeOwned>(&self, operation: &str, url: &str) -> IdpResult<Vec<T>> {
        let mut items = Vec::new();
        let mut previous: Option<Vec<Value>> = None;
        let mut first: u32 = 0;
        for _ in 0..MAX_PAGES {
            let query = [
                ("first", first.to_string()),
                ("max", self.page_size.to_string()),
            ];
            let page: Vec<Value> = self
                .execute_json(operation, Method::GET, url, &query, None)
                .await?;
            if previous.as_ref() == Some(&page) {
                warn!(operation, first, "Listing ignored pagination, stopping after a repeated page");
                return Ok(items);
            }
            let fetched = page.len();
            for value in &page {
                items.push(serde_json::from_value(value.clone()).map_err(|e| {
                    IdpError::ParseError(format!("Failed to parse {operation} item: {e}"))
                })?);
            }
            if fetched < self.page_size as usize {
                return Ok(items);
            }
            previous = Some(page);
            first += self.page_size;
        }
        Err(IdpError::ParseError(format!(
            "{operation} listing did not end after {MAX_PAGES} pages"
        )))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> IdpResult<T> {
        let response = self.execute(operation, method, url, query, body).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| IdpError::ParseError(format!("Failed to parse response: {e}")))
    }

    /// Send an authenticated request with retry; non-2xx statuses become errors.
    async fn execute(
        &self,
        operation: &str,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> IdpResult<Response> {
        let this = self;
        self.retry
            .execute(operation, move || {
                let method = method.clone();
                async move {
                    let mut builder = this.http_client.request(method, url).query(query);
                    if let Some(body) = body {
                        builder = builder.json(body);
                    }
                    let response = this.auth.apply(builder).await?.send().await?;
                    if response.status().is_success() {
                        Ok(response)
                    } else {
                        this.handle_error_response(response).await
                    }
                }
            })
            .await
    }

    async fn handle_error_response<T>(&self, response: Response) -> IdpResult<T> {
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
            StatusCode::NOT_FOUND => Err(IdpError::NotFound(detail)),
            StatusCode::CONFLICT => Err(IdpError::Conflict(detail)),
            StatusCode::UNAUTHORIZED => {
                self.auth.invalidate_cache().await;
                Err(IdpError::AuthError(format!(
                    "Authentication failed (401): {detail}"
                )))
            }
            StatusCode::FORBIDDEN => Err(IdpError::AuthError(format!(
                "Insufficient permissions (403): {detail}"
            ))),
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("Identity provider rate limited, retry after {:?}s", retry_after);
                Err(IdpError::RateLimited {
                    retry_after_secs: retry_after,
                })
            }
            s if s.is_server_error() => Err(IdpError::Server {
                status: s.as_u16(),
                detail,
            }),
            s => Err(IdpError::Rejected {
                status: s.as_u16(),
                detail,
            }),
        }
    }
}

fn enc(segment: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(segment)
}

/// Id of a created resource: last segment of the `Location` header.
fn location_id(response: &Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|loc| loc.trim_end_matches('/').rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
