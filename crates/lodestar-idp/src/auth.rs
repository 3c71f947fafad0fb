//! Admin token acquisition: password grant and client credentials.

use crate::error::{IdpError, IdpResult};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Credentials used to obtain an admin access token.
///
/// The [`Debug`] impl redacts passwords and secrets.
#[derive(Clone)]
pub enum IdpCredentials {
    /// Resource-owner password grant against an admin client.
    Password {
        username: String,
        password: String,
        client_id: String,
        client_secret: Option<String>,
    },

    /// Client credentials grant for a service-account client.
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

impl std::fmt::Debug for IdpCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password {
                username,
                client_id,
                client_secret,
                ..
            } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .field("client_id", client_id)
                .field(
                    "client_secret",
                    &client_secret.as_ref().map(|_| "[REDACTED]"),
                )
                .finish(),
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"[REDACTED]")
                .finish(),
        }
    }
}

impl IdpCredentials {
    fn form(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Password {
                username,
                password,
                client_id,
                client_secret,
            } => {
                let mut form = vec![
                    ("grant_type", "password"),
                    ("username", username.as_str()),
                    ("password", password.as_str()),
                    ("client_id", client_id.as_str()),
                ];
                if let Some(secret) = client_secret {
                    form.push(("client_secret", secret.as_str()));
                }
                form
            }
            Self::ClientCredentials {
                client_id,
                client_secret,
            } => vec![
                ("grant_type", "client_credentials"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Option<std::time::Instant>,
}

impl CachedToken {
    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => std::time::Instant::now() >= exp,
            None => false,
        }
    }
}

/// Token handler for the admin API.
///
/// Tokens are cached (shared across clones) until shortly before expiry and
/// dropped when the admin API answers 401.
#[derive(Debug, Clone)]
pub struct IdpAuth {
    credentials: IdpCredentials,
    token_endpoint: String,
    cached_token: Arc<RwLock<Option<CachedToken>>>,
    http_client: reqwest::Client,
}

impl IdpAuth {
    /// `base_url` is the server root; tokens are requested from
    /// `{base_url}/realms/{master_realm}/protocol/openid-connect/token`.
    #[must_use]
    pub fn new(
        base_url: &str,
        master_realm: &str,
        credentials: IdpCredentials,
        http_client: reqwest::Client,
    ) -> Self {
        let token_endpoint = format!(
            "{}/realms/{}/protocol/openid-connect/token",
            base_url.trim_end_matches('/'),
            urlencoding::encode(master_realm)
        );
        Self {
            credentials,
            token_endpoint,
            cached_token: Arc::new(RwLock::new(None)),
            http_client,
        }
    }

    #[must_use]
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    /// Return a cached access token or fetch a new one.
    pub async fn access_token(&self) -> IdpResult<String> {
        {
            let cache = self.cached_token.read().await;
            if let Some(cached) = cache.as_ref() {
                if !cached.is_expired() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        debug!("Fetching admin access token from {}", self.token_endpoint);
        let response = self
            .http_client
            .post(&self.token_endpoint)
            .form(&self.credentials.form())
            .send()
            .await
            .map_err(|e| IdpError::Unreachable(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            if status.is_server_error() {
                return Err(IdpError::Server {
                    status: status.as_u16(),
                    detail: body,
                });
            }
            return Err(IdpError::AuthError(format!(
                "Token endpoint returned {status}: {body}"
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| IdpError::AuthError(format!("Failed to parse token response: {e}")))?;

        let expires_at = token_response.expires_in.map(|secs| {
            // Expire 30 seconds early so a token never lapses mid-request.
            std::time::Instant::now() + std::time::Duration::from_secs(secs.saturating_sub(30))
        });

        let access_token = token_response.access_token.clone();
        {
            let mut cache = self.cached_token.write().await;
            *cache = Some(CachedToken {
                access_token: token_response.access_token,
                expires_at,
            });
        }

        Ok(access_token)
    }

    /// Apply bearer authentication to a request builder.
    pub async fn apply(&self, builder: RequestBuilder) -> IdpResult<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(builder.bearer_auth(token))
    }

    /// Drop the cached token (e.g., on a 401 response).
    pub async fn invalidate_cache(&self) {
        let mut cache = self.cached_token.write().await;
        *cache = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = IdpCredentials::Password {
            username: "admin".into(),
            password: "s3cret".into(),
            client_id: "admin-cli".into(),
            client_secret: Some("shh".into()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin-cli"));
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("shh"));
    }

    #[test]
    fn test_password_form_omits_missing_secret() {
        let creds = IdpCredentials::Password {
            username: "admin".into(),
            password: "pw".into(),
            client_id: "admin-cli".into(),
            client_secret: None,
        };
        let form = creds.form();
        assert!(form.contains(&("grant_type", "password")));
        assert!(!form.iter().any(|(k, _)| *k == "client_secret"));
    }

    #[test]
    fn test_token_endpoint_uses_master_realm() {
        let auth = IdpAuth::new(
            "https://idp.example.com/",
            "master",
            IdpCredentials::ClientCredentials {
                client_id: "lodestar".into(),
                client_secret: "x".into(),
            },
            reqwest::Client::new(),
        );
        assert_eq!(
            auth.token_endpoint(),
            "https://idp.example.com/realms/master/protocol/openid-connect/token"
        );
    }

    #[test]
    fn test_cached_token_expiry() {
        let expired = CachedToken {
            access_token: "t".into(),
            expires_at: Some(std::time::Instant::now()),
        };
        assert!(expired.is_expired());
        let forever = CachedToken {
            access_token: "t".into(),
            expires_at: None,
        };
        assert!(!forever.is_expired());
    }
}
