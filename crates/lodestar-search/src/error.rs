//! Search client error types.

use lodestar_core::{BackendError, ResourceKind, Retryable};
use thiserror::Error;

/// Result type alias for search client operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors returned by [`crate::client::SearchClient`].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Server error (HTTP {status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Request rejected (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Search backend unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dashboard URL is not configured")]
    DashboardNotConfigured,
}

impl SearchError {
    /// Convert into the backend taxonomy, attaching the resource context.
    #[must_use]
    pub fn into_backend(self, kind: ResourceKind, name: &str) -> BackendError {
        match self {
            Self::NotFound(_) => BackendError::not_found(kind, name),
            Self::AuthError(msg) => BackendError::authentication(msg),
            e @ (Self::RateLimited { .. } | Self::Server { .. } | Self::Unreachable(_)) => {
                BackendError::transport(format!("{kind} '{name}': {e}"))
            }
            Self::Rejected { status, detail } => {
                BackendError::rejected(format!("write {kind} '{name}'"), Some(status), detail)
            }
            Self::ParseError(msg) => BackendError::malformed(format!("{kind} '{name}': {msg}")),
            e @ (Self::InvalidConfig(_) | Self::DashboardNotConfigured) => {
                BackendError::configuration(e.to_string())
            }
        }
    }
}

impl Retryable for SearchError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Unreachable(_)
        )
    }

    fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SearchError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_decode() {
            SearchError::ParseError(e.to_string())
        } else if e.is_builder() {
            SearchError::InvalidConfig(e.to_string())
        } else {
            SearchError::Unreachable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(SearchError::Unreachable("reset".into()).is_retryable());
        assert!(SearchError::Server {
            status: 503,
            detail: "unavailable".into()
        }
        .is_retryable());
        assert!(SearchError::RateLimited {
            retry_after_secs: Some(3)
        }
        .is_retryable());
        assert!(!SearchError::Rejected {
            status: 400,
            detail: "bad".into()
        }
        .is_retryable());
        assert!(!SearchError::AuthError("401".into()).is_retryable());
        assert!(!SearchError::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_into_backend_mapping() {
        let kind = ResourceKind::Index;
        assert!(SearchError::NotFound("x".into())
            .into_backend(kind, "a-000001")
            .is_not_found());
        assert!(matches!(
            SearchError::AuthError("401".into()).into_backend(kind, "a-000001"),
            BackendError::Authentication { .. }
        ));
        assert!(SearchError::Unreachable("reset".into())
            .into_backend(kind, "a-000001")
            .is_transient());
        assert!(matches!(
            SearchError::Rejected {
                status: 400,
                detail: "resource_already_exists_exception".into()
            }
            .into_backend(kind, "a-000001"),
            BackendError::Rejected {
                status: Some(400),
                ..
            }
        ));
        assert!(SearchError::DashboardNotConfigured
            .into_backend(ResourceKind::DataView, "a")
            .is_fatal());
    }
}
