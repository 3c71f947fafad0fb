//! Identity-provider client error types.

use lodestar_core::{BackendError, ResourceKind, Retryable};
use thiserror::Error;

/// Result type alias for identity-provider client operations.
pub type IdpResult<T> = Result<T, IdpError>;

/// Errors returned by [`crate::client::IdpClient`].
#[derive(Debug, Error)]
pub enum IdpError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    Conflict(String),

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limited, retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Server error (HTTP {status}): {detail}")]
    Server { status: u16, detail: String },

    #[error("Request rejected (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Identity provider unreachable: {0}")]
    Unreachable(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl IdpError {
    /// Convert into the backend taxonomy, attaching the resource context.
    #[must_use]
    pub fn into_backend(self, kind: ResourceKind, name: &str) -> BackendError {
        match self {
            Self::NotFound(_) => BackendError::not_found(kind, name),
            Self::AuthError(msg) => BackendError::authentication(msg),
            Self::Conflict(detail) => {
                BackendError::rejected(format!("create {kind} '{name}'"), Some(409), detail)
            }
            e @ (Self::RateLimited { .. } | Self::Server { .. } | Self::Unreachable(_)) => {
                BackendError::transport(format!("{kind} '{name}': {e}"))
            }
            Self::Rejected { status, detail } => {
                BackendError::rejected(format!("write {kind} '{name}'"), Some(status), detail)
            }
            Self::ParseError(msg) => BackendError::malformed(format!("{kind} '{name}': {msg}")),
            Self::InvalidConfig(msg) => BackendError::configuration(msg),
        }
    }
}

impl Retryable for IdpError {
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

impl From<reqwest::Error> for IdpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            IdpError::Unreachable(format!("request timed out: {e}"))
        } else if e.is_decode() {
            IdpError::ParseError(e.to_string())
        } else if e.is_builder() {
            IdpError::InvalidConfig(e.to_string())
        } else {
            IdpError::Unreachable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_not_retryable() {
        assert!(!IdpError::Conflict("group".into()).is_retryable());
        assert!(IdpError::Server {
            status: 502,
            detail: "bad gateway".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_auth_error_maps_to_fatal() {
        let err = IdpError::AuthError("invalid_grant".into()).into_backend(ResourceKind::Group, "/kibana");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_conflict_maps_to_rejected_409() {
        let err = IdpError::Conflict("exists".into()).into_backend(ResourceKind::RealmRole, "opsadmin");
        assert!(matches!(
            err,
            BackendError::Rejected {
                status: Some(409),
                ..
            }
        ));
    }
}
