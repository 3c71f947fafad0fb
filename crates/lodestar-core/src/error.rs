//! Error Types
//!
//! Every backend adapter reports failures through [`BackendError`]. The
//! variants follow the propagation policy of a reconciliation run:
//!
//! - `Configuration` and `Authentication` are fatal for the whole run.
//! - `NotFound` is an expected signal used for create-vs-skip branching.
//! - `Transport`, `Rejected` and `Malformed` are recorded against the
//!   smallest enclosing unit (one resource, one tenant, one group path).
//!
//! # Example
//!
//! ```
//! use lodestar_core::{BackendError, ResourceKind};
//!
//! let err = BackendError::not_found(ResourceKind::Role, "teamlead-viewer");
//! assert!(err.is_not_found());
//! assert!(!err.is_fatal());
//! ```

use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Typed failure reported by a backend adapter.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendError {
    /// Missing credential or required input. Raised before any backend call.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Credentials were refused (HTTP 401/403) or a token could not be obtained.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The backend reported that the named resource does not exist.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ResourceKind, name: String },

    /// Network, timeout, rate-limit or server-side (5xx) failure.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The backend answered but declined the operation.
    #[error("Backend rejected {operation}{}: {detail}", status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Rejected {
        operation: String,
        status: Option<u16>,
        detail: String,
    },

    /// The backend answered with a body that could not be interpreted.
    #[error("Malformed response: {message}")]
    Malformed { message: String },
}

impl BackendError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    /// Create a not-found error for a resource.
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a rejection error.
    pub fn rejected(
        operation: impl Into<String>,
        status: Option<u16>,
        detail: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            operation: operation.into(),
            status,
            detail: detail.into(),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Whether this error must abort the entire run.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::Authentication { .. }
        )
    }

    /// Whether the backend reported the resource as absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the backend refused a create because the resource exists.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Rejected { detail, .. } if detail.contains("resource_already_exists"))
    }

    /// Whether the failure is transient and worth retrying.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Coarse classification used in outcome records.
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Configuration { .. } => FailureKind::Configuration,
            Self::Authentication { .. } => FailureKind::Authentication,
            Self::NotFound { .. } => FailureKind::NotFound,
            Self::Transport { .. } => FailureKind::Transport,
            Self::Rejected { .. } => FailureKind::Rejected,
            Self::Malformed { .. } => FailureKind::Malformed,
        }
    }
}

/// Failure classification carried by outcome records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Authentication,
    NotFound,
    Transport,
    Rejected,
    Malformed,
}

impl FailureKind {
    /// Stable lowercase label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Authentication => "authentication",
            Self::NotFound => "not_found",
            Self::Transport => "transport",
            Self::Rejected => "rejected",
            Self::Malformed => "malformed",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
