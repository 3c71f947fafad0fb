//! Resource kinds, desired-state specifications and backend acknowledgments.

use crate::error::{BackendError, BackendResult};
use serde::{Deserialize, Serialize};

/// Kind of a managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    LifecyclePolicy,
    IndexTemplate,
    Index,
    DataView,
    Role,
    RoleMapping,
    Realm,
    Group,
    RealmRole,
    GroupRoleAssignment,
}

impl ResourceKind {
    /// Human-readable label used in logs and reports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LifecyclePolicy => "lifecycle policy",
            Self::IndexTemplate => "index template",
            Self::Index => "index",
            Self::DataView => "data view",
            Self::Role => "role",
            Self::RoleMapping => "role mapping",
            Self::Realm => "realm",
            Self::Group => "group",
            Self::RealmRole => "realm role",
            Self::GroupRoleAssignment => "group role assignment",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of a per-tenant role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleKind {
    Read,
    Admin,
    Viewer,
}

impl RoleKind {
    /// Suffix used when deriving the role name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Admin => "admin",
            Self::Viewer => "viewer",
        }
    }
}

impl std::fmt::Display for RoleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single resource that must exist on a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub kind: ResourceKind,
    pub name: String,
    /// Wire body sent on create.
    pub body: serde_json::Value,
}

impl ResourceSpec {
    pub fn new(kind: ResourceKind, name: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            kind,
            name: name.into(),
            body,
        }
    }
}

/// Acknowledgment returned by a backend write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub acknowledged: bool,
}

impl Ack {
    #[must_use]
    pub fn accepted() -> Self {
        Self { acknowledged: true }
    }

    #[must_use]
    pub fn unacknowledged() -> Self {
        Self {
            acknowledged: false,
        }
    }

    /// Convert a negative acknowledgment into a [`BackendError::Rejected`].
    pub fn require(self, operation: &str, kind: ResourceKind, name: &str) -> BackendResult<()> {
        if self.acknowledged {
            Ok(())
        } else {
            Err(BackendError::rejected(
                operation,
                None,
                format!("{kind} '{name}' was not acknowledged by the backend"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unacknowledged_is_rejection() {
        let err = Ack::unacknowledged()
            .require("create", ResourceKind::LifecyclePolicy, "billing-policy")
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected { status: None, .. }));
        assert!(err.to_string().contains("billing-policy"));

        assert!(Ack::accepted()
            .require("create", ResourceKind::LifecyclePolicy, "billing-policy")
            .is_ok());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let value = serde_json::to_value(ResourceKind::IndexTemplate).unwrap();
        assert_eq!(value, serde_json::json!("index_template"));
    }
}
