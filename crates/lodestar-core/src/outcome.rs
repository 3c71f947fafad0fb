//! Per-resource outcome records.

use crate::error::{BackendError, FailureKind};
use crate::resource::ResourceKind;
use serde::{Deserialize, Serialize};

/// What happened to one resource during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    AlreadyPresent,
    Updated,
    Failed,
    /// Not attempted because an earlier step of the same unit failed.
    Skipped,
    /// Not attempted because the run was cancelled.
    Cancelled,
}

impl Outcome {
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Created => "+",
            Self::Updated => "~",
            Self::AlreadyPresent => "=",
            Self::Failed => "✗",
            Self::Skipped | Self::Cancelled => "-",
        }
    }

    #[must_use]
    pub fn display(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::AlreadyPresent => "already present",
            Self::Updated => "updated",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the outcome leaves the resource in its desired state.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::AlreadyPresent | Self::Updated)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display())
    }
}

/// Outcome record for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceOutcome {
    pub kind: ResourceKind,
    pub name: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceOutcome {
    pub fn new(kind: ResourceKind, name: impl Into<String>, outcome: Outcome) -> Self {
        Self {
            kind,
            name: name.into(),
            outcome,
            error_kind: None,
            error: None,
        }
    }

    pub fn failed(kind: ResourceKind, name: impl Into<String>, error: &BackendError) -> Self {
        Self {
            kind,
            name: name.into(),
            outcome: Outcome::Failed,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_carries_kind() {
        let err = BackendError::transport("connection refused");
        let record = ResourceOutcome::failed(ResourceKind::Index, "a-000001", &err);
        assert_eq!(record.outcome, Outcome::Failed);
        assert_eq!(record.error_kind, Some(FailureKind::Transport));
        assert!(record.error.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_success_outcomes() {
        assert!(Outcome::Created.is_success());
        assert!(Outcome::AlreadyPresent.is_success());
        assert!(!Outcome::Failed.is_success());
        assert!(!Outcome::Skipped.is_success());
    }

    #[test]
    fn test_serialized_record_omits_empty_error() {
        let record = ResourceOutcome::new(ResourceKind::Role, "billing-read", Outcome::Created);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["outcome"], "created");
        assert!(value.get("error").is_none());
    }
}
