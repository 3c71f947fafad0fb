//! Run reports.

use chrono::{DateTime, Utc};
use lodestar_core::{FailureKind, Outcome, ResourceOutcome, TenantName};
use serde::Serialize;
use uuid::Uuid;

use crate::grant::GrantOutcome;

/// Outcome of the aggregated-role step for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantRecord {
    pub role: String,
    pub pattern: String,
    pub outcome: GrantStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// [`GrantOutcome`] plus the cases where the merge did not run or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantStatus {
    Added,
    AlreadyPresent,
    RoleNotFound,
    Failed,
    Skipped,
}

impl From<GrantOutcome> for GrantStatus {
    fn from(outcome: GrantOutcome) -> Self {
        match outcome {
            GrantOutcome::Added => Self::Added,
            GrantOutcome::AlreadyPresent => Self::AlreadyPresent,
            GrantOutcome::RoleNotFound => Self::RoleNotFound,
        }
    }
}

impl GrantStatus {
    #[must_use]
    pub fn display(&self) -> &'static str {
        match self {
            Self::Added => "granted",
            Self::AlreadyPresent => "already granted",
            Self::RoleNotFound => "role not found",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl GrantRecord {
    pub fn new(role: &str, pattern: &str, outcome: GrantStatus) -> Self {
        Self {
            role: role.to_string(),
            pattern: pattern.to_string(),
            outcome,
            error_kind: match outcome {
                GrantStatus::RoleNotFound => Some(FailureKind::NotFound),
                _ => None,
            },
            error: None,
        }
    }

    pub fn failed(role: &str, pattern: &str, error: &lodestar_core::BackendError) -> Self {
        Self {
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
            ..Self::new(role, pattern, GrantStatus::Failed)
        }
    }
}

/// Outcome of one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TenantReport {
    pub tenant: TenantName,
    pub resources: Vec<ResourceOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant: Option<GrantRecord>,
}

impl TenantReport {
    /// Whether every resource reached its desired state.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.resources.iter().all(|r| r.outcome.is_success())
    }

    #[must_use]
    pub fn count(&self, outcome: Outcome) -> usize {
        self.resources.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Outcome recorded for a named resource.
    #[must_use]
    pub fn outcome_of(&self, name: &str) -> Option<Outcome> {
        self.resources
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.outcome)
    }
}

/// Totals across a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub created: usize,
    pub already_present: usize,
    pub updated: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

impl RunSummary {
    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Created => self.created += 1,
            Outcome::AlreadyPresent => self.already_present += 1,
            Outcome::Updated => self.updated += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Cancelled => self.cancelled += 1,
        }
    }

    /// Tally a list of outcome records.
    pub fn tally<'a>(outcomes: impl IntoIterator<Item = &'a ResourceOutcome>) -> Self {
        let mut summary = Self::default();
        for record in outcomes {
            summary.add(record.outcome);
        }
        summary
    }
}

/// Report of a tenant reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tenants: Vec<TenantReport>,
}

impl RunReport {
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::tally(self.tenants.iter().flat_map(|t| t.resources.iter()))
    }

    #[must_use]
    pub fn tenant(&self, name: &str) -> Option<&TenantReport> {
        self.tenants.iter().find(|t| t.tenant.as_str() == name)
    }
}

/// Report of an identity-provider layout run.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutReport {
    pub run_id: Uuid,
    pub realm: String,
    pub steps: Vec<ResourceOutcome>,
}

impl LayoutReport {
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        RunSummary::tally(&self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lodestar_core::{BackendError, ResourceKind};

    #[test]
    fn test_summary_tally() {
        let records = vec![
            ResourceOutcome::new(ResourceKind::Role, "a", Outcome::Created),
            ResourceOutcome::new(ResourceKind::Role, "b", Outcome::AlreadyPresent),
            ResourceOutcome::failed(ResourceKind::Index, "c", &BackendError::transport("x")),
            ResourceOutcome::new(ResourceKind::Role, "d", Outcome::Skipped),
        ];
        let summary = RunSummary::tally(&records);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.already_present, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_role_not_found_grant_carries_not_found_kind() {
        let record = GrantRecord::new("teamlead-viewer", "a-*", GrantStatus::RoleNotFound);
        assert_eq!(record.error_kind, Some(FailureKind::NotFound));
    }
}
