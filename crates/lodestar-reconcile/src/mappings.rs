//! Group-driven role mappings.
//!
//! Walks the identity provider's group forest, keeps the groups under a path
//! prefix whose last segment ends with an accepted suffix, and upserts one
//! role mapping per group binding its members (in the configured realm) to a
//! role derived from the group name.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lodestar_core::group::{last_segment, normalize_prefix};
use lodestar_core::naming;
use lodestar_core::{
    BackendError, BackendResult, FailureKind, GroupDirectory, GroupNode, Outcome, ResourceBackend, ResourceKind,
    ResourceSpec,
};
use lodestar_idp::walker::GroupWalker;
use lodestar_search::models::RoleMappingBody;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ReconcileError, ReconcileResult};

/// Selects which group paths get a role mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuffixFilter {
    prefix: String,
    suffixes: Vec<String>,
}

impl SuffixFilter {
    /// `prefix` is normalized to `/segment/`; blank suffixes are dropped.
    /// An empty suffix list accepts every group under the prefix.
    pub fn new<I, S>(prefix: &str, suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: normalize_prefix(prefix),
            suffixes: suffixes
                .into_iter()
                .map(Into::into)
                .map(|s: String| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// Split a comma- or whitespace-separated suffix list, keeping order.
    #[must_use]
    pub fn parse_suffixes(raw: &str) -> Vec<String> {
        raw.split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn suffixes(&self) -> &[String] {
        &self.suffixes
    }

    /// The first accepted suffix the path's last segment ends with.
    ///
    /// `None` when the path is outside the prefix (the prefix group itself
    /// included) or no suffix matches. With no suffixes configured every path
    /// under the prefix matches with an empty suffix.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<&str> {
        if !path.starts_with(&self.prefix) || path.len() <= self.prefix.len() {
            return None;
        }
        if self.suffixes.is_empty() {
            return Some("");
        }
        let segment = last_segment(path);
        self.suffixes
            .iter()
            .find(|suffix| segment.ends_with(suffix.as_str()))
            .map(String::as_str)
    }
}

/// How the mapped role is named from the group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingNaming {
    /// Role = last path segment (the layout provisioner's realm-role name).
    #[default]
    LastSegment,
    /// Role = `{last segment}-viewer`.
    ViewerSuffix,
}

impl MappingNaming {
    #[must_use]
    pub fn role_for(&self, group_path: &str) -> String {
        let segment = naming::role_mapping_name(group_path);
        match self {
            Self::LastSegment => segment,
            Self::ViewerSuffix => format!("{segment}-viewer"),
        }
    }
}

/// Outcome for one group path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappingOutcome {
    pub group_path: String,
    pub mapping_name: String,
    pub role: String,
    pub matched_suffix: String,
    pub outcome: Outcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A subtree the walk could not list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedSubtree {
    pub path: String,
    pub error_kind: FailureKind,
    pub error: String,
}

/// Report of a role-mapping run.
#[derive(Debug, Clone, Serialize)]
pub struct MappingReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Every group path visited, in walk order.
    pub visited: Vec<String>,
    pub mappings: Vec<MappingOutcome>,
    pub skipped_subtrees: Vec<SkippedSubtree>,
}

impl MappingReport {
    /// Group paths a mapping was derived for.
    #[must_use]
    pub fn mapped_paths(&self) -> Vec<&str> {
        self.mappings.iter().map(|m| m.group_path.as_str()).collect()
    }
}

/// Upserts role mappings for the matching groups of one realm.
pub struct RoleMappingSync {
    directory: Arc<dyn GroupDirectory>,
    backend: Arc<dyn ResourceBackend>,
    realm: String,
    naming: MappingNaming,
}

impl RoleMappingSync {
    pub fn new(
        directory: Arc<dyn GroupDirectory>,
        backend: Arc<dyn ResourceBackend>,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            backend,
            realm: realm.into(),
            naming: MappingNaming::default(),
        }
    }

    #[must_use]
    pub fn with_naming(mut self, naming: MappingNaming) -> Self {
        self.naming = naming;
        self
    }

    /// Walk the whole forest and map every group under `prefix` whose name
    /// ends with one of `suffixes` (first match wins).
    pub async fn sync(&self, prefix: &str, suffixes: &[String]) -> ReconcileResult<MappingReport> {
        self.sync_filtered(&SuffixFilter::new(prefix, suffixes.iter().cloned()))
            .await
    }

    pub async fn sync_filtered(&self, filter: &SuffixFilter) -> ReconcileResult<MappingReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            realm = %self.realm,
            prefix = %filter.prefix(),
            suffixes = ?filter.suffixes(),
            "Starting role-mapping sync"
        );

        let mut walker = GroupWalker::from_roots(self.directory.as_ref());
        let mut visited = Vec::new();
        let mut mappings = Vec::new();
        // Mapping name -> group path that claimed it in this run.
        let mut claimed: HashMap<String, String> = HashMap::new();

        while let Some(group) = walker.next().await {
            visited.push(group.path.clone());
            let Some(suffix) = filter.matches(&group.path) else {
                debug!(group = %group.path, "Group not selected for mapping");
                continue;
            };
            let mapping_name = self.naming.role_for(&group.path);
            let record = match claimed.get(&mapping_name) {
                Some(first) => self.conflict(&group, suffix, mapping_name, first),
                None => {
                    claimed.insert(mapping_name, group.path.clone());
                    self.upsert(&group, suffix).await?
                }
            };
            mappings.push(record);
        }

        let skipped_subtrees = walker
            .finish()?
            .into_iter()
            .map(|f| SkippedSubtree {
                path: f.path().to_string(),
                error_kind: f.error.kind(),
                error: f.error.to_string(),
            })
            .collect::<Vec<_>>();

        if !skipped_subtrees.is_empty() {
            warn!(
                run_id = %run_id,
                skipped = skipped_subtrees.len(),
                "Role-mapping sync finished with a partial group tree"
            );
        }
        info!(run_id = %run_id, visited = visited.len(), mapped = mappings.len(), "Role-mapping sync finished");

        Ok(MappingReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            visited,
            mappings,
            skipped_subtrees,
        })
    }

    async fn upsert(&self, group: &GroupNode, suffix: &str) -> ReconcileResult<MappingOutcome> {
        let role = self.naming.role_for(&group.path);
        let mapping_name = role.clone();
        let mut record = MappingOutcome {
            group_path: group.path.clone(),
            mapping_name: mapping_name.clone(),
            role: role.clone(),
            matched_suffix: suffix.to_string(),
            outcome: Outcome::Failed,
            error_kind: None,
            error: None,
        };

        let body = serde_json::to_value(RoleMappingBody::for_group(
            vec![role],
            &self.realm,
            &group.path,
        ))?;

        match self.put_mapping(&mapping_name, body).await {
            Ok(outcome) => {
                info!(group = %group.path, mapping = %mapping_name, outcome = %outcome, "Role mapping reconciled");
                record.outcome = outcome;
            }
            Err(e) if e.is_fatal() => return Err(ReconcileError::Aborted(e)),
            Err(e) => {
                warn!(group = %group.path, mapping = %mapping_name, error = %e, "Role mapping failed");
                record.error_kind = Some(e.kind());
                record.error = Some(e.to_string());
            }
        }
        Ok(record)
    }

    /// Record a group whose mapping name was already written by `first`.
    fn conflict(
        &self,
        group: &GroupNode,
        suffix: &str,
        mapping_name: String,
        first: &str,
    ) -> MappingOutcome {
        let error = BackendError::rejected(
            "create role_mapping",
            None,
            format!("mapping '{mapping_name}' already bound to group '{first}' in this run"),
        );
        warn!(group = %group.path, mapping = %mapping_name, first = %first, "Role mapping name collision");
        MappingOutcome {
            group_path: group.path.clone(),
            role: mapping_name.clone(),
            mapping_name,
            matched_suffix: suffix.to_string(),
            outcome: Outcome::Failed,
            error_kind: Some(error.kind()),
            error: Some(error.to_string()),
        }
    }

    /// Full-replace upsert: `Created` when absent, `Updated` otherwise.
    async fn put_mapping(&self, name: &str, body: serde_json::Value) -> BackendResult<Outcome> {
        let kind = ResourceKind::RoleMapping;
        if self.backend.exists(kind, name).await? {
            self.backend
                .update(kind, name, &body)
                .await?
                .require("update", kind, name)?;
            Ok(Outcome::Updated)
        } else {
            self.backend
                .create(&ResourceSpec::new(kind, name, body))
                .await?
                .require("create", kind, name)?;
            Ok(Outcome::Created)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> SuffixFilter {
        SuffixFilter::new("kibana", ["admin", "viewer"])
    }

    #[test]
    fn test_suffix_filter_selects_matching_groups() {
        let filter = filter();
        assert_eq!(filter.matches("/kibana/teamadmin"), Some("admin"));
        assert_eq!(filter.matches("/kibana/opsviewer"), Some("viewer"));
        assert_eq!(filter.matches("/kibana/teamlead"), None);
    }

    #[test]
    fn test_suffix_filter_requires_prefix() {
        let filter = filter();
        assert_eq!(filter.matches("/jira/teamadmin"), None);
        assert_eq!(filter.matches("/kibanaadmin"), None);
        assert_eq!(filter.matches("/kibana"), None);
        assert_eq!(filter.matches("/kibana/"), None);
    }

    #[test]
    fn test_first_suffix_wins() {
        let filter = SuffixFilter::new("/kibana/", ["viewer", "rviewer"]);
        assert_eq!(filter.matches("/kibana/opsrviewer"), Some("viewer"));
    }

    #[test]
    fn test_empty_suffixes_accept_everything_under_prefix() {
        let filter = SuffixFilter::new("/kibana", Vec::<String>::new());
        assert_eq!(filter.matches("/kibana/test"), Some(""));
        assert_eq!(filter.matches("/other/test"), None);
    }

    #[test]
    fn test_nested_paths_match_on_last_segment() {
        let filter = filter();
        assert_eq!(filter.matches("/kibana/billing/kibanabillingadmin"), Some("admin"));
    }

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(
            SuffixFilter::parse_suffixes("admin, viewer\tread"),
            vec!["admin", "viewer", "read"]
        );
    }

    #[test]
    fn test_mapping_naming() {
        assert_eq!(MappingNaming::LastSegment.role_for("/kibana/teamadmin"), "teamadmin");
        assert_eq!(MappingNaming::ViewerSuffix.role_for("/kibana/test"), "test-viewer");
    }
}
