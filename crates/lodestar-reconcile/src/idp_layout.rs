//! Identity-provider layout provisioning.
//!
//! Builds the realm, a two-level group hierarchy and one leaf group per
//! role suffix, each leaf carrying a realm role of the same name:
//!
//! ```text
//! /{group}/{subgroup}/{group}{subgroup}{suffix}   realm role {group}{subgroup}{suffix}
//! ```
//!
//! Every step is create-if-absent. A failed step skips the steps that depend
//! on it; sibling branches carry on.

use std::sync::Arc;

use lodestar_core::group::child_path;
use lodestar_core::{
    BackendResult, GroupNode, IdentityAdmin, Outcome, ResourceKind, ResourceOutcome,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ReconcileError, ReconcileResult};
use crate::report::LayoutReport;

/// Desired identity-provider layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutPlan {
    pub realm: String,
    /// Top-level groups, e.g. `["kibana"]`.
    pub groups: Vec<String>,
    /// Children of every top-level group, usually one per tenant.
    pub subgroups: Vec<String>,
    /// Leaf suffixes, e.g. `["read", "admin"]`.
    pub role_suffixes: Vec<String>,
}

impl LayoutPlan {
    /// Name shared by a leaf group and its realm role.
    #[must_use]
    pub fn role_key(group: &str, subgroup: &str, suffix: &str) -> String {
        format!("{group}{subgroup}{suffix}")
    }

    /// Every leaf role the plan produces, in apply order.
    #[must_use]
    pub fn role_keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        for group in &self.groups {
            for subgroup in &self.subgroups {
                for suffix in &self.role_suffixes {
                    keys.push(Self::role_key(group, subgroup, suffix));
                }
            }
        }
        keys
    }
}

/// Applies a [`LayoutPlan`] through an [`IdentityAdmin`].
pub struct IdpLayout {
    admin: Arc<dyn IdentityAdmin>,
}

impl IdpLayout {
    pub fn new(admin: Arc<dyn IdentityAdmin>) -> Self {
        Self { admin }
    }

    pub async fn apply(&self, plan: &LayoutPlan) -> ReconcileResult<LayoutReport> {
        let run_id = Uuid::new_v4();
        info!(
            run_id = %run_id,
            realm = %plan.realm,
            groups = plan.groups.len(),
            subgroups = plan.subgroups.len(),
            suffixes = plan.role_suffixes.len(),
            "Applying identity-provider layout"
        );

        let mut steps = Steps::default();
        let realm = self.ensure_realm(&plan.realm).await;
        if steps.record(ResourceKind::Realm, &plan.realm, realm)?.is_none() {
            steps.skip_all(plan);
            return Ok(LayoutReport {
                run_id,
                realm: plan.realm.clone(),
                steps: steps.0,
            });
        }

        for group_name in &plan.groups {
            let group = self.ensure_group(None, group_name).await;
            let Some(group) = steps.record(ResourceKind::Group, &format!("/{group_name}"), group)?
            else {
                steps.skip_group(plan, group_name);
                continue;
            };

            for subgroup_name in &plan.subgroups {
                let subgroup = self.ensure_group(Some(&group), subgroup_name).await;
                let subgroup_path = child_path(&group.path, subgroup_name);
                let Some(subgroup) = steps.record(ResourceKind::Group, &subgroup_path, subgroup)?
                else {
                    steps.skip_subgroup(plan, group_name, subgroup_name, &subgroup_path);
                    continue;
                };

                for suffix in &plan.role_suffixes {
                    let key = LayoutPlan::role_key(group_name, subgroup_name, suffix);
                    self.apply_leaf(&mut steps, &subgroup, &key).await?;
                }
            }
        }

        let report = LayoutReport {
            run_id,
            realm: plan.realm.clone(),
            steps: steps.0,
        };
        let summary = report.summary();
        info!(
            run_id = %run_id,
            created = summary.created,
            already_present = summary.already_present,
            failed = summary.failed,
            skipped = summary.skipped,
            "Identity-provider layout applied"
        );
        Ok(report)
    }

    /// Leaf group, realm role, then the assignment between them.
    async fn apply_leaf(
        &self,
        steps: &mut Steps,
        subgroup: &GroupNode,
        key: &str,
    ) -> ReconcileResult<()> {
        let leaf_path = child_path(&subgroup.path, key);
        let assignment = assignment_name(key, &leaf_path);

        let leaf = self.ensure_group(Some(subgroup), key).await;
        let Some(leaf) = steps.record(ResourceKind::Group, &leaf_path, leaf)? else {
            steps.skip(ResourceKind::RealmRole, key);
            steps.skip(ResourceKind::GroupRoleAssignment, &assignment);
            return Ok(());
        };

        let role = self.ensure_realm_role(key).await;
        if steps.record(ResourceKind::RealmRole, key, role)?.is_none() {
            steps.skip(ResourceKind::GroupRoleAssignment, &assignment);
            return Ok(());
        }

        let assigned = self.ensure_assignment(&leaf, key).await;
        steps.record(ResourceKind::GroupRoleAssignment, &assignment, assigned)?;
        Ok(())
    }

    async fn ensure_realm(&self, realm: &str) -> BackendResult<((), Outcome)> {
        if self.admin.realm_exists(realm).await? {
            return Ok(((), Outcome::AlreadyPresent));
        }
        self.admin
            .create_realm(realm)
            .await?
            .require("create", ResourceKind::Realm, realm)?;
        Ok(((), Outcome::Created))
    }

    async fn ensure_group(
        &self,
        parent: Option<&GroupNode>,
        name: &str,
    ) -> BackendResult<(GroupNode, Outcome)> {
        if let Some(existing) = self.admin.find_group(parent, name).await? {
            return Ok((existing, Outcome::AlreadyPresent));
        }
        let created = self.admin.create_group(parent, name).await?;
        Ok((created, Outcome::Created))
    }

    async fn ensure_realm_role(&self, role: &str) -> BackendResult<((), Outcome)> {
        if self.admin.realm_role_exists(role).await? {
            return Ok(((), Outcome::AlreadyPresent));
        }
        self.admin
            .create_realm_role(role)
            .await?
            .require("create", ResourceKind::RealmRole, role)?;
        Ok(((), Outcome::Created))
    }

    async fn ensure_assignment(&self, group: &GroupNode, role: &str) -> BackendResult<((), Outcome)> {
        if self.admin.group_has_realm_role(group, role).await? {
            return Ok(((), Outcome::AlreadyPresent));
        }
        self.admin.assign_realm_role(group, role).await?.require(
            "assign",
            ResourceKind::GroupRoleAssignment,
            &group.path,
        )?;
        Ok(((), Outcome::Created))
    }
}

fn assignment_name(role: &str, group_path: &str) -> String {
    format!("{role} -> {group_path}")
}

/// Ordered step records.
#[derive(Default)]
struct Steps(Vec<ResourceOutcome>);

impl Steps {
    /// Record a step result. Returns the step's value on success, `None` on a
    /// recoverable failure, and aborts the run on a fatal one.
    fn record<T>(
        &mut self,
        kind: ResourceKind,
        name: &str,
        result: BackendResult<(T, Outcome)>,
    ) -> ReconcileResult<Option<T>> {
        match result {
            Ok((value, outcome)) => {
                info!(kind = %kind, name = %name, outcome = %outcome, "Layout step reconciled");
                self.0.push(ResourceOutcome::new(kind, name, outcome));
                Ok(Some(value))
            }
            Err(e) if e.is_fatal() => Err(ReconcileError::Aborted(e)),
            Err(e) => {
                warn!(kind = %kind, name = %name, error = %e, "Layout step failed, skipping dependent steps");
                self.0.push(ResourceOutcome::failed(kind, name, &e));
                Ok(None)
            }
        }
    }

    fn skip(&mut self, kind: ResourceKind, name: &str) {
        self.0.push(ResourceOutcome::new(kind, name, Outcome::Skipped));
    }

    fn skip_all(&mut self, plan: &LayoutPlan) {
        for group in &plan.groups {
            self.skip(ResourceKind::Group, &format!("/{group}"));
            self.skip_group(plan, group);
        }
    }

    fn skip_group(&mut self, plan: &LayoutPlan, group: &str) {
        let group_path = format!("/{group}");
        for subgroup in &plan.subgroups {
            let subgroup_path = child_path(&group_path, subgroup);
            self.skip(ResourceKind::Group, &subgroup_path);
            self.skip_subgroup(plan, group, subgroup, &subgroup_path);
        }
    }

    fn skip_subgroup(&mut self, plan: &LayoutPlan, group: &str, subgroup: &str, path: &str) {
        for suffix in &plan.role_suffixes {
            let key = LayoutPlan::role_key(group, subgroup, suffix);
            let leaf_path = child_path(path, &key);
            self.skip(ResourceKind::Group, &leaf_path);
            self.skip(ResourceKind::RealmRole, &key);
            self.skip(ResourceKind::GroupRoleAssignment, &assignment_name(&key, &leaf_path));
        }
    }
}
