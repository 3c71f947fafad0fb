//! Aggregated-role grant merge.
//!
//! Several tenants append an index grant to one shared role. The backend only
//! offers full-body replace, so each append is a read-modify-write. Writers
//! for the same role name go through one async mutex so concurrent tenant
//! tasks never overwrite each other's entries.

use std::collections::HashMap;
use std::sync::Arc;

use lodestar_core::traits::expect_object;
use lodestar_core::{BackendResult, ResourceBackend, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Result of one merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantOutcome {
    /// The grant was appended and the role written back.
    Added,
    /// An entry already lists the pattern; nothing was written.
    AlreadyPresent,
    /// The aggregated role does not exist; nothing was written.
    RoleNotFound,
}

/// Append `{names: [pattern], privileges}` to the role's `indices` unless an
/// entry already lists `pattern`.
///
/// Returns whether the body changed. Every other entry and top-level field is
/// left untouched. A missing `indices` field is treated as empty.
pub fn merge_index_grant(
    role: &mut Map<String, Value>,
    role_name: &str,
    pattern: &str,
    privileges: &[String],
) -> BackendResult<bool> {
    let indices = role
        .entry("indices")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(entries) = indices else {
        return Err(lodestar_core::BackendError::malformed(format!(
            "role '{role_name}' has a non-array 'indices' field"
        )));
    };

    let listed = entries.iter().any(|entry| {
        entry
            .get("names")
            .and_then(Value::as_array)
            .is_some_and(|names| names.iter().any(|n| n.as_str() == Some(pattern)))
    });
    if listed {
        return Ok(false);
    }

    entries.push(serde_json::json!({
        "names": [pattern],
        "privileges": privileges,
    }));
    Ok(true)
}

/// Serialized read-modify-write of shared roles.
pub struct GrantMerger {
    backend: Arc<dyn ResourceBackend>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl GrantMerger {
    pub fn new(backend: Arc<dyn ResourceBackend>) -> Self {
        Self {
            backend,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, role_name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(role_name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Grant `privileges` on `pattern` through the role `role_name`.
    ///
    /// Fetch failures other than "not found" and write failures are returned
    /// as errors; a missing role is the [`GrantOutcome::RoleNotFound`] outcome.
    pub async fn merge(
        &self,
        role_name: &str,
        pattern: &str,
        privileges: &[String],
    ) -> BackendResult<GrantOutcome> {
        let lock = self.lock_for(role_name).await;
        let _guard = lock.lock().await;

        let body = match self.backend.get(ResourceKind::Role, role_name).await {
            Ok(body) => body,
            Err(e) if e.is_not_found() => {
                warn!(role = %role_name, pattern = %pattern, "Aggregated role does not exist, skipping grant");
                return Ok(GrantOutcome::RoleNotFound);
            }
            Err(e) => return Err(e),
        };

        let mut role = expect_object(body, ResourceKind::Role, role_name)?;
        if !merge_index_grant(&mut role, role_name, pattern, privileges)? {
            debug!(role = %role_name, pattern = %pattern, "Aggregated role already grants pattern");
            return Ok(GrantOutcome::AlreadyPresent);
        }

        self.backend
            .update(ResourceKind::Role, role_name, &Value::Object(role))
            .await?
            .require("update aggregated role", ResourceKind::Role, role_name)?;
        info!(role = %role_name, pattern = %pattern, "Aggregated role granted pattern");
        Ok(GrantOutcome::Added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn read() -> Vec<String> {
        vec!["read".to_string()]
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_appends_new_pattern_and_preserves_fields() {
        let mut role = object(json!({
            "cluster": ["monitor"],
            "indices": [{ "names": ["a-*"], "privileges": ["read"] }],
            "applications": [{ "application": "kibana-.kibana", "privileges": ["all"], "resources": ["*"] }],
            "metadata": { "owner": "ops" }
        }));
        let before = role.clone();

        assert!(merge_index_grant(&mut role, "teamlead-viewer", "b-*", &read()).unwrap());

        assert_eq!(
            role["indices"],
            json!([
                { "names": ["a-*"], "privileges": ["read"] },
                { "names": ["b-*"], "privileges": ["read"] }
            ])
        );
        for key in ["cluster", "applications", "metadata"] {
            assert_eq!(role[key], before[key]);
        }
    }

    #[test]
    fn test_existing_pattern_is_noop() {
        let mut role = object(json!({
            "indices": [{ "names": ["x-*", "b-*"], "privileges": ["read", "view_index_metadata"] }]
        }));
        let before = role.clone();

        assert!(!merge_index_grant(&mut role, "teamlead-viewer", "b-*", &read()).unwrap());
        assert_eq!(role, before);
    }

    #[test]
    fn test_merge_twice_leaves_one_entry() {
        let mut role = object(json!({ "indices": [] }));
        merge_index_grant(&mut role, "r", "b-*", &read()).unwrap();
        merge_index_grant(&mut role, "r", "b-*", &read()).unwrap();
        assert_eq!(role["indices"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_indices_field_is_created() {
        let mut role = object(json!({ "cluster": [] }));
        assert!(merge_index_grant(&mut role, "r", "b-*", &read()).unwrap());
        assert_eq!(role["indices"], json!([{ "names": ["b-*"], "privileges": ["read"] }]));
    }

    #[test]
    fn test_non_array_indices_is_malformed() {
        let mut role = object(json!({ "indices": "oops" }));
        let err = merge_index_grant(&mut role, "r", "b-*", &read()).unwrap_err();
        assert_eq!(err.kind(), lodestar_core::FailureKind::Malformed);
    }
}
