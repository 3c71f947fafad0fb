//! Wire bodies for the search engine and its dashboard front-end.
//!
//! Field names mirror the backend's REST contract exactly; the structs exist
//! so the bodies are built with types instead of ad hoc JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ── Lifecycle policy ──────────────────────────────────────────────────

/// `PUT /_ilm/policy/{name}` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecyclePolicyBody {
    pub policy: Policy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub phases: Phases,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phases {
    pub hot: HotPhase,
    pub delete: DeletePhase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotPhase {
    pub min_age: String,
    pub actions: HotActions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotActions {
    pub rollover: RolloverAction,
    pub set_priority: SetPriorityAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolloverAction {
    pub max_age: String,
    pub max_primary_shard_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetPriorityAction {
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletePhase {
    pub min_age: String,
    pub actions: DeleteActions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteActions {
    pub delete: DeleteAction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteAction {
    pub delete_searchable_snapshot: bool,
}

// ── Index template ────────────────────────────────────────────────────

/// `PUT /_index_template/{name}` body (composable template).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexTemplateBody {
    pub index_patterns: Vec<String>,
    pub template: TemplateSection,
    pub priority: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSection {
    pub settings: TemplateSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSettings {
    pub index: IndexSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSettings {
    pub lifecycle: LifecycleSettings,
    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    pub codec: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleSettings {
    pub name: String,
    pub rollover_alias: String,
}

// ── Bootstrap index ───────────────────────────────────────────────────

/// `PUT /{index}` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIndexBody {
    pub aliases: BTreeMap<String, AliasSettings>,
}

impl CreateIndexBody {
    /// An index carrying exactly one alias, flagged as its write index.
    pub fn with_write_alias(alias: impl Into<String>) -> Self {
        let mut aliases = BTreeMap::new();
        aliases.insert(
            alias.into(),
            AliasSettings {
                is_write_index: true,
            },
        );
        Self { aliases }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasSettings {
    pub is_write_index: bool,
}

// ── Data view ─────────────────────────────────────────────────────────

/// `POST /api/saved_objects/index-pattern/{id}` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataViewBody {
    pub attributes: DataViewAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataViewAttributes {
    pub name: String,
    pub title: String,
    pub time_field_name: String,
}

// ── Roles ─────────────────────────────────────────────────────────────

/// `PUT /_security/role/{name}` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleBody {
    #[serde(default)]
    pub cluster: Vec<String>,
    #[serde(default)]
    pub indices: Vec<IndexPrivileges>,
    #[serde(default)]
    pub applications: Vec<ApplicationPrivileges>,
    #[serde(default)]
    pub run_as: Vec<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub transient_metadata: TransientMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexPrivileges {
    pub names: Vec<String>,
    pub privileges: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationPrivileges {
    pub application: String,
    pub privileges: Vec<String>,
    pub resources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransientMetadata {
    pub enabled: bool,
}

impl Default for TransientMetadata {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ── Role mappings ─────────────────────────────────────────────────────

/// `PUT /_security/role_mapping/{name}` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMappingBody {
    pub roles: Vec<String>,
    pub enabled: bool,
    pub rules: RoleMappingRules,
}

impl RoleMappingBody {
    /// Grant `roles` to members of `group_path` authenticated through `realm`.
    pub fn for_group(roles: Vec<String>, realm: &str, group_path: &str) -> Self {
        Self {
            roles,
            enabled: true,
            rules: RoleMappingRules {
                all: vec![
                    FieldRule::new("realm.name", realm),
                    FieldRule::new("groups", group_path),
                ],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMappingRules {
    pub all: Vec<FieldRule>,
}

/// `{"field": {"<name>": "<value>"}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    pub field: BTreeMap<String, String>,
}

impl FieldRule {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut field = BTreeMap::new();
        field.insert(name.into(), value.into());
        Self { field }
    }
}

// ── Responses ─────────────────────────────────────────────────────────

/// Generic `{"acknowledged": bool}` response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcknowledgedResponse {
    #[serde(default)]
    pub acknowledged: bool,
}

/// `GET /` response (subset).
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterInfo {
    #[serde(default)]
    pub cluster_name: String,
    #[serde(default)]
    pub version: ClusterVersion,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClusterVersion {
    #[serde(default)]
    pub number: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bootstrap_index_body_shape() {
        let body = serde_json::to_value(CreateIndexBody::with_write_alias("billing_logs")).unwrap();
        assert_eq!(
            body,
            json!({ "aliases": { "billing_logs": { "is_write_index": true } } })
        );
    }

    #[test]
    fn test_role_mapping_body_shape() {
        let body = RoleMappingBody::for_group(
            vec!["teamadmin".into()],
            "corp",
            "/kibana/teamadmin",
        );
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            json!({
                "roles": ["teamadmin"],
                "enabled": true,
                "rules": { "all": [
                    { "field": { "realm.name": "corp" } },
                    { "field": { "groups": "/kibana/teamadmin" } }
                ]}
            })
        );
    }

    #[test]
    fn test_data_view_uses_camel_case_time_field() {
        let body = DataViewBody {
            attributes: DataViewAttributes {
                name: "billing".into(),
                title: "billing-*".into(),
                time_field_name: "timestamp".into(),
            },
        };
        let value = serde_json::to_value(body).unwrap();
        assert_eq!(value["attributes"]["timeFieldName"], "timestamp");
    }

    #[test]
    fn test_role_body_defaults_on_sparse_input() {
        let role: RoleBody = serde_json::from_value(json!({ "indices": [] })).unwrap();
        assert!(role.cluster.is_empty());
        assert!(role.transient_metadata.enabled);
    }
}
