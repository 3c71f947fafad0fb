//! Constant parameters of the generated resources.

use lodestar_core::RoleKind;
use serde::{Deserialize, Serialize};

/// Index and dashboard privileges granted by one role kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePrivileges {
    /// Index privileges on the tenant's pattern.
    pub indices: Vec<String>,
    /// Dashboard feature privileges.
    pub features: Vec<String>,
}

impl RolePrivileges {
    fn new(indices: &[&str], features: &[&str]) -> Self {
        Self {
            indices: indices.iter().map(|s| (*s).to_string()).collect(),
            features: features.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Parameters shared by every tenant's generated resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisioningDefaults {
    pub hot_min_age: String,
    pub rollover_max_age: String,
    pub rollover_max_primary_shard_size: String,
    pub hot_priority: u32,
    pub delete_min_age: String,
    pub delete_searchable_snapshot: bool,

    pub number_of_shards: u32,
    pub number_of_replicas: u32,
    pub codec: String,
    pub template_priority: u32,

    pub time_field: String,
    pub dashboard_application: String,
    pub dashboard_resources: Vec<String>,

    pub read: RolePrivileges,
    pub admin: RolePrivileges,
    pub viewer: RolePrivileges,

    /// Index privileges appended to the aggregated role per tenant.
    pub aggregated_privileges: Vec<String>,
}

impl Default for ProvisioningDefaults {
    fn default() -> Self {
        Self {
            hot_min_age: "0ms".into(),
            rollover_max_age: "1d".into(),
            rollover_max_primary_shard_size: "3gb".into(),
            hot_priority: 100,
            delete_min_age: "14d".into(),
            delete_searchable_snapshot: true,

            number_of_shards: 3,
            number_of_replicas: 2,
            codec: "best_compression".into(),
            template_priority: 100,

            time_field: "timestamp".into(),
            dashboard_application: "kibana-.kibana".into(),
            dashboard_resources: vec!["space:default".into()],

            read: RolePrivileges::new(
                &["read"],
                &[
                    "feature_discover.read",
                    "feature_visualize.read",
                    "feature_dashboard.read",
                ],
            ),
            admin: RolePrivileges::new(
                &[
                    "read",
                    "write",
                    "create_index",
                    "delete_index",
                    "manage",
                    "index",
                    "create",
                    "delete",
                ],
                &[
                    "feature_discover.all",
                    "feature_visualize.all",
                    "feature_dashboard.all",
                    "feature_maps.all",
                    "feature_canvas.all",
                ],
            ),
            // Same grants as the aggregated teamlead viewer role.
            viewer: RolePrivileges::new(
                &["read"],
                &[
                    "feature_discover.read",
                    "feature_visualize.read",
                    "feature_dashboard.read",
                ],
            ),

            aggregated_privileges: vec!["read".into()],
        }
    }
}

impl ProvisioningDefaults {
    #[must_use]
    pub fn privileges(&self, kind: RoleKind) -> &RolePrivileges {
        match kind {
            RoleKind::Read => &self.read,
            RoleKind::Admin => &self.admin,
            RoleKind::Viewer => &self.viewer,
        }
    }
}
