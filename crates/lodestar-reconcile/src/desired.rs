//! Desired state of one tenant.
//!
//! [`DesiredState::generate`] is a pure function of the tenant, the
//! provisioning defaults and the role naming scheme. The order of the
//! generated specs is the order they are applied in: the template references
//! the policy, the bootstrap index relies on the template, and the data view
//! and roles refer to the index pattern.

use lodestar_core::naming::{self, TenantName};
use lodestar_core::{ResourceKind, ResourceSpec, RoleKind};
use lodestar_search::models::{
    ApplicationPrivileges, CreateIndexBody, DataViewAttributes, DataViewBody, DeleteAction,
    DeleteActions, DeletePhase, HotActions, HotPhase, IndexPrivileges, IndexSettings,
    IndexTemplateBody, LifecyclePolicyBody, LifecycleSettings, Phases, Policy, RoleBody,
    RolloverAction, SetPriorityAction, TemplateSection, TemplateSettings, TransientMetadata,
};
use serde::{Deserialize, Serialize};

use crate::defaults::{ProvisioningDefaults, RolePrivileges};
use crate::error::ReconcileResult;

/// Roles generated per tenant, in order.
pub const TENANT_ROLE_KINDS: [RoleKind; 2] = [RoleKind::Read, RoleKind::Admin];

/// How per-tenant role names are derived.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", content = "prefix", rename_all = "snake_case")]
pub enum RoleNaming {
    /// `{tenant}-{kind}`
    #[default]
    Dashed,
    /// `{prefix}{tenant}{kind}`
    GroupPrefixed(String),
}

impl RoleNaming {
    #[must_use]
    pub fn role_name(&self, tenant: &TenantName, kind: RoleKind) -> String {
        match self {
            Self::Dashed => naming::role_name(tenant, kind),
            Self::GroupPrefixed(prefix) => naming::prefixed_role_name(prefix, tenant, kind),
        }
    }
}

/// Ordered resource specs for one tenant.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    pub tenant: TenantName,
    pub specs: Vec<ResourceSpec>,
}

impl DesiredState {
    /// Generate the tenant's specs: lifecycle policy, index template,
    /// bootstrap index, data view, read role, admin role.
    pub fn generate(
        tenant: &TenantName,
        defaults: &ProvisioningDefaults,
        roles: &RoleNaming,
    ) -> ReconcileResult<Self> {
        let mut specs = vec![
            spec(
                ResourceKind::LifecyclePolicy,
                naming::policy_name(tenant),
                &lifecycle_policy(defaults),
            )?,
            spec(
                ResourceKind::IndexTemplate,
                naming::template_name(tenant),
                &index_template(tenant, defaults),
            )?,
            spec(
                ResourceKind::Index,
                naming::bootstrap_index_name(tenant),
                &CreateIndexBody::with_write_alias(naming::alias_name(tenant)),
            )?,
            spec(
                ResourceKind::DataView,
                naming::data_view_id(tenant),
                &data_view(tenant, defaults),
            )?,
        ];
        for kind in TENANT_ROLE_KINDS {
            specs.push(spec(
                ResourceKind::Role,
                roles.role_name(tenant, kind),
                &role_body(
                    &naming::group_role_pattern(tenant),
                    defaults.privileges(kind),
                    defaults,
                ),
            )?);
        }
        Ok(Self {
            tenant: tenant.clone(),
            specs,
        })
    }

    /// Names of the generated specs, in order.
    pub fn names(&self) -> impl Iterator<Item = (ResourceKind, &str)> {
        self.specs.iter().map(|s| (s.kind, s.name.as_str()))
    }
}

fn spec<T: Serialize>(kind: ResourceKind, name: String, body: &T) -> ReconcileResult<ResourceSpec> {
    Ok(ResourceSpec::new(kind, name, serde_json::to_value(body)?))
}

fn lifecycle_policy(d: &ProvisioningDefaults) -> LifecyclePolicyBody {
    LifecyclePolicyBody {
        policy: Policy {
            phases: Phases {
                hot: HotPhase {
                    min_age: d.hot_min_age.clone(),
                    actions: HotActions {
                        rollover: RolloverAction {
                            max_age: d.rollover_max_age.clone(),
                            max_primary_shard_size: d.rollover_max_primary_shard_size.clone(),
                        },
                        set_priority: SetPriorityAction {
                            priority: d.hot_priority,
                        },
                    },
                },
                delete: DeletePhase {
                    min_age: d.delete_min_age.clone(),
                    actions: DeleteActions {
                        delete: DeleteAction {
                            delete_searchable_snapshot: d.delete_searchable_snapshot,
                        },
                    },
                },
            },
        },
    }
}

fn index_template(tenant: &TenantName, d: &ProvisioningDefaults) -> IndexTemplateBody {
    IndexTemplateBody {
        index_patterns: vec![naming::index_pattern(tenant)],
        template: TemplateSection {
            settings: TemplateSettings {
                index: IndexSettings {
                    lifecycle: LifecycleSettings {
                        name: naming::policy_name(tenant),
                        rollover_alias: naming::alias_name(tenant),
                    },
                    number_of_shards: d.number_of_shards,
                    number_of_replicas: d.number_of_replicas,
                    codec: d.codec.clone(),
                },
            },
        },
        priority: d.template_priority,
    }
}

fn data_view(tenant: &TenantName, d: &ProvisioningDefaults) -> DataViewBody {
    DataViewBody {
        attributes: DataViewAttributes {
            name: tenant.to_string(),
            title: naming::index_pattern(tenant),
            time_field_name: d.time_field.clone(),
        },
    }
}

/// Role scoped to one index pattern, with the matching dashboard features.
#[must_use]
pub fn role_body(pattern: &str, privileges: &RolePrivileges, d: &ProvisioningDefaults) -> RoleBody {
    RoleBody {
        cluster: Vec::new(),
        indices: vec![IndexPrivileges {
            names: vec![pattern.to_string()],
            privileges: privileges.indices.clone(),
        }],
        applications: vec![ApplicationPrivileges {
            application: d.dashboard_application.clone(),
            privileges: privileges.features.clone(),
            resources: d.dashboard_resources.clone(),
        }],
        run_as: Vec::new(),
        metadata: serde_json::Map::new(),
        transient_metadata: TransientMetadata { enabled: true },
    }
}
