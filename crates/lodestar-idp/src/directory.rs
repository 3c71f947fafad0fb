//! [`GroupDirectory`] and [`IdentityAdmin`] adapters over [`IdpClient`].

use async_trait::async_trait;
use lodestar_core::group::child_path;
use lodestar_core::{
    Ack, BackendError, BackendResult, GroupDirectory, GroupNode, IdentityAdmin, ResourceKind,
};
use tracing::debug;

use crate::client::IdpClient;
use crate::error::IdpError;
use crate::models::GroupRepresentation;

/// Build a node from a listing entry.
///
/// The server-reported path is kept when it extends the parent's path;
/// otherwise (missing, or inconsistent) it is computed from the parent.
pub(crate) fn node_from(rep: GroupRepresentation, parent: Option<&GroupNode>) -> GroupNode {
    let computed = match parent {
        Some(parent) => child_path(&parent.path, &rep.name),
        None => format!("/{}", rep.name),
    };
    let path = match rep.path {
        Some(reported) if reported == computed => reported,
        Some(reported) => {
            debug!(reported = %reported, computed = %computed, "Ignoring inconsistent group path");
            computed
        }
        None => computed,
    };
    GroupNode {
        id: rep.id,
        name: rep.name,
        parent_id: parent.map(|p| p.id.clone()),
        path,
    }
}

#[async_trait]
impl GroupDirectory for IdpClient {
    async fn list_roots(&self) -> BackendResult<Vec<GroupNode>> {
        let groups = self
            .list_top_level_groups()
            .await
            .map_err(|e| e.into_backend(ResourceKind::Group, "/"))?;
        Ok(groups.into_iter().map(|g| node_from(g, None)).collect())
    }

    async fn list_children(&self, parent: &GroupNode) -> BackendResult<Vec<GroupNode>> {
        let groups = self
            .list_child_groups(&parent.id)
            .await
            .map_err(|e| e.into_backend(ResourceKind::Group, &parent.path))?;
        Ok(groups
            .into_iter()
            .map(|g| node_from(g, Some(parent)))
            .collect())
    }
}

#[async_trait]
impl IdentityAdmin for IdpClient {
    async fn realm_exists(&self, realm: &str) -> BackendResult<bool> {
        match self.get_realm(realm).await {
            Ok(_) => Ok(true),
            Err(IdpError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into_backend(ResourceKind::Realm, realm)),
        }
    }

    async fn create_realm(&self, realm: &str) -> BackendResult<Ack> {
        match IdpClient::create_realm(self, realm).await {
            Ok(()) | Err(IdpError::Conflict(_)) => Ok(Ack::accepted()),
            Err(e) => Err(e.into_backend(ResourceKind::Realm, realm)),
        }
    }

    async fn create_group(
        &self,
        parent: Option<&GroupNode>,
        name: &str,
    ) -> BackendResult<GroupNode> {
        let display = match parent {
            Some(p) => child_path(&p.path, name),
            None => format!("/{name}"),
        };
        match IdpClient::create_group(self, parent.map(|p| p.id.as_str()), name).await {
            Ok(id) => Ok(match parent {
                Some(parent) => GroupNode::child_of(parent, id, name),
                None => GroupNode::root(id, name),
            }),
            Err(IdpError::Conflict(detail)) => {
                // Created concurrently: resolve the existing sibling.
                self.find_group(parent, name).await?.ok_or_else(|| {
                    BackendError::rejected(
                        format!("create {} '{display}'", ResourceKind::Group),
                        Some(409),
                        detail,
                    )
                })
            }
            Err(e) => Err(e.into_backend(ResourceKind::Group, &display)),
        }
    }

    async fn realm_role_exists(&self, role: &str) -> BackendResult<bool> {
        match self.get_realm_role(role).await {
            Ok(_) => Ok(true),
            Err(IdpError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into_backend(ResourceKind::RealmRole, role)),
        }
    }

    async fn create_realm_role(&self, role: &str) -> BackendResult<Ack> {
        match IdpClient::create_realm_role(self, role).await {
            Ok(()) | Err(IdpError::Conflict(_)) => Ok(Ack::accepted()),
            Err(e) => Err(e.into_backend(ResourceKind::RealmRole, role)),
        }
    }

    async fn group_has_realm_role(&self, group: &GroupNode, role: &str) -> BackendResult<bool> {
        let roles = self
            .group_realm_roles(&group.id)
            .await
            .map_err(|e| e.into_backend(ResourceKind::GroupRoleAssignment, &group.path))?;
        Ok(roles.iter().any(|r| r.name == role))
    }

    async fn assign_realm_role(&self, group: &GroupNode, role: &str) -> BackendResult<Ack> {
        let representation = self
            .get_realm_role(role)
            .await
            .map_err(|e| e.into_backend(ResourceKind::RealmRole, role))?;
        self.assign_realm_roles(&group.id, std::slice::from_ref(&representation))
            .await
            .map_err(|e| {
                e.into_backend(
                    ResourceKind::GroupRoleAssignment,
                    &format!("{} -> {role}", group.path),
                )
            })?;
        Ok(Ack::accepted())
    }
}
