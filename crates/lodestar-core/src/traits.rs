//! Backend adapter traits.
//!
//! Capability-style traits over the two backend protocols. Implementations
//! perform network calls; they never panic and report every failure through
//! [`BackendError`].

use async_trait::async_trait;

use crate::error::{BackendError, BackendResult};
use crate::group::GroupNode;
use crate::resource::{Ack, ResourceKind, ResourceSpec};

/// Create/read/update access to named resources on a backend.
#[async_trait]
pub trait ResourceBackend: Send + Sync {
    /// Fetch a resource body by name.
    ///
    /// Returns [`BackendError::NotFound`] when the backend reports the
    /// resource as absent.
    async fn get(&self, kind: ResourceKind, name: &str) -> BackendResult<serde_json::Value>;

    /// Whether a resource exists.
    ///
    /// "Not found" maps to `Ok(false)`; every other failure is returned as-is.
    async fn exists(&self, kind: ResourceKind, name: &str) -> BackendResult<bool> {
        match self.get(kind, name).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create a resource from its specification.
    async fn create(&self, spec: &ResourceSpec) -> BackendResult<Ack>;

    /// Replace a resource with a full body (no partial patch).
    async fn update(
        &self,
        kind: ResourceKind,
        name: &str,
        body: &serde_json::Value,
    ) -> BackendResult<Ack>;
}

/// Read access to the identity provider's group forest.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// List top-level groups.
    async fn list_roots(&self) -> BackendResult<Vec<GroupNode>>;

    /// List the direct children of a group.
    async fn list_children(&self, parent: &GroupNode) -> BackendResult<Vec<GroupNode>>;

    /// Find a direct child (or top-level group when `parent` is `None`) by name.
    async fn find_group(
        &self,
        parent: Option<&GroupNode>,
        name: &str,
    ) -> BackendResult<Option<GroupNode>> {
        let siblings = match parent {
            Some(parent) => self.list_children(parent).await?,
            None => self.list_roots().await?,
        };
        Ok(siblings.into_iter().find(|g| g.name == name))
    }
}

/// Write primitives for realms, groups and realm roles on the identity provider.
#[async_trait]
pub trait IdentityAdmin: GroupDirectory {
    async fn realm_exists(&self, realm: &str) -> BackendResult<bool>;

    async fn create_realm(&self, realm: &str) -> BackendResult<Ack>;

    /// Create a group under `parent` (top-level when `None`) and return it.
    async fn create_group(&self, parent: Option<&GroupNode>, name: &str)
        -> BackendResult<GroupNode>;

    async fn realm_role_exists(&self, role: &str) -> BackendResult<bool>;

    async fn create_realm_role(&self, role: &str) -> BackendResult<Ack>;

    /// Whether `role` is directly assigned to `group`.
    async fn group_has_realm_role(&self, group: &GroupNode, role: &str) -> BackendResult<bool>;

    async fn assign_realm_role(&self, group: &GroupNode, role: &str) -> BackendResult<Ack>;
}

/// Ensure a fetched body is a JSON object, the shape every role body has.
pub fn expect_object(
    value: serde_json::Value,
    kind: ResourceKind,
    name: &str,
) -> BackendResult<serde_json::Map<String, serde_json::Value>> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(BackendError::malformed(format!(
            "{kind} '{name}' is not a JSON object: {other}"
        ))),
    }
}
