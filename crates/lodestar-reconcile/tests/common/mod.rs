//! In-memory backends for reconciliation tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use lodestar_core::{
    Ack, BackendError, BackendResult, GroupDirectory, GroupNode, IdentityAdmin, ResourceBackend,
    ResourceKind, ResourceSpec, TenantName,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

pub fn tenant(raw: &str) -> TenantName {
    TenantName::parse(raw).unwrap()
}

pub fn tenants(raw: &[&str]) -> Vec<TenantName> {
    raw.iter().map(|t| tenant(t)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Get,
    Create,
    Update,
}

/// Resource store with failure injection and a call log.
#[derive(Default)]
pub struct InMemoryBackend {
    store: Mutex<HashMap<(ResourceKind, String), Value>>,
    failures: Mutex<Vec<(Op, ResourceKind, String, BackendError)>>,
    unacknowledged: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
    cancel_on_create: Mutex<Option<(String, CancellationToken)>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that already holds the aggregated role with no grants.
    pub fn with_aggregated_role(role: &str) -> Self {
        let backend = Self::new();
        backend.insert(
            ResourceKind::Role,
            role,
            json!({ "cluster": [], "indices": [], "applications": [] }),
        );
        backend
    }

    pub fn insert(&self, kind: ResourceKind, name: &str, body: Value) {
        self.store
            .lock()
            .unwrap()
            .insert((kind, name.to_string()), body);
    }

    pub fn body(&self, kind: ResourceKind, name: &str) -> Option<Value> {
        self.store
            .lock()
            .unwrap()
            .get(&(kind, name.to_string()))
            .cloned()
    }

    pub fn contains(&self, kind: ResourceKind, name: &str) -> bool {
        self.body(kind, name).is_some()
    }

    pub fn len(&self) -> usize {
        self.store.lock().unwrap().len()
    }

    /// Fail every `op` on the named resource with `error`.
    pub fn fail(&self, op: Op, kind: ResourceKind, name: &str, error: BackendError) {
        self.failures
            .lock()
            .unwrap()
            .push((op, kind, name.to_string(), error));
    }

    /// Answer writes to `name` with `acknowledged: false`.
    pub fn unacknowledge(&self, name: &str) {
        self.unacknowledged.lock().unwrap().insert(name.to_string());
    }

    /// Cancel `token` right after `name` is created.
    pub fn cancel_on_create(&self, name: &str, token: CancellationToken) {
        *self.cancel_on_create.lock().unwrap() = Some((name.to_string(), token));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of logged calls of `op` (any resource).
    pub fn count(&self, op: Op) -> usize {
        let prefix = format!("{op:?} ").to_lowercase();
        self.calls()
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    /// Index patterns granted by a role body's `indices` entries.
    pub fn granted_patterns(&self, role: &str) -> Vec<String> {
        self.body(ResourceKind::Role, role)
            .and_then(|b| b.get("indices").and_then(Value::as_array).cloned())
            .unwrap_or_default()
            .iter()
            .flat_map(|entry| {
                entry["names"]
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|n| n.as_str().map(str::to_string))
            })
            .collect()
    }

    fn log(&self, op: Op, kind: ResourceKind, name: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{} {kind} {name}", format!("{op:?}").to_lowercase()));
    }

    fn injected(&self, op: Op, kind: ResourceKind, name: &str) -> BackendResult<()> {
        let failures = self.failures.lock().unwrap();
        match failures
            .iter()
            .find(|(o, k, n, _)| *o == op && *k == kind && n == name)
        {
            Some((_, _, _, e)) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn ack(&self, name: &str) -> Ack {
        if self.unacknowledged.lock().unwrap().contains(name) {
            Ack::unacknowledged()
        } else {
            Ack::accepted()
        }
    }
}

#[async_trait]
impl ResourceBackend for InMemoryBackend {
    async fn get(&self, kind: ResourceKind, name: &str) -> BackendResult<Value> {
        self.log(Op::Get, kind, name);
        self.injected(Op::Get, kind, name)?;
        let body = self.body(kind, name);
        // Let concurrent writers interleave between a read and its write-back.
        tokio::task::yield_now().await;
        body.ok_or_else(|| BackendError::not_found(kind, name))
    }

    async fn create(&self, spec: &ResourceSpec) -> BackendResult<Ack> {
        self.log(Op::Create, spec.kind, &spec.name);
        self.injected(Op::Create, spec.kind, &spec.name)?;
        if spec.kind == ResourceKind::Index && self.contains(spec.kind, &spec.name) {
            return Err(BackendError::rejected(
                "create index",
                Some(400),
                "resource_already_exists_exception",
            ));
        }
        self.insert(spec.kind, &spec.name, spec.body.clone());
        if let Some((name, token)) = self.cancel_on_create.lock().unwrap().as_ref() {
            if *name == spec.name {
                token.cancel();
            }
        }
        Ok(self.ack(&spec.name))
    }

    async fn update(&self, kind: ResourceKind, name: &str, body: &Value) -> BackendResult<Ack> {
        self.log(Op::Update, kind, name);
        self.injected(Op::Update, kind, name)?;
        self.insert(kind, name, body.clone());
        Ok(self.ack(name))
    }
}

/// Identity provider holding one realm's groups and realm roles.
#[derive(Default)]
pub struct InMemoryIdp {
    realms: Mutex<HashSet<String>>,
    groups: Mutex<Vec<GroupNode>>,
    roles: Mutex<HashSet<String>>,
    assignments: Mutex<HashSet<(String, String)>>,
    failing_children: Mutex<HashMap<String, BackendError>>,
    failing_creates: Mutex<HashMap<String, BackendError>>,
    roots_error: Mutex<Option<BackendError>>,
    next_id: Mutex<u32>,
}

impl InMemoryIdp {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest from slash paths; parents are created as needed.
    pub fn with_paths(paths: &[&str]) -> Self {
        let idp = Self::new();
        for path in paths {
            let mut parent: Option<GroupNode> = None;
            for segment in path.trim_matches('/').split('/') {
                let existing = idp.node_named(parent.as_ref(), segment);
                parent = Some(match existing {
                    Some(node) => node,
                    None => idp.add(parent.as_ref(), segment),
                });
            }
        }
        idp
    }

    pub fn add_realm(&self, realm: &str) {
        self.realms.lock().unwrap().insert(realm.to_string());
    }

    pub fn has_realm(&self, realm: &str) -> bool {
        self.realms.lock().unwrap().contains(realm)
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.lock().unwrap().contains(role)
    }

    pub fn paths(&self) -> Vec<String> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .map(|g| g.path.clone())
            .collect()
    }

    pub fn node(&self, path: &str) -> Option<GroupNode> {
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.path == path)
            .cloned()
    }

    pub fn is_assigned(&self, path: &str, role: &str) -> bool {
        self.node(path).is_some_and(|g| {
            self.assignments
                .lock()
                .unwrap()
                .contains(&(g.id, role.to_string()))
        })
    }

    /// Listing the children of the group at `path` fails with `error`.
    pub fn fail_children(&self, path: &str, error: BackendError) {
        self.failing_children
            .lock()
            .unwrap()
            .insert(path.to_string(), error);
    }

    /// Creating a group named `name` fails with `error`.
    pub fn fail_create(&self, name: &str, error: BackendError) {
        self.failing_creates
            .lock()
            .unwrap()
            .insert(name.to_string(), error);
    }

    pub fn fail_roots(&self, error: BackendError) {
        *self.roots_error.lock().unwrap() = Some(error);
    }

    fn node_named(&self, parent: Option<&GroupNode>, name: &str) -> Option<GroupNode> {
        let parent_id = parent.map(|p| p.id.clone());
        self.groups
            .lock()
            .unwrap()
            .iter()
            .find(|g| g.parent_id == parent_id && g.name == name)
            .cloned()
    }

    fn add(&self, parent: Option<&GroupNode>, name: &str) -> GroupNode {
        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            format!("g{}", *next)
        };
        let node = match parent {
            Some(parent) => GroupNode::child_of(parent, id, name),
            None => GroupNode::root(id, name),
        };
        self.groups.lock().unwrap().push(node.clone());
        node
    }
}

#[async_trait]
impl GroupDirectory for InMemoryIdp {
    async fn list_roots(&self) -> BackendResult<Vec<GroupNode>> {
        if let Some(e) = self.roots_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.parent_id.is_none())
            .cloned()
            .collect())
    }

    async fn list_children(&self, parent: &GroupNode) -> BackendResult<Vec<GroupNode>> {
        if let Some(e) = self.failing_children.lock().unwrap().get(&parent.path) {
            return Err(e.clone());
        }
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.parent_id.as_deref() == Some(parent.id.as_str()))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IdentityAdmin for InMemoryIdp {
    async fn realm_exists(&self, realm: &str) -> BackendResult<bool> {
        Ok(self.has_realm(realm))
    }

    async fn create_realm(&self, realm: &str) -> BackendResult<Ack> {
        self.add_realm(realm);
        Ok(Ack::accepted())
    }

    async fn create_group(&self, parent: Option<&GroupNode>, name: &str) -> BackendResult<GroupNode> {
        if let Some(e) = self.failing_creates.lock().unwrap().get(name) {
            return Err(e.clone());
        }
        if self.node_named(parent, name).is_some() {
            return Err(BackendError::rejected("create group", Some(409), "conflict"));
        }
        Ok(self.add(parent, name))
    }

    async fn realm_role_exists(&self, role: &str) -> BackendResult<bool> {
        Ok(self.has_role(role))
    }

    async fn create_realm_role(&self, role: &str) -> BackendResult<Ack> {
        self.roles.lock().unwrap().insert(role.to_string());
        Ok(Ack::accepted())
    }

    async fn group_has_realm_role(&self, group: &GroupNode, role: &str) -> BackendResult<bool> {
        Ok(self
            .assignments
            .lock()
            .unwrap()
            .contains(&(group.id.clone(), role.to_string())))
    }

    async fn assign_realm_role(&self, group: &GroupNode, role: &str) -> BackendResult<Ack> {
        if !self.has_role(role) {
            return Err(BackendError::not_found(ResourceKind::RealmRole, role));
        }
        self.assignments
            .lock()
            .unwrap()
            .insert((group.id.clone(), role.to_string()));
        Ok(Ack::accepted())
    }
}
