//! Group walker behavior over an in-memory directory.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lodestar_core::{BackendError, BackendResult, GroupDirectory, GroupNode};
use lodestar_idp::walker::GroupWalker;

/// Directory backed by a parent-id → children map.
#[derive(Default)]
struct FakeDirectory {
    roots: Vec<GroupNode>,
    children: HashMap<String, Vec<GroupNode>>,
    failing: HashMap<String, BackendError>,
    children_calls: AtomicUsize,
}

impl FakeDirectory {
    fn root(&mut self, id: &str, name: &str) -> GroupNode {
        let node = GroupNode::root(id, name);
        self.roots.push(node.clone());
        node
    }

    fn child(&mut self, parent: &GroupNode, id: &str, name: &str) -> GroupNode {
        let node = GroupNode::child_of(parent, id, name);
        self.children
            .entry(parent.id.clone())
            .or_default()
            .push(node.clone());
        node
    }

    fn fail_children_of(&mut self, node: &GroupNode, error: BackendError) {
        self.failing.insert(node.id.clone(), error);
    }
}

#[async_trait]
impl GroupDirectory for FakeDirectory {
    async fn list_roots(&self) -> BackendResult<Vec<GroupNode>> {
        Ok(self.roots.clone())
    }

    async fn list_children(&self, parent: &GroupNode) -> BackendResult<Vec<GroupNode>> {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.failing.get(&parent.id) {
            return Err(err.clone());
        }
        Ok(self.children.get(&parent.id).cloned().unwrap_or_default())
    }
}

/// A{B{D},C}
fn sample_tree() -> (FakeDirectory, GroupNode, GroupNode) {
    let mut dir = FakeDirectory::default();
    let a = dir.root("a", "A");
    let b = dir.child(&a, "b", "B");
    dir.child(&b, "d", "D");
    dir.child(&a, "c", "C");
    (dir, a, b)
}

#[tokio::test]
async fn test_walk_visits_every_node_once_depth_first() {
    let (dir, _, _) = sample_tree();

    let (paths, failures) = GroupWalker::from_roots(&dir).collect_paths().await.unwrap();

    assert_eq!(paths, vec!["/A", "/A/B", "/A/B/D", "/A/C"]);
    let unique: HashSet<_> = paths.iter().collect();
    assert_eq!(unique.len(), 4);
    assert!(failures.is_empty());
}

#[tokio::test]
async fn test_walk_is_lazy() {
    let (dir, _, _) = sample_tree();
    let mut walker = GroupWalker::from_roots(&dir);

    let first = walker.next().await.unwrap();
    assert_eq!(first.path, "/A");
    assert_eq!(dir.children_calls.load(Ordering::SeqCst), 0);

    let second = walker.next().await.unwrap();
    assert_eq!(second.path, "/A/B");
    assert_eq!(dir.children_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_subtree_failure_keeps_siblings() {
    let (mut dir, _, b) = sample_tree();
    dir.fail_children_of(&b, BackendError::transport("connection reset"));

    let summary = GroupWalker::from_roots(&dir).collect().await.unwrap();

    assert_eq!(summary.paths(), vec!["/A", "/A/B", "/A/C"]);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].path(), "/A/B");
    assert!(summary.failures[0].error.is_transient());
}

#[tokio::test]
async fn test_authentication_failure_stops_walk() {
    let (mut dir, a, _) = sample_tree();
    dir.fail_children_of(&a, BackendError::authentication("token expired"));

    let mut walker = GroupWalker::from_roots(&dir);
    assert_eq!(walker.next().await.unwrap().path, "/A");
    assert!(walker.next().await.is_none());

    let err = walker.finish().unwrap_err();
    assert!(matches!(err, BackendError::Authentication { .. }));
}

#[tokio::test]
async fn test_restart_from_subtree() {
    let (dir, _, b) = sample_tree();

    let (paths, _) = GroupWalker::from_subtree(&dir, b)
        .collect_paths()
        .await
        .unwrap();

    assert_eq!(paths, vec!["/A/B", "/A/B/D"]);
}

#[tokio::test]
async fn test_deep_chain_does_not_overflow() {
    let mut dir = FakeDirectory::default();
    let mut parent = dir.root("n0", "n0");
    for i in 1..5_000 {
        parent = dir.child(&parent, &format!("n{i}"), &format!("n{i}"));
    }

    let summary = GroupWalker::from_roots(&dir).collect().await.unwrap();

    assert_eq!(summary.nodes.len(), 5_000);
    assert!(summary.nodes.last().unwrap().path.ends_with("/n4999"));
}

#[tokio::test]
async fn test_repeated_id_is_visited_once() {
    let mut dir = FakeDirectory::default();
    let a = dir.root("a", "A");
    let b = dir.child(&a, "b", "B");
    // A misbehaving server lists B under itself.
    dir.children.entry(b.id.clone()).or_default().push(b.clone());

    let summary = GroupWalker::from_roots(&dir).collect().await.unwrap();

    assert_eq!(summary.paths(), vec!["/A", "/A/B"]);
}

#[tokio::test]
async fn test_empty_forest() {
    let dir = FakeDirectory::default();
    let summary = GroupWalker::from_roots(&dir).collect().await.unwrap();
    assert!(summary.nodes.is_empty());
}
