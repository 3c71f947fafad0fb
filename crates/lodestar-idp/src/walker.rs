//! Depth-first walk over the group forest.
//!
//! [`GroupWalker`] is pull-based: each [`GroupWalker::next`] call yields one
//! node and fetches a node's children only when the walk moves past it. The
//! pending nodes live on an explicit stack, so depth is bounded by memory,
//! not by the call stack.
//!
//! A failure listing one node's children is recorded as a [`SubtreeFailure`]
//! and the walk continues with that node's siblings. An authentication or
//! configuration failure stops the walk; [`GroupWalker::finish`] returns it.
//!
//! # Example
//!
//! ```ignore
//! let mut walker = GroupWalker::from_roots(&client);
//! while let Some(node) = walker.next().await {
//!     println!("{}", node.path);
//! }
//! let failures = walker.finish()?;
//! ```

use std::collections::HashSet;

use lodestar_core::{BackendError, GroupDirectory, GroupNode};
use tracing::{debug, warn};

/// A subtree whose children could not be listed.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtreeFailure {
    /// The node whose children were being listed; `None` for the root listing.
    pub parent: Option<GroupNode>,
    pub error: BackendError,
}

impl SubtreeFailure {
    /// Path of the subtree that was skipped (`/` for the root listing).
    #[must_use]
    pub fn path(&self) -> &str {
        self.parent.as_ref().map_or("/", |p| p.path.as_str())
    }
}

/// Result of draining a walk.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WalkSummary {
    /// Nodes in visit order.
    pub nodes: Vec<GroupNode>,
    pub failures: Vec<SubtreeFailure>,
}

impl WalkSummary {
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.path.clone()).collect()
    }
}

/// Lazy depth-first (pre-order) group walker.
pub struct GroupWalker<'a, D: GroupDirectory + ?Sized> {
    directory: &'a D,
    roots_pending: bool,
    stack: Vec<GroupNode>,
    /// Last yielded node; its children are fetched on the next call.
    expand: Option<GroupNode>,
    visited: HashSet<String>,
    failures: Vec<SubtreeFailure>,
    fatal: Option<BackendError>,
}

impl<'a, D: GroupDirectory + ?Sized> GroupWalker<'a, D> {
    /// Walk the whole forest, starting from the top-level groups.
    pub fn from_roots(directory: &'a D) -> Self {
        Self::with_state(directory, true, Vec::new())
    }

    /// Walk one subtree. `node` itself is yielded first.
    pub fn from_subtree(directory: &'a D, node: GroupNode) -> Self {
        Self::with_state(directory, false, vec![node])
    }

    fn with_state(directory: &'a D, roots_pending: bool, stack: Vec<GroupNode>) -> Self {
        Self {
            directory,
            roots_pending,
            stack,
            expand: None,
            visited: HashSet::new(),
            failures: Vec::new(),
            fatal: None,
        }
    }

    /// Yield the next node, or `None` when the walk is exhausted or stopped.
    pub async fn next(&mut self) -> Option<GroupNode> {
        if self.fatal.is_some() {
            return None;
        }

        if self.roots_pending {
            self.roots_pending = false;
            match self.directory.list_roots().await {
                Ok(roots) => self.push_children(roots),
                Err(e) => self.record(None, e),
            }
        }

        if let Some(parent) = self.expand.take() {
            match self.directory.list_children(&parent).await {
                Ok(children) => self.push_children(children),
                Err(e) => self.record(Some(parent), e),
            }
        }

        if self.fatal.is_some() {
            return None;
        }

        while let Some(node) = self.stack.pop() {
            if !self.visited.insert(node.id.clone()) {
                debug!(group = %node.path, "Skipping already visited group");
                continue;
            }
            self.expand = Some(node.clone());
            return Some(node);
        }
        None
    }

    /// Subtrees skipped so far.
    #[must_use]
    pub fn failures(&self) -> &[SubtreeFailure] {
        &self.failures
    }

    /// End the walk: the recorded subtree failures, or the error that stopped it.
    pub fn finish(self) -> Result<Vec<SubtreeFailure>, BackendError> {
        match self.fatal {
            Some(e) => Err(e),
            None => Ok(self.failures),
        }
    }

    /// Drain the walk.
    pub async fn collect(mut self) -> Result<WalkSummary, BackendError> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next().await {
            nodes.push(node);
        }
        let failures = self.finish()?;
        Ok(WalkSummary { nodes, failures })
    }

    /// Drain the walk, keeping only paths.
    pub async fn collect_paths(self) -> Result<(Vec<String>, Vec<SubtreeFailure>), BackendError> {
        let summary = self.collect().await?;
        Ok((summary.paths(), summary.failures))
    }

    fn push_children(&mut self, children: Vec<GroupNode>) {
        // Reversed so the first child is popped first.
        self.stack.extend(children.into_iter().rev());
    }

    fn record(&mut self, parent: Option<GroupNode>, error: BackendError) {
        if error.is_fatal() {
            warn!(error = %error, "Group walk stopped");
            self.stack.clear();
            self.fatal = Some(error);
            return;
        }
        let failure = SubtreeFailure { parent, error };
        warn!(
            subtree = %failure.path(),
            error = %failure.error,
            "Failed to list child groups, continuing with a partial result"
        );
        self.failures.push(failure);
    }
}
