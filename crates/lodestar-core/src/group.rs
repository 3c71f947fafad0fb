//! Identity-provider group nodes.

use serde::{Deserialize, Serialize};

/// A node of the identity provider's group forest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    pub id: String,
    pub name: String,
    /// Absent for top-level groups.
    pub parent_id: Option<String>,
    /// Slash-delimited full path, e.g. `/kibana/teamadmin`.
    pub path: String,
}

impl GroupNode {
    /// A top-level group; its path is `/{name}`.
    pub fn root(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            path: format!("/{name}"),
            name,
            parent_id: None,
        }
    }

    /// A child of `parent`; its path strictly extends the parent's.
    pub fn child_of(parent: &GroupNode, id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            path: child_path(&parent.path, &name),
            name,
            parent_id: Some(parent.id.clone()),
        }
    }

    /// Last segment of the path.
    #[must_use]
    pub fn last_segment(&self) -> &str {
        last_segment(&self.path)
    }
}

/// Join a parent path and a child name.
#[must_use]
pub fn child_path(parent_path: &str, name: &str) -> String {
    format!("{}/{}", parent_path.trim_end_matches('/'), name)
}

/// Last `/`-separated segment of a group path.
#[must_use]
pub fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}

/// Normalize a path prefix so it always starts and ends with `/`.
///
/// `"kibana"`, `"/kibana"` and `"/kibana/"` all become `"/kibana/"`; an empty
/// prefix becomes `"/"` and matches every path.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> String {
    let inner = prefix.trim().trim_matches('/');
    if inner.is_empty() {
        "/".to_string()
    } else {
        format!("/{inner}/")
    }
}
