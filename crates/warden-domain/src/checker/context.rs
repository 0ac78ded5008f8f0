//! Internal traversal context for linked-resource recursion.

use std::collections::HashSet;
use std::sync::Arc;

use crate::model::ObjectRef;

/// Internal context for graph traversal.
#[derive(Debug, Clone)]
pub(crate) struct TraversalContext {
    /// Current linked-resource depth.
    pub(crate) depth: u32,
    /// Objects already on the current path.
    pub(crate) visited: Arc<HashSet<ObjectRef>>,
}

impl TraversalContext {
    pub(crate) fn new(root: &ObjectRef) -> Self {
        Self {
            depth: 0,
            visited: Arc::new(HashSet::from([root.clone()])),
        }
    }

    pub(crate) fn has_visited(&self, object: &ObjectRef) -> bool {
        self.visited.contains(object)
    }

    /// Descends one hop to `object`.
    pub(crate) fn descend(&self, object: &ObjectRef) -> Self {
        // Copy-on-write: the set is only cloned when a path extends.
        let mut visited = (*self.visited).clone();
        visited.insert(object.clone());
        Self {
            depth: self.depth + 1,
            visited: Arc::new(visited),
        }
    }
}
