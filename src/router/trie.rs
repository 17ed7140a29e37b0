use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::pattern::Segment;
use crate::registry::{Registry, RouteEntry};

/// One trie node per matchable path depth.
///
/// All param-like segments (required and optional) share the single
/// `param_child` edge; which entries actually accept a shorter path is
/// decided per entry at lookup time. Rest entries sit on the node where
/// their suffix begins, split by whether they demand at least one
/// component.
#[derive(Default)]
pub(crate) struct TrieNode {
    pub(crate) static_children: HashMap<String, TrieNode>,
    pub(crate) param_child: Option<Box<TrieNode>>,
    pub(crate) rest_required: Vec<Arc<RouteEntry>>,
    pub(crate) rest_optional: Vec<Arc<RouteEntry>>,
    /// Entries whose pattern is fully consumed at this node.
    pub(crate) entries: Vec<Arc<RouteEntry>>,
}

impl TrieNode {
    fn insert(&mut self, entry: Arc<RouteEntry>) {
        let mut node = self;
        for segment in &entry.pattern {
            match segment {
                Segment::Group { .. } => continue,
                Segment::Literal { value } => {
                    node = node.static_children.entry(value.clone()).or_default();
                }
                Segment::Param { .. } | Segment::OptionalParam { .. } => {
                    node = node.param_child.get_or_insert_with(Box::default);
                }
                Segment::RequiredRest { .. } => {
                    node.rest_required.push(entry.clone());
                    return;
                }
                Segment::OptionalRest { .. } => {
                    node.rest_optional.push(entry.clone());
                    return;
                }
            }
        }
        node.entries.push(entry);
    }
}

/// Immutable route index built from a registry.
///
/// Construction consumes the registry; the index is then shared read-only
/// across dispatching coroutines.
pub struct TrieIndex {
    pub(crate) root: TrieNode,
    len: usize,
}

impl TrieIndex {
    /// Build the index from every registered entry.
    #[must_use]
    pub fn build(registry: Registry) -> Self {
        let entries = registry.into_entries();
        let len = entries.len();
        let mut root = TrieNode::default();
        for entry in entries {
            root.insert(entry);
        }
        info!(routes_count = len, "Route index built");
        Self { root, len }
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
