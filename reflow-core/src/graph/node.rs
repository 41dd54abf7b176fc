//! Data-Graph Nodes
//!
//! This module defines the retained node tree: an arena of [`Node`]s keyed
//! by [`NodeId`], where each node remembers the data one call site of the
//! description function asked to keep across traversals. Parent/child
//! relations are id lookups into the arena, never owning pointers, so no
//! cycles can form between the graph and anything it stores.

use std::any::{type_name, Any};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};

/// Unique identifier for a node in the data graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Explicit identity for a keyed child scope.
///
/// A key overrides positional identity: two traversals that reach a parent
/// node and ask for the same key get the same child node, no matter where in
/// the parent's visit order the request happened. Keys are how iteration
/// over reorderable collections keeps each element's retained state attached
/// to the element rather than to its position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// A position in a sequence, used by unkeyed iteration.
    Index(usize),

    /// An integer identity.
    Int(i64),

    /// A textual identity. `Rc<str>` keeps clones cheap; keys are cloned
    /// once per traversal for the map lookup.
    Text(Rc<str>),
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value.into())
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<u32> for Key {
    fn from(value: u32) -> Self {
        Key::Int(value.into())
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(Rc::from(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Text(Rc::from(value))
    }
}

impl From<Rc<str>> for Key {
    fn from(value: Rc<str>) -> Self {
        Key::Text(value)
    }
}

/// Structural role of a node, fixed on its first visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A nested scope: owns children, holds no data of its own.
    Scope,

    /// A data slot: holds one retained value for one call site.
    Slot,
}

impl NodeKind {
    fn describe(self) -> &'static str {
        match self {
            NodeKind::Scope => "a scope",
            NodeKind::Slot => "a data slot",
        }
    }
}

/// Retention class of a slot's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotClass {
    /// Survives cache clearing: state cells, routing regions.
    Persistent,

    /// Dropped by cache clearing when the node goes unvisited:
    /// memoization records.
    Cached,
}

/// The retained value stored at a slot node, type-erased.
#[derive(Debug)]
struct SlotEntry {
    data: Box<dyn Any>,
    type_name: &'static str,
    class: SlotClass,
}

/// A node in the data graph.
///
/// Children come in two flavors kept side by side: a positional sequence
/// (identity = visit order under this parent) and a key-addressed map
/// (identity = the supplied [`Key`]). The `epoch` field is the visited mark:
/// it equals the graph's current epoch exactly when the node was reached
/// during the current pruning traversal.
#[derive(Debug)]
pub struct Node {
    kind: NodeKind,
    slot: Option<SlotEntry>,
    epoch: u64,
    children: Vec<NodeId>,
    keyed_children: IndexMap<Key, NodeId>,
}

impl Node {
    fn new(kind: NodeKind, epoch: u64) -> Self {
        Self {
            kind,
            slot: None,
            epoch,
            children: Vec::new(),
            keyed_children: IndexMap::new(),
        }
    }

    /// Get the node's structural role.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Epoch of the last pruning traversal that visited this node.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// The retained node tree for one system.
///
/// Nodes are created lazily the first time a call site is reached, revisited
/// on later traversals, and pruned after a refresh traversal that did not
/// reach them. The graph never prunes on its own: the traversal cursor
/// decides when (and whether) a completed pass may reclaim anything.
#[derive(Debug)]
pub struct DataGraph {
    nodes: FxHashMap<NodeId, Node>,
    root: NodeId,
    epoch: u64,
}

impl DataGraph {
    /// Creates a graph containing only the root scope.
    pub fn new() -> Self {
        let root = NodeId::new();
        let mut nodes = FxHashMap::default();
        nodes.insert(root, Node::new(NodeKind::Scope, 0));
        Self {
            nodes,
            root,
            epoch: 0,
        }
    }

    /// The root scope every traversal starts from.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The current pruning epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Starts a new pruning epoch, invalidating every visited mark.
    pub fn bump_epoch(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Marks `id` as visited in the current epoch.
    pub fn stamp(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.epoch = self.epoch;
        }
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Immutable view of a node, if it is still live.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Returns the child of `parent` at `position`, creating it on first
    /// visit and marking it visited.
    ///
    /// Positions are claimed strictly in order within one traversal, so a
    /// new child is only ever appended. Revisiting a position as a different
    /// [`NodeKind`] means the description function's shape changed, which is
    /// reported as [`Error::ShapeMismatch`].
    pub fn positional_child(
        &mut self,
        parent: NodeId,
        position: usize,
        kind: NodeKind,
    ) -> Result<NodeId> {
        let epoch = self.epoch;
        let existing = {
            let parent = self
                .nodes
                .get(&parent)
                .expect("parent node looked up by a live id");
            parent.children.get(position).copied()
        };

        if let Some(id) = existing {
            let node = self
                .nodes
                .get_mut(&id)
                .expect("child node looked up by a live id");
            if node.kind != kind {
                warn!(
                    found = node.kind.describe(),
                    requested = kind.describe(),
                    "traversal shape changed at a retained position"
                );
                return Err(Error::ShapeMismatch {
                    expected: node.kind.describe(),
                });
            }
            node.epoch = epoch;
            return Ok(id);
        }

        let id = NodeId::new();
        self.nodes.insert(id, Node::new(kind, epoch));
        let parent = self
            .nodes
            .get_mut(&parent)
            .expect("parent node looked up by a live id");
        debug_assert_eq!(position, parent.children.len());
        parent.children.push(id);
        trace!(id = id.raw(), position, "created positional node");
        Ok(id)
    }

    /// Returns the keyed child of `parent` under `key`, creating it on first
    /// visit and marking it visited. Keyed children are always scopes.
    pub fn keyed_child(&mut self, parent: NodeId, key: Key) -> NodeId {
        let epoch = self.epoch;
        let existing = {
            let parent = self
                .nodes
                .get(&parent)
                .expect("parent node looked up by a live id");
            parent.keyed_children.get(&key).copied()
        };

        if let Some(id) = existing {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.epoch = epoch;
            }
            return id;
        }

        let id = NodeId::new();
        self.nodes.insert(id, Node::new(NodeKind::Scope, epoch));
        let parent = self
            .nodes
            .get_mut(&parent)
            .expect("parent node looked up by a live id");
        parent.keyed_children.insert(key, id);
        trace!(id = id.raw(), "created keyed node");
        id
    }

    /// Gives `access` a mutable view of the slot data at `id`, running
    /// `init` first if the slot has never been filled.
    ///
    /// The slot's type is fixed by its first visit; asking for a different
    /// `T` later is a bug in the description function and fails with
    /// [`Error::SlotTypeMismatch`].
    pub fn with_slot<T, R>(
        &mut self,
        id: NodeId,
        class: SlotClass,
        init: impl FnOnce() -> T,
        access: impl FnOnce(&mut T) -> R,
    ) -> Result<R>
    where
        T: 'static,
    {
        let node = self
            .nodes
            .get_mut(&id)
            .expect("slot node looked up by a live id");
        debug_assert_eq!(node.kind, NodeKind::Slot);

        let entry = node.slot.get_or_insert_with(|| SlotEntry {
            data: Box::new(init()),
            type_name: type_name::<T>(),
            class,
        });

        match entry.data.downcast_mut::<T>() {
            Some(value) => Ok(access(value)),
            None => {
                warn!(
                    found = entry.type_name,
                    requested = type_name::<T>(),
                    "retained slot revisited with a different type"
                );
                Err(Error::SlotTypeMismatch {
                    requested: type_name::<T>(),
                    found: entry.type_name,
                })
            }
        }
    }

    /// Removes every node that was not visited in the current epoch, along
    /// with its entire subtree. Returns how many nodes were removed.
    ///
    /// Positional children are claimed strictly in order, so within one
    /// parent the unvisited ones always form a suffix of the child list.
    pub fn prune_unvisited(&mut self) -> usize {
        let epoch = self.epoch;
        let mut walk = vec![self.root];
        let mut doomed: Vec<NodeId> = Vec::new();

        while let Some(id) = walk.pop() {
            let (positional, keyed) = {
                let node = &self.nodes[&id];
                let keyed: Vec<(Key, NodeId)> = node
                    .keyed_children
                    .iter()
                    .map(|(key, &child)| (key.clone(), child))
                    .collect();
                (node.children.clone(), keyed)
            };

            let mut cut = positional.len();
            for (index, child) in positional.iter().enumerate() {
                if self.nodes[child].epoch < epoch {
                    cut = index;
                    break;
                }
            }
            let stale_keys: Vec<Key> = keyed
                .iter()
                .filter(|(_, child)| self.nodes[child].epoch < epoch)
                .map(|(key, _)| key.clone())
                .collect();

            {
                let node = self
                    .nodes
                    .get_mut(&id)
                    .expect("walked node looked up by a live id");
                doomed.extend(node.children.drain(cut..));
                for key in &stale_keys {
                    if let Some(child) = node.keyed_children.shift_remove(key) {
                        doomed.push(child);
                    }
                }
            }

            walk.extend(&positional[..cut]);
            walk.extend(
                keyed
                    .iter()
                    .filter(|(key, _)| !stale_keys.contains(key))
                    .map(|(_, child)| child),
            );
        }

        let mut removed = 0;
        while let Some(id) = doomed.pop() {
            if let Some(node) = self.nodes.remove(&id) {
                removed += 1;
                doomed.extend(node.children);
                doomed.extend(node.keyed_children.into_values());
            }
        }
        if removed > 0 {
            debug!(removed, "pruned unvisited nodes");
        }
        removed
    }

    /// Drops the [`SlotClass::Cached`] data of every unvisited node without
    /// touching the node itself. Returns how many slots were cleared.
    ///
    /// This is the cheap variant of reclamation used when a traversal wants
    /// stale memoization records gone but retained state kept.
    pub fn clear_unvisited_caches(&mut self) -> usize {
        let epoch = self.epoch;
        let mut cleared = 0;
        for node in self.nodes.values_mut() {
            if node.epoch < epoch
                && node
                    .slot
                    .as_ref()
                    .is_some_and(|entry| entry.class == SlotClass::Cached)
            {
                node.slot = None;
                cleared += 1;
            }
        }
        if cleared > 0 {
            debug!(cleared, "dropped caches of unvisited nodes");
        }
        cleared
    }
}

impl Default for DataGraph {
    fn default() -> Self {
        Self::new()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
