//! Traversal Cursor
//!
//! A [`DataTraversal`] walks the data graph in lock-step with the
//! description function's own call structure. Every open scope is a frame on
//! an explicit stack; each frame counts how many positional children have
//! been claimed so far, and that count *is* the identity of the next claim.
//! As long as the function makes the same calls in the same order, every
//! call site lands on the node it created last time.
//!
//! The cursor also owns the two per-traversal reclamation switches: garbage
//! collection (prune whole unvisited subtrees) and cache clearing (drop only
//! the memoization records of unvisited nodes). Refresh traversals run with
//! both on; event traversals run with both off so transient dispatch never
//! discards retained state.

use std::cell::RefCell;
use std::rc::Rc;

use crate::context::Context;
use crate::error::Result;

use super::node::{DataGraph, Key, NodeId, NodeKind, SlotClass};

/// One open scope: the node it maps to and the next positional claim.
#[derive(Debug, Clone, Copy)]
struct Frame {
    node: NodeId,
    next_child: usize,
}

/// Cursor over the data graph for the duration of one traversal.
#[derive(Debug)]
pub struct DataTraversal {
    graph: Rc<RefCell<DataGraph>>,
    stack: Vec<Frame>,
    gc_enabled: bool,
    cache_clearing_enabled: bool,
}

impl DataTraversal {
    /// Opens a traversal positioned at the graph root.
    ///
    /// When either reclamation switch is on, this starts a new visited-mark
    /// epoch, so that [`DataTraversal::finish`] can tell which nodes this
    /// traversal reached.
    pub fn begin(graph: Rc<RefCell<DataGraph>>, gc: bool, cache_clearing: bool) -> Self {
        let root = {
            let mut g = graph.borrow_mut();
            if gc || cache_clearing {
                g.bump_epoch();
            }
            let root = g.root();
            g.stamp(root);
            root
        };
        Self {
            graph,
            stack: vec![Frame {
                node: root,
                next_child: 0,
            }],
            gc_enabled: gc,
            cache_clearing_enabled: cache_clearing,
        }
    }

    /// Whether unvisited nodes are pruned when this traversal completes.
    pub fn gc_enabled(&self) -> bool {
        self.gc_enabled
    }

    /// Overrides pruning for the remainder of this traversal.
    pub fn set_gc_enabled(&mut self, enabled: bool) {
        self.gc_enabled = enabled;
    }

    /// Whether unvisited memoization records are dropped on completion.
    pub fn cache_clearing_enabled(&self) -> bool {
        self.cache_clearing_enabled
    }

    /// Overrides cache clearing for the remainder of this traversal.
    pub fn set_cache_clearing_enabled(&mut self, enabled: bool) {
        self.cache_clearing_enabled = enabled;
    }

    /// Claims the next positional child as a nested scope and descends into
    /// it.
    pub(crate) fn enter_scope(&mut self) -> Result<()> {
        let frame = self
            .stack
            .last_mut()
            .expect("traversal stack holds at least the root frame");
        let parent = frame.node;
        let position = frame.next_child;
        frame.next_child += 1;

        let node = self
            .graph
            .borrow_mut()
            .positional_child(parent, position, NodeKind::Scope)?;
        self.stack.push(Frame {
            node,
            next_child: 0,
        });
        Ok(())
    }

    /// Descends into the child scope addressed by `key`, creating it on
    /// first visit. Keyed scopes do not consume a positional claim.
    pub(crate) fn enter_keyed_scope(&mut self, key: Key) {
        let parent = self
            .stack
            .last()
            .expect("traversal stack holds at least the root frame")
            .node;
        let node = self.graph.borrow_mut().keyed_child(parent, key);
        self.stack.push(Frame {
            node,
            next_child: 0,
        });
    }

    /// Leaves the innermost scope.
    pub(crate) fn exit_scope(&mut self) {
        debug_assert!(self.stack.len() > 1, "exit without a matching enter");
        self.stack.pop();
    }

    /// Claims the next positional child as a data slot and gives `access` a
    /// mutable view of its retained value, running `init` on first visit.
    ///
    /// `init` and `access` run while the graph is borrowed, so neither may
    /// start another graph operation.
    pub fn slot<T, R>(
        &mut self,
        class: SlotClass,
        init: impl FnOnce() -> T,
        access: impl FnOnce(&mut T) -> R,
    ) -> Result<R>
    where
        T: 'static,
    {
        let frame = self
            .stack
            .last_mut()
            .expect("traversal stack holds at least the root frame");
        let parent = frame.node;
        let position = frame.next_child;
        frame.next_child += 1;

        let mut graph = self.graph.borrow_mut();
        let node = graph.positional_child(parent, position, NodeKind::Slot)?;
        graph.with_slot(node, class, init, access)
    }

    /// Ends the traversal. Reclamation runs only when the traversal
    /// `completed`: a pass that failed partway through has not seen the full
    /// structure, and pruning on what it did see would throw away live
    /// state.
    pub(crate) fn finish(&mut self, completed: bool) {
        if !completed {
            return;
        }
        let mut graph = self.graph.borrow_mut();
        if self.gc_enabled {
            graph.prune_unvisited();
        } else if self.cache_clearing_enabled {
            graph.clear_unvisited_caches();
        }
    }
}

/// Runs `body` inside a nested positional scope.
///
/// Children claimed by `body` get their own identity sequence, so call sites
/// after the scope are unaffected by how many claims happen inside it. The
/// scope is exited even when `body` fails, keeping the cursor consistent for
/// whoever handles the error.
pub fn scoped<R>(ctx: &mut Context, body: impl FnOnce(&mut Context) -> Result<R>) -> Result<R> {
    let data = ctx.data()?;
    data.borrow_mut().enter_scope()?;
    let result = body(ctx);
    data.borrow_mut().exit_scope();
    result
}

/// Runs `body` inside a scope identified by `key` instead of by call order.
///
/// Two traversals that reach the enclosing scope and use the same key get
/// the same retained subtree, no matter where in the visit order the calls
/// happen. This is the primitive underneath keyed iteration.
pub fn keyed<R>(
    ctx: &mut Context,
    key: impl Into<Key>,
    body: impl FnOnce(&mut Context) -> Result<R>,
) -> Result<R> {
    let data = ctx.data()?;
    data.borrow_mut().enter_keyed_scope(key.into());
    let result = body(ctx);
    data.borrow_mut().exit_scope();
    result
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn graph() -> Rc<RefCell<DataGraph>> {
        Rc::new(RefCell::new(DataGraph::new()))
    }

    #[test]
    fn slots_are_retained_across_traversals() {
        let graph = graph();

        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        let first = t
            .slot(SlotClass::Persistent, || 1u32, |v| *v)
            .unwrap();
        t.finish(true);
        assert_eq!(first, 1);

        // The initializer must not run again on the revisit.
        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        let second = t
            .slot(SlotClass::Persistent, || 2u32, |v| *v)
            .unwrap();
        t.finish(true);
        assert_eq!(second, 1);
    }

    #[test]
    fn scopes_give_children_their_own_positions() {
        let graph = graph();

        let run = |graph: &Rc<RefCell<DataGraph>>, inner: u32, outer: u32| -> (u32, u32) {
            let mut t = DataTraversal::begin(Rc::clone(graph), true, false);
            t.enter_scope().unwrap();
            let a = t.slot(SlotClass::Persistent, || inner, |v| *v).unwrap();
            t.exit_scope();
            let b = t.slot(SlotClass::Persistent, || outer, |v| *v).unwrap();
            t.finish(true);
            (a, b)
        };

        assert_eq!(run(&graph, 10, 20), (10, 20));
        // Same structure, different initializers: both slots were retained.
        assert_eq!(run(&graph, 77, 88), (10, 20));
    }

    #[test]
    fn type_change_at_a_slot_is_fatal() {
        let graph = graph();

        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        t.slot(SlotClass::Persistent, || 1u32, |_| ()).unwrap();
        t.finish(true);

        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        let err = t
            .slot(SlotClass::Persistent, String::new, |_| ())
            .unwrap_err();
        assert!(matches!(err, Error::SlotTypeMismatch { .. }));
        t.finish(false);
    }

    #[test]
    fn unvisited_suffix_is_pruned_on_completion() {
        let graph = graph();

        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        t.slot(SlotClass::Persistent, || 1u32, |_| ()).unwrap();
        t.slot(SlotClass::Persistent, || 2u32, |_| ()).unwrap();
        t.finish(true);
        assert_eq!(graph.borrow().node_count(), 3);

        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        t.slot(SlotClass::Persistent, || 1u32, |_| ()).unwrap();
        t.finish(true);
        assert_eq!(graph.borrow().node_count(), 2);
    }

    #[test]
    fn traversal_without_gc_keeps_unvisited_nodes() {
        let graph = graph();

        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        t.slot(SlotClass::Persistent, || 1u32, |_| ()).unwrap();
        t.slot(SlotClass::Persistent, || 2u32, |_| ()).unwrap();
        t.finish(true);

        // Event-style traversal: visits nothing, prunes nothing.
        let mut t = DataTraversal::begin(Rc::clone(&graph), false, false);
        t.finish(true);
        assert_eq!(graph.borrow().node_count(), 3);
    }

    #[test]
    fn incomplete_traversal_never_prunes() {
        let graph = graph();

        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        t.slot(SlotClass::Persistent, || 1u32, |_| ()).unwrap();
        t.finish(true);

        // A failed pass saw nothing; its marks must not drive pruning.
        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        t.finish(false);
        assert_eq!(graph.borrow().node_count(), 2);
    }

    #[test]
    fn keyed_scopes_follow_their_keys() {
        let graph = graph();

        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        t.enter_keyed_scope(Key::from("a"));
        t.slot(SlotClass::Persistent, || 1u32, |_| ()).unwrap();
        t.exit_scope();
        t.enter_keyed_scope(Key::from("b"));
        t.slot(SlotClass::Persistent, || 2u32, |_| ()).unwrap();
        t.exit_scope();
        t.finish(true);

        // Visit in the opposite order: data must follow the keys.
        let mut t = DataTraversal::begin(Rc::clone(&graph), true, false);
        t.enter_keyed_scope(Key::from("b"));
        let b = t.slot(SlotClass::Persistent, || 0u32, |v| *v).unwrap();
        t.exit_scope();
        t.enter_keyed_scope(Key::from("a"));
        let a = t.slot(SlotClass::Persistent, || 0u32, |v| *v).unwrap();
        t.exit_scope();
        t.finish(true);

        assert_eq!((a, b), (1, 2));
    }

    #[test]
    fn cache_clearing_keeps_structure_and_persistent_data() {
        let graph = graph();

        let mut t = DataTraversal::begin(Rc::clone(&graph), false, true);
        t.slot(SlotClass::Cached, || 1u32, |_| ()).unwrap();
        t.slot(SlotClass::Persistent, || 2u32, |_| ()).unwrap();
        t.finish(true);

        // Visit neither slot: the cached one is dropped, nodes stay.
        let mut t = DataTraversal::begin(Rc::clone(&graph), false, true);
        t.finish(true);
        assert_eq!(graph.borrow().node_count(), 3);

        let mut t = DataTraversal::begin(Rc::clone(&graph), false, true);
        let cached = t.slot(SlotClass::Cached, || 9u32, |v| *v).unwrap();
        let persistent = t.slot(SlotClass::Persistent, || 9u32, |v| *v).unwrap();
        t.finish(true);
        assert_eq!((cached, persistent), (9, 2));
    }
}
