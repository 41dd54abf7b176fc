//! Retained Data Graph
//!
//! This module implements the tree of retained state underneath a Reflow
//! application: a description function is re-run on every pass, and the
//! graph is what lets each of its call sites find "its" data again.
//!
//! # Concepts
//!
//! ## Positional identity
//!
//! A node's default identity is the path of child positions through which
//! the description function reached it. No registration, no handles: the
//! first traversal creates nodes as it goes, and every later traversal that
//! makes the same calls in the same order lands on the same nodes.
//!
//! ## Keys
//!
//! Positional identity breaks down for collections, where elements move.
//! A call site can therefore open a child scope under an explicit [`Key`]
//! instead; keyed children are matched by key across traversals regardless
//! of visit order.
//!
//! ## Visited marks and reclamation
//!
//! Each pruning traversal starts a new epoch and stamps every node it
//! reaches. When a refresh completes, nodes left with an older stamp were
//! not described this time and their subtrees are pruned. Event traversals
//! skip all of this: dispatching an event into one corner of the UI must
//! never discard state belonging to the rest.
//!
//! # Implementation Notes
//!
//! Nodes live in an arena keyed by [`NodeId`]; child links are ids, not
//! owning pointers. Within one parent, positional claims are strictly
//! sequential, so the unvisited positional children of a visited node always
//! form a suffix of its child list. Pruning exploits both facts: it walks
//! the tree iteratively, truncates stale suffixes, and removes doomed
//! subtrees without recursion.

mod node;
mod traversal;

pub use node::{DataGraph, Key, Node, NodeId, NodeKind, SlotClass};
pub use traversal::{keyed, scoped, DataTraversal};
