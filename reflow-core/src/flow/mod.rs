//! Control Flow
//!
//! Helpers that shape a description function around the data graph and the
//! event system.
//!
//! # Concepts
//!
//! - **Iteration**: [`for_each`], [`for_each_keyed`], and [`for_each_map`]
//!   run a body per collection item and decide which retained subtree each
//!   item binds to. [`transform`] maps a collection with per-item
//!   memoization.
//! - **Routing**: [`region`] marks a subtree as an event-routing region, so
//!   targeted dispatch can skip everything outside the target's path.
//!   [`abort_traversal`] ends the current traversal once an event is fully
//!   handled.
//!
//! # Implementation Notes
//!
//! Every helper here is built from two graph primitives, positional scopes
//! and keyed scopes, plus the per-traversal event record. Nothing in this
//! module touches graph internals directly.

mod events;
mod for_each;

pub use events::{abort_traversal, region, EventTraversal, RoutingRegion};
pub use for_each::{for_each, for_each_keyed, for_each_map, transform, Identified, ToKey};
