//! Event Routing
//!
//! Events in Reflow are not callbacks; they are traversals. Dispatching an
//! event re-runs the description function with an [`EventTraversal`] record
//! that tells each routing region whether the event concerns it. A targeted
//! dispatch precomputes the root-to-target path once, then threads the
//! traversal along it; everything off the path learns it is irrelevant the
//! moment its region is entered and can skip its expensive work.
//!
//! Regions form a tree mirroring the data graph: each region is retained as
//! graph-node data, and its link to the parent region is a weak reference,
//! a lookup rather than a second owner. Handles to regions are cheap clones
//! and stay usable across traversals, which is what makes "dispatch to the
//! widget I saw last refresh" possible.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tracing::debug;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::graph::SlotClass;

struct RegionNode {
    parent: RefCell<Weak<RegionNode>>,
}

/// A cloneable handle to one routing region, usable as a dispatch target.
///
/// Equality is identity: two handles are equal when they refer to the same
/// region, which is stable across traversals for as long as the region's
/// call site keeps being described.
pub struct RoutingRegion {
    inner: Rc<RegionNode>,
}

impl RoutingRegion {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(RegionNode {
                parent: RefCell::new(Weak::new()),
            }),
        }
    }

    /// The enclosing region, if it is still alive.
    pub fn parent(&self) -> Option<RoutingRegion> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| RoutingRegion { inner })
    }

    fn set_parent(&self, parent: Option<&RoutingRegion>) {
        *self.inner.parent.borrow_mut() = match parent {
            Some(region) => Rc::downgrade(&region.inner),
            None => Weak::new(),
        };
    }
}

impl Clone for RoutingRegion {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl PartialEq for RoutingRegion {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RoutingRegion {}

impl fmt::Debug for RoutingRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RoutingRegion")
            .field(&Rc::as_ptr(&self.inner))
            .finish()
    }
}

/// Root-to-target path for one targeted dispatch. Inline up to typical UI
/// depths, heap only beyond that.
type DispatchPath = SmallVec<[RoutingRegion; 8]>;

/// Per-traversal event state: what kind of traversal this is, which region
/// is currently innermost, and the payload being dispatched.
#[derive(Debug)]
pub struct EventTraversal {
    refresh: bool,
    targeted: bool,
    path: DispatchPath,
    next_step: usize,
    active: Option<RoutingRegion>,
    payload: Option<Box<dyn Any>>,
}

impl EventTraversal {
    /// The record for a refresh traversal: a broadcast with no payload.
    pub(crate) fn refresh_event() -> Self {
        Self {
            refresh: true,
            targeted: false,
            path: DispatchPath::new(),
            next_step: 0,
            active: None,
            payload: None,
        }
    }

    /// The record for an untargeted event: every region is relevant.
    pub(crate) fn broadcast(payload: Box<dyn Any>) -> Self {
        Self {
            refresh: false,
            targeted: false,
            path: DispatchPath::new(),
            next_step: 0,
            active: None,
            payload: Some(payload),
        }
    }

    /// The record for a targeted event. Builds the root-to-target path up
    /// front by walking parent links, so relevance checks during the
    /// traversal are a single pointer comparison.
    pub(crate) fn targeted(payload: Box<dyn Any>, target: &RoutingRegion) -> Self {
        let mut path = DispatchPath::new();
        let mut cursor = Some(target.clone());
        while let Some(region) = cursor {
            cursor = region.parent();
            path.push(region);
        }
        path.reverse();
        debug!(depth = path.len(), "built dispatch path");
        Self {
            refresh: false,
            targeted: true,
            path,
            next_step: 0,
            active: None,
            payload: Some(payload),
        }
    }

    /// Whether this traversal is a refresh.
    pub fn is_refresh(&self) -> bool {
        self.refresh
    }

    /// Whether this traversal carries a specific target.
    pub fn is_targeted(&self) -> bool {
        self.targeted
    }

    /// The innermost region the traversal is currently inside.
    pub fn active_region(&self) -> Option<RoutingRegion> {
        self.active.clone()
    }

    /// Enters `region`, wiring its parent link to the previously active
    /// region and deciding relevance. Returns the region to restore on exit
    /// and whether the event concerns this subtree.
    fn enter_region(&mut self, region: &RoutingRegion) -> (Option<RoutingRegion>, bool) {
        region.set_parent(self.active.as_ref());
        let relevant = if !self.targeted {
            true
        } else if self.path.get(self.next_step) == Some(region) {
            self.next_step += 1;
            true
        } else {
            false
        };
        let previous = self.active.replace(region.clone());
        (previous, relevant)
    }

    fn exit_region(&mut self, previous: Option<RoutingRegion>) {
        self.active = previous;
    }

    pub(crate) fn take_payload(&mut self) -> Option<Box<dyn Any>> {
        self.payload.take()
    }

    pub(crate) fn restore_payload(&mut self, payload: Option<Box<dyn Any>>) {
        self.payload = payload;
    }
}

/// Runs `body` inside a routing region, telling it whether the current
/// traversal concerns this subtree.
///
/// The region handle is retained in the data graph, so the same call site
/// maps to the same region every traversal. The body runs in its own data
/// scope: content gated on `relevant` may come and go without shifting the
/// call sites that follow the region.
///
/// # Example
///
/// ```rust,ignore
/// region(ctx, |ctx, relevant| {
///     if relevant {
///         ctx.with_event::<Click, _>(|ctx, click| {
///             // handle the click
///         })?;
///     }
///     Ok(())
/// })
/// ```
pub fn region<R>(
    ctx: &mut Context,
    body: impl FnOnce(&mut Context, bool) -> Result<R>,
) -> Result<R> {
    let data = ctx.data()?;
    let events = ctx.events()?;

    data.borrow_mut().enter_scope()?;
    let result = (|| {
        let handle = data
            .borrow_mut()
            .slot(SlotClass::Persistent, RoutingRegion::new, |region| {
                region.clone()
            })?;
        let (previous, relevant) = events.borrow_mut().enter_region(&handle);
        let result = body(ctx, relevant);
        events.borrow_mut().exit_region(previous);
        result
    })();
    data.borrow_mut().exit_scope();
    result
}

/// Ends the current traversal early.
///
/// Returns the distinguished aborted result; every frame propagates it with
/// `?` until the dispatch entry point absorbs it and reports the traversal
/// as complete. Use it after an event has been fully handled and running
/// the rest of the description function would be wasted work.
pub fn abort_traversal<R>() -> Result<R> {
    Err(Error::Aborted)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
