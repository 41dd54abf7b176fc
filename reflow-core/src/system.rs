//! System
//!
//! A [`System`] owns one retained data graph and runs traversals over it. A
//! *controller* is the application's description function: it receives a
//! [`Context`] and describes the whole interface by calling into the graph,
//! signal, and flow modules. The system runs that same controller for every
//! kind of traversal:
//!
//! - [`System::refresh`] brings retained state in line with the current
//!   description and reclaims whatever the description no longer mentions.
//! - [`System::dispatch`] delivers an event to one routing region, skipping
//!   the rest of the tree.
//! - [`System::broadcast`] delivers an event everywhere.
//!
//! Dispatch and broadcast hand the event back when the traversal ends, so
//! handlers can write answers into it and the caller can read them out.
//!
//! # Implementation Notes
//!
//! Traversal methods take `&mut self`, which makes nested traversals a
//! compile error rather than a reentrancy bug. The refresh-needed flag is
//! shared with every [`State`](crate::signals::State) cell the controller
//! creates; writes raise it, [`System::refresh`] lowers it on entry so
//! writes made during the refresh itself are not lost.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Instant;

use tracing::debug_span;

use crate::context::{Context, DataTraversalTag, EventTraversalTag, SystemTag, TimingTag};
use crate::error::{Error, Result};
use crate::flow::{EventTraversal, RoutingRegion};
use crate::graph::{DataGraph, DataTraversal};
use crate::storage::ComponentStorage;

/// Milliseconds of platform time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

/// What a host platform offers to the system it embeds.
pub trait ExternalInterface {
    /// The platform's current tick count.
    fn tick_count(&self) -> Ticks;

    /// Schedules a refresh aligned with the platform's next animation
    /// frame. The default does nothing; headless hosts poll
    /// [`System::needs_refresh`] instead.
    fn request_animation_refresh(&self) {}
}

/// Tick count sampled once at the start of a traversal, so every consumer
/// within it sees the same now.
pub struct TimingService {
    ticks: Ticks,
}

impl TimingService {
    pub(crate) fn new(ticks: Ticks) -> Self {
        Self { ticks }
    }

    /// The tick count when this traversal began.
    pub fn tick_count(&self) -> Ticks {
        self.ticks
    }
}

/// Handle from inside a traversal back to the owning system.
pub struct SystemLink {
    refresh_needed: Rc<Cell<bool>>,
    external: Option<Rc<dyn ExternalInterface>>,
}

impl SystemLink {
    /// Marks the system as needing a refresh.
    pub fn request_refresh(&self) {
        self.refresh_needed.set(true);
    }

    /// Asks the platform for an animation-frame refresh. The needs-refresh
    /// flag is raised either way, so hosts without an animation timer still
    /// converge by polling.
    pub fn request_animation_refresh(&self) {
        if let Some(external) = &self.external {
            external.request_animation_refresh();
        }
        self.refresh_needed.set(true);
    }

    pub(crate) fn refresh_flag(&self) -> Rc<Cell<bool>> {
        Rc::clone(&self.refresh_needed)
    }
}

/// One reactive system: a retained data graph plus the machinery to run
/// controllers over it.
///
/// # Example
///
/// ```rust,ignore
/// let mut system = System::new();
/// while system.needs_refresh() {
///     system.refresh(|ctx| {
///         let count = state(ctx, || 0u32)?;
///         // describe the interface from `count`...
///         Ok(())
///     })?;
/// }
/// ```
pub struct System {
    graph: Rc<RefCell<DataGraph>>,
    refresh_needed: Rc<Cell<bool>>,
    external: Option<Rc<dyn ExternalInterface>>,
    started: Instant,
}

impl System {
    /// Creates a system with an empty graph. A new system reports needing
    /// its first refresh.
    pub fn new() -> Self {
        Self {
            graph: Rc::new(RefCell::new(DataGraph::new())),
            refresh_needed: Rc::new(Cell::new(true)),
            external: None,
            started: Instant::now(),
        }
    }

    /// Creates a system wired to a host platform for timing and
    /// animation-frame scheduling.
    pub fn with_external(external: impl ExternalInterface + 'static) -> Self {
        Self {
            external: Some(Rc::new(external)),
            ..Self::new()
        }
    }

    /// Whether retained state has changed since the last refresh.
    pub fn needs_refresh(&self) -> bool {
        self.refresh_needed.get()
    }

    /// Marks the system as needing a refresh, for changes the system cannot
    /// see, like mutation of application data referenced by `direct`
    /// signals.
    pub fn request_refresh(&self) {
        self.refresh_needed.set(true);
    }

    /// Number of nodes currently retained, the graph root included.
    pub fn node_count(&self) -> usize {
        self.graph.borrow().node_count()
    }

    fn ticks(&self) -> Ticks {
        match &self.external {
            Some(external) => external.tick_count(),
            None => Ticks(self.started.elapsed().as_millis() as u64),
        }
    }

    /// Runs one traversal: assembles the context, runs the controller, and
    /// settles the graph. Returns the controller's result and the event
    /// payload, if the traversal carried one.
    fn run(
        &mut self,
        kind: &'static str,
        events: EventTraversal,
        controller: impl FnOnce(&mut Context) -> Result<()>,
    ) -> (Result<()>, Option<Box<dyn Any>>) {
        let span = debug_span!("traversal", kind);
        let _guard = span.enter();

        let refresh = events.is_refresh();
        let data = Rc::new(RefCell::new(DataTraversal::begin(
            Rc::clone(&self.graph),
            refresh,
            refresh,
        )));
        let events = Rc::new(RefCell::new(events));

        let mut components = ComponentStorage::new();
        components.insert::<DataTraversalTag>(Rc::clone(&data));
        components.insert::<EventTraversalTag>(Rc::clone(&events));
        components.insert::<TimingTag>(Rc::new(TimingService::new(self.ticks())));
        components.insert::<SystemTag>(Rc::new(SystemLink {
            refresh_needed: Rc::clone(&self.refresh_needed),
            external: self.external.clone(),
        }));

        let mut ctx = Context::new(components);
        let result = controller(&mut ctx);

        // An aborted traversal still saw everything up to the abort point
        // by its own choice; only real failures leave the visit incomplete.
        let completed = matches!(result, Ok(()) | Err(Error::Aborted));
        data.borrow_mut().finish(completed);
        let payload = events.borrow_mut().take_payload();
        (result, payload)
    }

    /// Runs a refresh traversal: retained state is brought in line with the
    /// controller's current description, and nodes the description no
    /// longer mentions are pruned.
    ///
    /// The needs-refresh flag is lowered before the controller runs, so
    /// state writes made during the refresh raise it again and the host
    /// knows to schedule another pass.
    pub fn refresh(&mut self, controller: impl FnOnce(&mut Context) -> Result<()>) -> Result<()> {
        self.refresh_needed.set(false);
        let (result, _) = self.run("refresh", EventTraversal::refresh_event(), controller);
        match result {
            Err(Error::Aborted) => Ok(()),
            other => other,
        }
    }

    /// Delivers `event` to the region captured in `target`, returning the
    /// event afterwards so the caller can read what handlers wrote into it.
    ///
    /// Regions off the root-to-target path see their traversal flagged as
    /// irrelevant and can skip their work; nothing is pruned.
    pub fn dispatch<E>(
        &mut self,
        target: &RoutingRegion,
        event: E,
        controller: impl FnOnce(&mut Context) -> Result<()>,
    ) -> Result<E>
    where
        E: 'static,
    {
        let events = EventTraversal::targeted(Box::new(event), target);
        let (result, payload) = self.run("dispatch", events, controller);
        recover_event(result, payload)
    }

    /// Delivers `event` to every region, returning the event afterwards.
    pub fn broadcast<E>(
        &mut self,
        event: E,
        controller: impl FnOnce(&mut Context) -> Result<()>,
    ) -> Result<E>
    where
        E: 'static,
    {
        let events = EventTraversal::broadcast(Box::new(event));
        let (result, payload) = self.run("broadcast", events, controller);
        recover_event(result, payload)
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

/// Unboxes the event after a dispatch. Aborting counts as successful
/// delivery; the payload is always restored by the time a traversal ends.
fn recover_event<E: 'static>(result: Result<()>, payload: Option<Box<dyn Any>>) -> Result<E> {
    match result {
        Ok(()) | Err(Error::Aborted) => {
            let payload = payload.expect("event payload restored after the traversal");
            Ok(*payload
                .downcast::<E>()
                .expect("event payload keeps its type"))
        }
        Err(err) => Err(err),
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
