//! Execution Context
//!
//! A [`Context`] is the single argument every description function takes. It
//! does not hold traversal state itself; it is a view over a
//! [`ComponentStorage`] in which the owning system has registered the
//! services this traversal needs: the data-graph cursor, the event record,
//! timing, and the link back to the system. Layers above this crate extend
//! the same storage with their own capabilities without this type changing
//! shape.
//!
//! Accessors return an error rather than panicking when a service is absent,
//! so a context assembled for a restricted purpose fails loudly the moment
//! code assumes a service it does not carry.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::Result;
use crate::flow::{EventTraversal, RoutingRegion};
use crate::graph::DataTraversal;
use crate::storage::{Capability, ComponentStorage};
use crate::system::{SystemLink, Ticks, TimingService};

/// Capability tag for the data-graph cursor.
pub struct DataTraversalTag;

impl Capability for DataTraversalTag {
    type Data = RefCell<DataTraversal>;

    fn name() -> &'static str {
        "data traversal"
    }
}

/// Capability tag for the per-traversal event record.
pub struct EventTraversalTag;

impl Capability for EventTraversalTag {
    type Data = RefCell<EventTraversal>;

    fn name() -> &'static str {
        "event traversal"
    }
}

/// Capability tag for the timing service.
pub struct TimingTag;

impl Capability for TimingTag {
    type Data = TimingService;

    fn name() -> &'static str {
        "timing service"
    }
}

/// Capability tag for the link back to the owning system.
pub struct SystemTag;

impl Capability for SystemTag {
    type Data = SystemLink;

    fn name() -> &'static str {
        "system link"
    }
}

/// The per-traversal view handed to description functions.
pub struct Context {
    components: ComponentStorage,
}

impl Context {
    /// Wraps an assembled component store as a context.
    pub fn new(components: ComponentStorage) -> Self {
        Self { components }
    }

    /// The underlying component store.
    pub fn components(&self) -> &ComponentStorage {
        &self.components
    }

    /// Mutable access to the component store, for layers that register
    /// additional capabilities mid-traversal.
    pub fn components_mut(&mut self) -> &mut ComponentStorage {
        &mut self.components
    }

    /// The data-graph cursor for this traversal.
    pub fn data(&self) -> Result<Rc<RefCell<DataTraversal>>> {
        self.components.get::<DataTraversalTag>()
    }

    /// The event record for this traversal.
    pub fn events(&self) -> Result<Rc<RefCell<EventTraversal>>> {
        self.components.get::<EventTraversalTag>()
    }

    /// The timing service.
    pub fn timing(&self) -> Result<Rc<TimingService>> {
        self.components.get::<TimingTag>()
    }

    /// The link back to the owning system.
    pub fn system_link(&self) -> Result<Rc<SystemLink>> {
        self.components.get::<SystemTag>()
    }

    /// Whether the current traversal is a refresh.
    ///
    /// Description functions use this to skip event-only work during
    /// refreshes and refresh-only work during dispatch.
    pub fn is_refresh(&self) -> Result<bool> {
        Ok(self.events()?.borrow().is_refresh())
    }

    /// The innermost routing region the traversal is currently inside, if
    /// any. Capture it during a refresh to target later dispatches at this
    /// part of the description.
    pub fn active_region(&self) -> Result<Option<RoutingRegion>> {
        Ok(self.events()?.borrow().active_region())
    }

    /// The current tick count, from the platform when one was attached.
    pub fn tick_count(&self) -> Result<Ticks> {
        Ok(self.timing()?.tick_count())
    }

    /// Asks the platform to schedule a refresh on its next animation frame.
    pub fn request_animation_refresh(&self) -> Result<()> {
        self.system_link()?.request_animation_refresh();
        Ok(())
    }

    /// Hands the traversal's event to `f` if it is an `E`.
    ///
    /// Returns `Ok(None)` when the traversal carries no payload or a payload
    /// of some other type. The event is borrowed mutably, so handlers can
    /// write results (hit flags, consumed marks) straight into it for the
    /// dispatcher to read back.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// ctx.with_event::<Click, _>(|ctx, click| {
    ///     click.consumed = true;
    /// })?;
    /// ```
    pub fn with_event<E, R>(
        &mut self,
        f: impl FnOnce(&mut Context, &mut E) -> R,
    ) -> Result<Option<R>>
    where
        E: 'static,
    {
        let events = self.events()?;
        let payload = events.borrow_mut().take_payload();
        let Some(mut payload) = payload else {
            return Ok(None);
        };
        let result = payload.downcast_mut::<E>().map(|event| f(self, event));
        events.borrow_mut().restore_payload(Some(payload));
        Ok(result)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
