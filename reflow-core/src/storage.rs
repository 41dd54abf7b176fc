//! Capability-Tagged Component Storage
//!
//! An execution context carries a small, open-ended set of services: the
//! data-graph cursor, the event-traversal record, the timing service, the
//! link back to the owning system. Hard-coding each of those as a struct
//! field would couple the context's shape to every service's concrete type,
//! so instead they live in a type-erased store keyed by *capability tag*.
//!
//! A capability tag is a marker type implementing [`Capability`]; its
//! associated `Data` type is what actually gets stored. There is at most one
//! entry per tag, and looking up an absent tag is an error rather than a
//! default: a missing service means the context was assembled wrong, and
//! that should surface immediately.

use std::any::{type_name, Any, TypeId};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};

/// A marker type naming one service that can be attached to a context.
///
/// The tag itself is never instantiated; it only selects the entry. The
/// associated [`Capability::Data`] type is what the store holds and hands
/// back.
///
/// # Example
///
/// ```rust,ignore
/// struct ClockTag;
///
/// impl Capability for ClockTag {
///     type Data = Clock;
/// }
///
/// storage.insert::<ClockTag>(Rc::new(Clock::new()));
/// let clock = storage.get::<ClockTag>()?;
/// ```
pub trait Capability: 'static {
    /// The service data stored under this tag.
    type Data: 'static;

    /// Name used in diagnostics when the entry is missing.
    fn name() -> &'static str {
        type_name::<Self>()
    }
}

/// Heterogeneous store mapping capability tags to shared service data.
///
/// Entries are reference-counted so services can be handed out to user code
/// while the store retains its own handle. The store is single-threaded,
/// like everything else in this crate.
#[derive(Default)]
pub struct ComponentStorage {
    entries: FxHashMap<TypeId, Rc<dyn Any>>,
}

impl ComponentStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }

    /// Registers `data` under capability `C`, replacing any previous entry
    /// for the same tag.
    pub fn insert<C: Capability>(&mut self, data: Rc<C::Data>) {
        self.entries.insert(TypeId::of::<C>(), data);
    }

    /// Looks up the entry registered under capability `C`.
    ///
    /// Returns [`Error::MissingComponent`] when nothing was registered. An
    /// absent service is a context-assembly bug, not a soft failure.
    pub fn get<C: Capability>(&self) -> Result<Rc<C::Data>> {
        let entry = self
            .entries
            .get(&TypeId::of::<C>())
            .ok_or(Error::MissingComponent(C::name()))?;
        // `insert` is the only writer, so the entry under `C`'s tag is
        // always an `Rc<C::Data>`.
        Ok(Rc::clone(entry)
            .downcast::<C::Data>()
            .expect("entry stored under its capability tag"))
    }

    /// Whether an entry is registered under capability `C`.
    pub fn contains<C: Capability>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<C>())
    }

    /// Removes and returns the entry registered under capability `C`.
    pub fn remove<C: Capability>(&mut self) -> Option<Rc<C::Data>> {
        self.entries
            .remove(&TypeId::of::<C>())
            .and_then(|entry| entry.downcast::<C::Data>().ok())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct CounterTag;

    impl Capability for CounterTag {
        type Data = u32;
    }

    struct LabelTag;

    impl Capability for LabelTag {
        type Data = String;
    }

    #[test]
    fn insert_and_get() {
        let mut storage = ComponentStorage::new();
        storage.insert::<CounterTag>(Rc::new(7));
        storage.insert::<LabelTag>(Rc::new("hello".to_string()));

        assert_eq!(*storage.get::<CounterTag>().unwrap(), 7);
        assert_eq!(*storage.get::<LabelTag>().unwrap(), "hello");
    }

    #[test]
    fn missing_entry_is_an_error() {
        let storage = ComponentStorage::new();
        let err = storage.get::<CounterTag>().unwrap_err();
        assert!(matches!(err, Error::MissingComponent(_)));
    }

    #[test]
    fn insert_replaces_previous_entry() {
        let mut storage = ComponentStorage::new();
        storage.insert::<CounterTag>(Rc::new(1));
        storage.insert::<CounterTag>(Rc::new(2));
        assert_eq!(*storage.get::<CounterTag>().unwrap(), 2);
    }

    #[test]
    fn remove_clears_the_entry() {
        let mut storage = ComponentStorage::new();
        storage.insert::<CounterTag>(Rc::new(5));
        assert_eq!(storage.remove::<CounterTag>().as_deref(), Some(&5));
        assert!(!storage.contains::<CounterTag>());
    }
}
