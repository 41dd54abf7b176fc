//! Signal Traits and Adapters
//!
//! A signal is a typed handle over a value that may or may not exist yet,
//! plus a [`ValueId`] for change detection. Signals are values themselves:
//! cheap to construct, cheap to pass, and decoupled from where the
//! underlying data lives. Capabilities are split across three traits so a
//! function can ask for exactly what it needs:
//!
//! - [`Signal`]: readiness and identity, nothing else
//! - [`SignalGet`]: read a clone of the current value
//! - [`SignalSet`]: write a new value
//!
//! The adapters in this module wrap plain data as signals: [`value`] for
//! literals, [`direct`]/[`direct_mut`] for borrowed data, [`empty`] for a
//! signal with no value, and [`conditional`] for branch selection.

use std::hash::Hash;
use std::marker::PhantomData;

use super::id::ValueId;

/// Base capability: readiness and value identity.
///
/// The contract ties the two together: [`Signal::value_id`] returns
/// [`ValueId::None`] exactly when the signal has no value. Consumers compare
/// identities to decide whether to recompute; they never inspect the value
/// for change detection.
pub trait Signal {
    /// The type of value this signal carries.
    type Value;

    /// Identity of the current value, or [`ValueId::None`] when there is
    /// none.
    fn value_id(&self) -> ValueId;

    /// Whether the signal currently has a value.
    fn has_value(&self) -> bool {
        self.value_id().is_some()
    }
}

/// Read capability.
pub trait SignalGet: Signal {
    /// A clone of the current value, or `None` when the signal is unready.
    fn get(&self) -> Option<Self::Value>;
}

/// Write capability.
pub trait SignalSet: Signal {
    /// Writes a new value through the signal.
    fn set(&mut self, value: Self::Value);
}

/// A signal wrapping an owned literal value.
///
/// Its identity is a hash of the value, so two `Value` signals carrying
/// equal data have equal identities even across traversals. That is what
/// lets a description function rebuild its signals from scratch every pass
/// without invalidating downstream caches.
pub struct Value<T> {
    value: T,
}

/// Wraps `value` as an always-ready, read-only signal.
///
/// # Example
///
/// ```rust,ignore
/// let greeting = value("hello");
/// assert_eq!(greeting.get(), Some("hello"));
/// ```
pub fn value<T>(value: T) -> Value<T> {
    Value { value }
}

impl<T: Hash> Signal for Value<T> {
    type Value = T;

    fn value_id(&self) -> ValueId {
        ValueId::hashed(&self.value)
    }
}

impl<T: Hash + Clone> SignalGet for Value<T> {
    fn get(&self) -> Option<T> {
        Some(self.value.clone())
    }
}

/// A signal that never has a value.
pub struct Empty<T> {
    _marker: PhantomData<T>,
}

/// Creates a signal with no value.
///
/// Reads yield `None`, writes are discarded, and the identity is
/// [`ValueId::None`]. Useful as a placeholder input while the real source
/// is not wired up yet.
pub fn empty<T>() -> Empty<T> {
    Empty {
        _marker: PhantomData,
    }
}

impl<T> Signal for Empty<T> {
    type Value = T;

    fn value_id(&self) -> ValueId {
        ValueId::None
    }
}

impl<T> SignalGet for Empty<T> {
    fn get(&self) -> Option<T> {
        None
    }
}

impl<T> SignalSet for Empty<T> {
    fn set(&mut self, _value: T) {}
}

/// A read-only signal borrowing its value from the caller.
pub struct Direct<'a, T> {
    value: &'a T,
}

/// Wraps a borrowed value as a read-only signal.
pub fn direct<T>(value: &T) -> Direct<'_, T> {
    Direct { value }
}

impl<T: Hash> Signal for Direct<'_, T> {
    type Value = T;

    fn value_id(&self) -> ValueId {
        ValueId::hashed(self.value)
    }
}

impl<T: Hash + Clone> SignalGet for Direct<'_, T> {
    fn get(&self) -> Option<T> {
        Some(self.value.clone())
    }
}

/// A read-write signal borrowing its value from the caller.
///
/// Writes go straight through to the borrowed location. This is the element
/// handle keyed iteration passes to its body: setting it mutates the backing
/// collection in place.
pub struct DirectMut<'a, T> {
    value: &'a mut T,
}

/// Wraps a mutably borrowed value as a read-write signal.
pub fn direct_mut<T>(value: &mut T) -> DirectMut<'_, T> {
    DirectMut { value }
}

impl<T: Hash> Signal for DirectMut<'_, T> {
    type Value = T;

    fn value_id(&self) -> ValueId {
        ValueId::hashed(&*self.value)
    }
}

impl<T: Hash + Clone> SignalGet for DirectMut<'_, T> {
    fn get(&self) -> Option<T> {
        Some(self.value.clone())
    }
}

impl<T: Hash> SignalSet for DirectMut<'_, T> {
    fn set(&mut self, value: T) {
        *self.value = value;
    }
}

/// A signal selecting between two others by a boolean condition.
///
/// Selection is lazy: only the chosen branch is consulted, for both reads
/// and identity. The identity combines the condition's with the chosen
/// branch's, so flipping the condition changes the identity even when both
/// branches happen to carry equal values.
pub struct Conditional<C, A, B> {
    condition: C,
    when_true: A,
    when_false: B,
}

/// Creates a signal that reads from `when_true` or `when_false` depending
/// on `condition`.
///
/// The result is unready while the condition is unready, and while the
/// branch the condition selects is unready.
pub fn conditional<C, A, B>(condition: C, when_true: A, when_false: B) -> Conditional<C, A, B>
where
    C: SignalGet<Value = bool>,
    A: Signal,
    B: Signal<Value = A::Value>,
{
    Conditional {
        condition,
        when_true,
        when_false,
    }
}

impl<C, A, B> Signal for Conditional<C, A, B>
where
    C: SignalGet<Value = bool>,
    A: Signal,
    B: Signal<Value = A::Value>,
{
    type Value = A::Value;

    fn value_id(&self) -> ValueId {
        match self.condition.get() {
            Some(true) => {
                ValueId::combine(&[self.condition.value_id(), self.when_true.value_id()])
            }
            Some(false) => {
                ValueId::combine(&[self.condition.value_id(), self.when_false.value_id()])
            }
            None => ValueId::None,
        }
    }
}

impl<C, A, B> SignalGet for Conditional<C, A, B>
where
    C: SignalGet<Value = bool>,
    A: SignalGet,
    B: SignalGet<Value = A::Value>,
{
    fn get(&self) -> Option<Self::Value> {
        if self.condition.get()? {
            self.when_true.get()
        } else {
            self.when_false.get()
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
