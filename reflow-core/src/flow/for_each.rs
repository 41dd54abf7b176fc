//! Keyed Iteration
//!
//! Describing a collection means running a body once per item, and the
//! interesting question is which retained subtree each run binds to. The
//! helpers here answer it three ways: by position in the sequence
//! ([`for_each`]), by an identity the item itself carries
//! ([`for_each_keyed`]), and by map key ([`for_each_map`]). Keyed forms keep
//! an item's state glued to the item through insertions, removals, and
//! reorders; the positional form is cheaper and right for sequences that
//! only grow and shrink at the tail.
//!
//! [`transform`] is the memoized cousin: it maps items through a function,
//! caching per item, and folds the per-item identities into one identity for
//! the whole output vector.

use std::hash::Hash;
use std::rc::Rc;

use crate::context::Context;
use crate::error::Result;
use crate::graph::{keyed, scoped, Key};
use crate::signals::{
    apply, direct, direct_mut, Derived, Direct, DirectMut, Signal, SignalGet, ValueId,
};

/// Items that carry their own iteration identity.
///
/// Implement this for item types whose state must survive reordering:
/// return something stable across frames, like a database id, not something
/// positional.
pub trait Identified {
    /// The key that names this item's retained subtree.
    fn identity(&self) -> Key;
}

/// Map keys usable as iteration keys.
pub trait ToKey {
    fn to_key(&self) -> Key;
}

impl ToKey for usize {
    fn to_key(&self) -> Key {
        Key::Index(*self)
    }
}

impl ToKey for u32 {
    fn to_key(&self) -> Key {
        Key::Int(i64::from(*self))
    }
}

impl ToKey for i32 {
    fn to_key(&self) -> Key {
        Key::Int(i64::from(*self))
    }
}

impl ToKey for i64 {
    fn to_key(&self) -> Key {
        Key::Int(*self)
    }
}

impl ToKey for &str {
    fn to_key(&self) -> Key {
        Key::Text(Rc::from(*self))
    }
}

impl ToKey for String {
    fn to_key(&self) -> Key {
        Key::Text(Rc::from(self.as_str()))
    }
}

impl ToKey for Rc<str> {
    fn to_key(&self) -> Key {
        Key::Text(Rc::clone(self))
    }
}

/// Runs `body` once per item, identified by position.
///
/// Each item's retained data lives under its loop index, so inserting or
/// removing in the middle re-binds every later item to a different subtree.
/// Use [`for_each_keyed`] when that matters. The whole loop runs in its own
/// scope, so call sites after it never shift with the collection's length.
pub fn for_each<'c, T, I, F>(ctx: &mut Context, items: I, mut body: F) -> Result<()>
where
    T: 'c,
    I: IntoIterator<Item = &'c mut T>,
    F: FnMut(&mut Context, DirectMut<'_, T>) -> Result<()>,
{
    scoped(ctx, |ctx| {
        for (index, item) in items.into_iter().enumerate() {
            keyed(ctx, Key::Index(index), |ctx| body(ctx, direct_mut(item)))?;
        }
        Ok(())
    })
}

/// Runs `body` once per item, identified by the item itself.
///
/// State follows the item's [`Identified::identity`] wherever the item moves
/// in the sequence. Two items reporting the same identity contend for one
/// subtree: the one described last wins, and what the losers observe is
/// unspecified.
pub fn for_each_keyed<'c, T, I, F>(ctx: &mut Context, items: I, mut body: F) -> Result<()>
where
    T: Identified + 'c,
    I: IntoIterator<Item = &'c mut T>,
    F: FnMut(&mut Context, DirectMut<'_, T>) -> Result<()>,
{
    scoped(ctx, |ctx| {
        for item in items {
            let key = item.identity();
            keyed(ctx, key, |ctx| body(ctx, direct_mut(item)))?;
        }
        Ok(())
    })
}

/// Runs `body` once per map entry, identified by the entry's key.
///
/// The body reads the key and may write the value; entry state follows the
/// key through insertions and removals elsewhere in the map. Keys whose
/// [`ToKey`] images collide contend for one subtree, last writer wins.
pub fn for_each_map<'c, K, V, I, F>(ctx: &mut Context, entries: I, mut body: F) -> Result<()>
where
    K: ToKey + 'c,
    V: 'c,
    I: IntoIterator<Item = (&'c K, &'c mut V)>,
    F: FnMut(&mut Context, Direct<'_, K>, DirectMut<'_, V>) -> Result<()>,
{
    scoped(ctx, |ctx| {
        for (key, value) in entries {
            keyed(ctx, key.to_key(), |ctx| {
                body(ctx, direct(key), direct_mut(value))
            })?;
        }
        Ok(())
    })
}

/// Maps `items` through `f` with per-item memoization.
///
/// Each item gets its own cache record, so changing one item recomputes one
/// output. The result is ready once every item's output is, and its identity
/// folds the per-item identities in order, so downstream consumers see a
/// change whenever any element (or the ordering) changes.
///
/// # Example
///
/// ```rust,ignore
/// let labels = transform(ctx, names.iter(), |name: String| name.to_uppercase())?;
/// ```
pub fn transform<'i, T, U, I, F>(ctx: &mut Context, items: I, mut f: F) -> Result<Derived<Vec<U>>>
where
    T: Clone + Hash + 'i,
    U: Clone + 'static,
    I: IntoIterator<Item = &'i T>,
    F: FnMut(T) -> U,
{
    scoped(ctx, |ctx| {
        let mut ids = Vec::new();
        let mut outputs = Vec::new();
        let mut ready = true;
        for (index, item) in items.into_iter().enumerate() {
            let mapped = keyed(ctx, Key::Index(index), |ctx| {
                apply(ctx, &mut f, (&direct(item),))
            })?;
            ids.push(mapped.value_id());
            match mapped.get() {
                Some(value) => outputs.push(value),
                None => ready = false,
            }
        }
        if ready {
            Ok(Derived::new(outputs, ValueId::combine(&ids)))
        } else {
            Ok(Derived::unready())
        }
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_preserve_distinctions() {
        assert_eq!(3usize.to_key(), Key::Index(3));
        assert_eq!(3i64.to_key(), Key::Int(3));
        assert_ne!(3usize.to_key(), 3i64.to_key());
        assert_eq!("a".to_key(), String::from("a").to_key());
    }

    #[test]
    fn string_keys_compare_by_content() {
        let a: Rc<str> = Rc::from("same");
        let b: Rc<str> = Rc::from("same");
        assert_eq!(a.to_key(), b.to_key());
    }
}
