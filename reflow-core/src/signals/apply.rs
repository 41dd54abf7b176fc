//! Memoized Application
//!
//! This module implements the caching layer over pure functions: [`apply`]
//! runs a function over the current values of its input signals and retains
//! the result in a graph slot, re-running the function only when the
//! combined input identity differs from the recorded one.
//!
//! # Concepts
//!
//! ## Records
//!
//! Each `apply` call site owns one memoization record, located by traversal
//! position like any other retained data. The record stores the last input
//! identities, the last output, and a write counter that becomes the
//! output's own versioned identity. A cache hit reuses both the value and
//! the identity, so an unchanged `apply` is invisible to everything
//! downstream.
//!
//! ## Readiness
//!
//! An `apply` over an unready input is itself unready; the function is not
//! invoked and the record is left alone. Readiness is not an error, it is
//! the normal state of a UI that has not received all of its data yet.
//!
//! ## Failure
//!
//! [`try_apply`] accepts a fallible function. An error propagates to the
//! traversal's caller, and the record is marked untrusted: the old output is
//! kept in memory but never served again until some later traversal
//! recomputes successfully.
//!
//! # Implementation Notes
//!
//! Input arity is handled by implementing [`SignalInputs`] for tuples of
//! signal references up to four elements. The function receives the input
//! values positionally, by value.

use std::cell::RefCell;
use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::context::Context;
use crate::error::Result;
use crate::graph::SlotClass;

use super::id::{next_cell_id, ValueId};
use super::signal::{Signal, SignalGet};

/// Input identities recorded by a memoization record.
pub type InputIds = SmallVec<[ValueId; 2]>;

/// Tuples of borrowed input signals accepted by [`apply`] and friends.
///
/// Implemented for `(&A,)` through `(&A, &B, &C, &D)` where every element
/// is a readable signal and `F` takes the element values positionally.
pub trait SignalInputs<F, Out> {
    /// Identity of every input, in position order.
    fn ids(&self) -> InputIds;

    /// Runs `f` on the current input values, or returns `None` if any
    /// input is unready.
    fn invoke(&self, f: &mut F) -> Option<Out>;
}

macro_rules! impl_signal_inputs {
    ($(($signal:ident, $idx:tt)),+) => {
        impl<'a, Func, Out, $($signal),+> SignalInputs<Func, Out> for ($(&'a $signal,)+)
        where
            Func: FnMut($($signal::Value),+) -> Out,
            $($signal: SignalGet,)+
        {
            fn ids(&self) -> InputIds {
                let mut ids = InputIds::new();
                $(ids.push(self.$idx.value_id());)+
                ids
            }

            fn invoke(&self, f: &mut Func) -> Option<Out> {
                Some(f($(self.$idx.get()?),+))
            }
        }
    };
}

impl_signal_inputs!((A, 0));
impl_signal_inputs!((A, 0), (B, 1));
impl_signal_inputs!((A, 0), (B, 1), (C, 2));
impl_signal_inputs!((A, 0), (B, 1), (C, 2), (D, 3));

/// Retained state of one `apply` call site.
struct ApplyRecord<T> {
    inputs: InputIds,
    output: Option<T>,
    failed: bool,
    cell: u64,
    version: u64,
}

impl<T> ApplyRecord<T> {
    fn new() -> Self {
        Self {
            inputs: InputIds::new(),
            output: None,
            failed: false,
            cell: next_cell_id(),
            version: 0,
        }
    }
}

impl<T: Clone> ApplyRecord<T> {
    fn snapshot(&self) -> Derived<T> {
        Derived {
            value: self.output.clone(),
            id: ValueId::Versioned {
                cell: self.cell,
                version: self.version,
            },
        }
    }
}

/// The read-only signal produced by [`apply`] and [`transform`].
///
/// It owns a clone of the computed value, detached from the record that
/// produced it, so it stays readable for the rest of the traversal no
/// matter what happens to the graph.
///
/// [`transform`]: crate::flow::transform
pub struct Derived<T> {
    value: Option<T>,
    id: ValueId,
}

impl<T> Derived<T> {
    pub(crate) fn new(value: T, id: ValueId) -> Self {
        Self {
            value: Some(value),
            id,
        }
    }

    pub(crate) fn unready() -> Self {
        Self {
            value: None,
            id: ValueId::None,
        }
    }
}

impl<T> Signal for Derived<T> {
    type Value = T;

    fn value_id(&self) -> ValueId {
        self.id
    }
}

impl<T: Clone> SignalGet for Derived<T> {
    fn get(&self) -> Option<T> {
        self.value.clone()
    }
}

/// Shared record logic for [`apply`], [`try_apply`] and [`Lifted::apply`].
///
/// The slot is claimed unconditionally, before readiness is checked, so an
/// `apply` occupies the same traversal position whether or not its inputs
/// are ready. Skipping the claim would shift every later call site.
fn memoized<T>(
    ctx: &mut Context,
    ids: InputIds,
    compute: impl FnOnce() -> Option<Result<T>>,
) -> Result<Derived<T>>
where
    T: Clone + 'static,
{
    let data = ctx.data()?;
    let mut cursor = data.borrow_mut();
    cursor.slot(SlotClass::Cached, ApplyRecord::<T>::new, |record| {
        if ids.iter().any(|id| id.is_none()) {
            return Ok(Derived::unready());
        }
        if !record.failed && record.output.is_some() && record.inputs == ids {
            return Ok(record.snapshot());
        }
        match compute() {
            Some(Ok(output)) => {
                record.version += 1;
                record.inputs = ids;
                record.output = Some(output);
                record.failed = false;
                Ok(record.snapshot())
            }
            Some(Err(err)) => {
                record.failed = true;
                Err(err)
            }
            // An input reported an identity but produced no value; treat
            // it as unready rather than guessing.
            None => Ok(Derived::unready()),
        }
    })?
}

/// Applies `f` to the current values of `inputs`, memoized by input
/// identity.
///
/// The function runs only when the recorded input identities differ from
/// the current ones; otherwise the cached output (and its identity) is
/// reused. If any input is unready, the result is unready and `f` is not
/// invoked.
///
/// # Example
///
/// ```rust,ignore
/// let total = apply(ctx, |a: i32, b: i32| a + b, (&price, &tax))?;
/// if let Some(total) = total.get() {
///     // recomputed only when price or tax actually changed
/// }
/// ```
pub fn apply<F, In, T>(ctx: &mut Context, mut f: F, inputs: In) -> Result<Derived<T>>
where
    In: SignalInputs<F, T>,
    T: Clone + 'static,
{
    let ids = inputs.ids();
    memoized(ctx, ids, || inputs.invoke(&mut f).map(Ok))
}

/// Fallible form of [`apply`].
///
/// An `Err` from `f` propagates out of the traversal; the record keeps its
/// previous output but is distrusted until a later recomputation succeeds,
/// so retrying with the same inputs runs `f` again instead of serving a
/// stale hit.
pub fn try_apply<F, In, T>(ctx: &mut Context, mut f: F, inputs: In) -> Result<Derived<T>>
where
    In: SignalInputs<F, Result<T>>,
    T: Clone + 'static,
{
    let ids = inputs.ids();
    memoized(ctx, ids, || inputs.invoke(&mut f))
}

/// A deferred application: the function runs when the value is read.
///
/// Unlike [`apply`], a `Lazy` needs no graph slot and no context, but it
/// also caches nothing: every read recomputes. Use it for genuinely cheap
/// projections, or as an input to an `apply` that does the real caching.
pub struct Lazy<F, In, T> {
    f: RefCell<F>,
    inputs: In,
    _output: PhantomData<T>,
}

/// Wraps `f` over `inputs` as a lazily-evaluated signal.
pub fn lazy_apply<F, In, T>(f: F, inputs: In) -> Lazy<F, In, T>
where
    In: SignalInputs<F, T>,
{
    Lazy {
        f: RefCell::new(f),
        inputs,
        _output: PhantomData,
    }
}

impl<F, In, T> Signal for Lazy<F, In, T>
where
    In: SignalInputs<F, T>,
{
    type Value = T;

    fn value_id(&self) -> ValueId {
        ValueId::combine(&self.inputs.ids())
    }
}

impl<F, In, T> SignalGet for Lazy<F, In, T>
where
    In: SignalInputs<F, T>,
{
    fn get(&self) -> Option<T> {
        self.inputs.invoke(&mut *self.f.borrow_mut())
    }
}

/// A reusable, memoizing wrapper around a plain function.
///
/// Lifting separates defining the function from applying it, so one
/// function can be applied at several call sites, each with its own record.
pub struct Lifted<F> {
    f: F,
}

/// Lifts `f` into a combinator whose [`Lifted::apply`] memoizes like
/// [`apply`].
pub fn lift<F>(f: F) -> Lifted<F> {
    Lifted { f }
}

impl<F> Lifted<F> {
    /// Applies the lifted function to `inputs` at the current traversal
    /// position, with [`apply`] semantics.
    pub fn apply<'f, In, T>(&'f mut self, ctx: &mut Context, inputs: In) -> Result<Derived<T>>
    where
        In: SignalInputs<&'f mut F, T>,
        T: Clone + 'static,
    {
        let ids = inputs.ids();
        let mut f = &mut self.f;
        memoized(ctx, ids, move || inputs.invoke(&mut f).map(Ok))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::signal::{empty, value};
    use std::cell::Cell;

    #[test]
    fn inputs_report_ids_in_position_order() {
        let a = value(1);
        let b = value(2);
        let ids = SignalInputs::<fn(i32, i32) -> i32, i32>::ids(&(&a, &b));
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], a.value_id());
        assert_eq!(ids[1], b.value_id());
    }

    #[test]
    fn invoke_skips_when_any_input_is_unready() {
        let a = value(1);
        let b = empty::<i32>();
        let mut add = |x: i32, y: i32| x + y;
        assert_eq!((&a, &b).invoke(&mut add), None);
        let c = value(2);
        assert_eq!((&a, &c).invoke(&mut add), Some(3));
    }

    #[test]
    fn lazy_apply_recomputes_on_every_read() {
        let runs = Cell::new(0);
        let base = value(2);
        let scaled = lazy_apply(
            |n: i32| {
                runs.set(runs.get() + 1);
                n * 10
            },
            (&base,),
        );
        assert_eq!(scaled.get(), Some(20));
        assert_eq!(scaled.get(), Some(20));
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn lazy_identity_follows_its_inputs() {
        let double = |n: i32| n * 2;
        let a = value(1);
        let b = value(1);
        let c = value(2);
        let id_a = lazy_apply(double, (&a,)).value_id();
        let id_b = lazy_apply(double, (&b,)).value_id();
        let id_c = lazy_apply(double, (&c,)).value_id();
        assert_eq!(id_a, id_b);
        assert_ne!(id_a, id_c);
    }

    #[test]
    fn lazy_over_unready_input_is_unready() {
        let missing = empty::<i32>();
        let derived = lazy_apply(|n: i32| n + 1, (&missing,));
        assert!(!derived.has_value());
        assert_eq!(derived.get(), None);
    }

    #[test]
    fn derived_snapshot_is_detached_from_its_record() {
        let ready = Derived::new(5, ValueId::hashed(&5));
        assert!(ready.has_value());
        assert_eq!(ready.get(), Some(5));
        let pending = Derived::<i32>::unready();
        assert!(!pending.has_value());
        assert_eq!(pending.get(), None);
    }
}
