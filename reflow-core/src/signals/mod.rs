//! Signals
//!
//! This module implements the value layer of the core: typed handles over
//! data that may or may not exist yet, compared by identity instead of by
//! value.
//!
//! # Concepts
//!
//! ## Capabilities
//!
//! [`Signal`] is the base capability (readiness plus identity); [`SignalGet`]
//! and [`SignalSet`] add reading and writing. Functions ask for the weakest
//! capability they need, so a read-only consumer accepts literals, borrowed
//! data, state cells, and derived results alike.
//!
//! ## Identity
//!
//! Every signal exposes a [`ValueId`]: equal ids mean equivalent values.
//! Literal and borrowing signals hash their content; state cells and
//! memoization records use a cell number plus a write counter, which makes
//! a write detectable without hashing anything.
//!
//! ## Memoized application
//!
//! [`apply`] runs a pure function over signal inputs and caches the result
//! in the data graph; the function re-runs only when an input identity
//! changes. This is the workhorse that keeps a re-described UI cheap: the
//! description function calls `apply` freely and unchanged work collapses
//! into cache hits.
//!
//! # Implementation Notes
//!
//! Identity comparison deliberately treats "no value" as unequal to itself,
//! the same way floating-point NaN behaves: an unready input can never
//! satisfy a cache check, so dependent work stays skipped until a value
//! exists.

mod apply;
mod id;
mod signal;
mod state;

pub use apply::{
    apply, lazy_apply, lift, try_apply, Derived, InputIds, Lazy, Lifted, SignalInputs,
};
pub use id::ValueId;
pub use signal::{
    conditional, direct, direct_mut, empty, value, Conditional, Direct, DirectMut, Empty, Signal,
    SignalGet, SignalSet, Value,
};
pub use state::{state, state_empty, State};
