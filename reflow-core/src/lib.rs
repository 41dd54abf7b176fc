//! Reflow Core
//!
//! This crate provides the incremental-execution core of the Reflow
//! declarative UI toolkit. A Reflow application is one plain function that
//! describes the whole UI, re-run on every pass; this crate makes that
//! affordable by retaining per-call-site state across passes, skipping
//! computations whose inputs are unchanged, and routing events straight to
//! the subtree that cares about them.
//!
//! It implements:
//!
//! - A retained data graph, addressed by traversal position or explicit key
//! - Signals: typed value handles with cheap identity-based change detection
//! - Memoized application of pure functions over signal inputs
//! - An event-routing tree for targeted dispatch and traversal abort
//! - Keyed iteration so reordered collections keep their retained state
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: the retained node tree and the cursor that walks it
//! - `signals`: value identity, signal traits, state cells, memoized apply
//! - `flow`: event routing and keyed iteration over collections
//! - `context`: the per-traversal execution context handed to user code
//! - `system`: the owning handle that starts refresh and event traversals
//! - `storage`: capability-tagged component storage backing the context
//! - `error`: the crate-wide error type
//!
//! # Example
//!
//! ```rust,ignore
//! use reflow_core::signals::{apply, state, SignalGet};
//! use reflow_core::system::System;
//!
//! let mut system = System::new();
//! system.refresh(|ctx| {
//!     // Retained across refreshes; writing it schedules another refresh.
//!     let count = state(ctx, || 0)?;
//!
//!     // Recomputed only when `count` actually changes.
//!     let doubled = apply(ctx, |n: i32| n * 2, (&count,))?;
//!     if let Some(d) = doubled.get() {
//!         println!("doubled: {d}");
//!     }
//!     Ok(())
//! })?;
//! ```

pub mod error;
pub mod storage;
pub mod graph;
pub mod signals;
pub mod flow;
pub mod context;
pub mod system;
