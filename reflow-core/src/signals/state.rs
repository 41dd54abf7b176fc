//! State Cells
//!
//! A state cell is the retained, writable storage behind an interactive
//! widget: a value living in a persistent graph slot, plus a write counter
//! that gives it a cheap versioned identity. Writing a cell bumps the
//! counter and raises the owning system's refresh flag, so the next refresh
//! sees both the new value and a changed identity.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::context::Context;
use crate::error::Result;
use crate::graph::SlotClass;

use super::id::{next_cell_id, ValueId};
use super::signal::{Signal, SignalGet, SignalSet};

struct StateCell<T> {
    value: Option<T>,
    version: u64,
    cell: u64,
}

/// A cloneable handle to one retained state cell.
///
/// Handles stay valid across traversals; a widget can stash one in an event
/// closure and write through it later. All clones share the same cell.
pub struct State<T> {
    cell: Rc<RefCell<StateCell<T>>>,
    refresh_needed: Rc<Cell<bool>>,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            refresh_needed: Rc::clone(&self.refresh_needed),
        }
    }
}

impl<T> Signal for State<T> {
    type Value = T;

    fn value_id(&self) -> ValueId {
        let cell = self.cell.borrow();
        if cell.value.is_some() {
            ValueId::Versioned {
                cell: cell.cell,
                version: cell.version,
            }
        } else {
            ValueId::None
        }
    }
}

impl<T: Clone> SignalGet for State<T> {
    fn get(&self) -> Option<T> {
        self.cell.borrow().value.clone()
    }
}

impl<T> SignalSet for State<T> {
    /// Writes always bump the version, even when the new value equals the
    /// old one. Identity may change conservatively; it must never stay put
    /// across an actual change.
    fn set(&mut self, value: T) {
        {
            let mut cell = self.cell.borrow_mut();
            cell.value = Some(value);
            cell.version += 1;
        }
        self.refresh_needed.set(true);
    }
}

/// Claims a state cell at the current traversal position, initializing it
/// with `init` on the first visit.
///
/// The cell itself is retained in the data graph; the returned handle is a
/// fresh clone each traversal. Like any slot, the cell's type is fixed by
/// its first visit.
pub fn state<T: 'static>(ctx: &mut Context, init: impl FnOnce() -> T) -> Result<State<T>> {
    claim_cell(ctx, || Some(init()))
}

/// Claims a state cell that starts without a value.
///
/// The resulting signal is unready until the first write, which is how a
/// widget models "the user has not picked anything yet".
pub fn state_empty<T: 'static>(ctx: &mut Context) -> Result<State<T>> {
    claim_cell(ctx, || None)
}

fn claim_cell<T: 'static>(
    ctx: &mut Context,
    init: impl FnOnce() -> Option<T>,
) -> Result<State<T>> {
    let refresh_needed = ctx.system_link()?.refresh_flag();
    let data = ctx.data()?;
    let cell = data.borrow_mut().slot(
        SlotClass::Persistent,
        || {
            Rc::new(RefCell::new(StateCell {
                value: init(),
                version: 0,
                cell: next_cell_id(),
            }))
        },
        |stored| Rc::clone(stored),
    )?;
    Ok(State {
        cell,
        refresh_needed,
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
