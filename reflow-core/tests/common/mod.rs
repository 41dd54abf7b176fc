//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fmt::{Display, Write};
use std::rc::Rc;

/// Counts invocations, shareable into description closures.
#[derive(Clone, Default)]
pub struct CallCounter(Rc<Cell<usize>>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.0.set(self.0.get() + 1);
    }

    pub fn count(&self) -> usize {
        self.0.get()
    }
}

/// Appends `value` and a separator to a shared transcript, so a test can
/// assert on the exact order a description produced output in.
pub fn emit(out: &Rc<RefCell<String>>, value: impl Display) {
    write!(out.borrow_mut(), "{value};").expect("writing to a string cannot fail");
}
