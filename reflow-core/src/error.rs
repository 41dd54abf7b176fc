//! Error types for reflow-core.

use thiserror::Error;

/// Result type for reflow-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during a traversal.
///
/// Most variants are programming errors in the description function (a call
/// site changing its retained type between traversals, a service missing
/// from the context) and are surfaced the first time they happen.
/// [`Error::Aborted`] is control flow rather than failure: dispatch entry
/// points absorb it and report the traversal as complete.
#[derive(Debug, Error)]
pub enum Error {
    /// A data slot was revisited with a different type than it was created
    /// with. The call site's retained type changed between traversals.
    #[error("data slot holds {found}, requested {requested}")]
    SlotTypeMismatch {
        /// Type the call site asked for on this visit.
        requested: &'static str,
        /// Type the slot was created with.
        found: &'static str,
    },

    /// A graph position was revisited as a different structural element
    /// (a scope where a slot used to be, or vice versa).
    #[error("traversal shape changed: expected {expected}")]
    ShapeMismatch {
        /// What the previous traversal put at this position.
        expected: &'static str,
    },

    /// A capability was requested that no service registered under.
    #[error("missing context component: {0}")]
    MissingComponent(&'static str),

    /// A memoized computation returned an error. The previous cached result
    /// is kept but no longer served; only a later successful recomputation
    /// makes the record trustworthy again.
    #[error("memoized computation failed: {0}")]
    Computation(#[source] Box<dyn std::error::Error + 'static>),

    /// The remainder of the current traversal was intentionally skipped.
    #[error("traversal aborted")]
    Aborted,
}

impl Error {
    /// Wraps an error raised by user code inside a memoized computation.
    pub fn computation(err: impl Into<Box<dyn std::error::Error + 'static>>) -> Self {
        Error::Computation(err.into())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
