//! Value Identity
//!
//! Change detection in Reflow never diffs values. Every signal carries a
//! [`ValueId`], a small copyable token whose equality *implies* the
//! underlying values are observably the same. Identities are allowed to
//! change even when the value did not (a wasted recomputation, never a wrong
//! one), but they must change whenever the value does.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHasher;

/// Allocates the number for a new storage cell.
///
/// Cell numbers are globally unique, so versioned identities from two
/// different cells can never collide even when their write counters happen
/// to match.
pub(crate) fn next_cell_id() -> u64 {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A cheap token standing in for a signal's current value in comparisons.
///
/// The comparison contract is one-sided: equal ids guarantee equivalent
/// values, unequal ids guarantee nothing. There is deliberately no `Eq`
/// impl, because [`ValueId::None`] is not equal to anything, itself
/// included; a signal without a value never matches a memoization record.
#[derive(Debug, Clone, Copy)]
pub enum ValueId {
    /// The signal has no value right now.
    None,

    /// A hash of the observable value. Used by borrowing adapters and
    /// literal signals, where there is no storage cell to version.
    Hashed(u64),

    /// A storage cell plus its write counter. Used by state cells and
    /// memoization records: bumping the counter on every write makes the
    /// identity change without hashing the value.
    Versioned {
        /// Globally unique cell number from [`next_cell_id`].
        cell: u64,
        /// Write counter within that cell.
        version: u64,
    },
}

impl ValueId {
    /// Identity of a value by hashing its observable content.
    pub fn hashed<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = FxHasher::default();
        value.hash(&mut hasher);
        ValueId::Hashed(hasher.finish())
    }

    /// Folds several input identities into one.
    ///
    /// If any input has no identity, the combination has none either: a
    /// composite over an unready signal is itself unready. Order matters,
    /// and the variant of each input is mixed in alongside its payload so a
    /// hashed id and a versioned id can never alias.
    pub fn combine(ids: &[ValueId]) -> Self {
        let mut hasher = FxHasher::default();
        for id in ids {
            match id {
                ValueId::None => return ValueId::None,
                ValueId::Hashed(hash) => {
                    0u8.hash(&mut hasher);
                    hash.hash(&mut hasher);
                }
                ValueId::Versioned { cell, version } => {
                    1u8.hash(&mut hasher);
                    cell.hash(&mut hasher);
                    version.hash(&mut hasher);
                }
            }
        }
        ValueId::Hashed(hasher.finish())
    }

    /// Whether this is [`ValueId::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, ValueId::None)
    }

    /// Whether this id identifies an actual value.
    pub fn is_some(&self) -> bool {
        !self.is_none()
    }
}

impl PartialEq for ValueId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueId::Hashed(a), ValueId::Hashed(b)) => a == b,
            (
                ValueId::Versioned {
                    cell: a_cell,
                    version: a_version,
                },
                ValueId::Versioned {
                    cell: b_cell,
                    version: b_version,
                },
            ) => a_cell == b_cell && a_version == b_version,
            _ => false,
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_not_equal_to_itself() {
        assert_ne!(ValueId::None, ValueId::None);
        assert_ne!(ValueId::None, ValueId::Hashed(0));
    }

    #[test]
    fn hashed_ids_track_the_value() {
        assert_eq!(ValueId::hashed(&42), ValueId::hashed(&42));
        assert_ne!(ValueId::hashed(&42), ValueId::hashed(&43));
    }

    #[test]
    fn versioned_ids_from_different_cells_never_match() {
        let a = ValueId::Versioned {
            cell: next_cell_id(),
            version: 0,
        };
        let b = ValueId::Versioned {
            cell: next_cell_id(),
            version: 0,
        };
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn combine_propagates_missing_inputs() {
        let ready = ValueId::hashed(&1);
        assert!(ValueId::combine(&[ready, ValueId::None]).is_none());
        assert!(ValueId::combine(&[ready, ready]).is_some());
    }

    #[test]
    fn combine_is_order_sensitive() {
        let a = ValueId::hashed(&1);
        let b = ValueId::hashed(&2);
        assert_ne!(ValueId::combine(&[a, b]), ValueId::combine(&[b, a]));
        assert_eq!(ValueId::combine(&[a, b]), ValueId::combine(&[a, b]));
    }
}
