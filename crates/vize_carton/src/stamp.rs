//! Identity stamps.
//!
//! A [`Stamp`] is a process-wide unique, monotonically increasing number that
//! stands in for object identity. Values that must be compared "by reference"
//! (text snapshots, generated documents) carry a stamp allocated when they
//! are created, and clones share it. Caches keyed by stamps never hold the
//! value itself alive.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_STAMP: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stamp(NonZeroU64);

impl Stamp {
    /// Allocate a stamp that has never been handed out before.
    #[inline]
    pub fn fresh() -> Self {
        let raw = NEXT_STAMP.fetch_add(1, Ordering::Relaxed);
        // The counter starts at 1 and a u64 does not wrap in practice.
        Stamp(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Raw numeric value, mostly useful for logging.
    #[inline]
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl std::fmt::Display for Stamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
