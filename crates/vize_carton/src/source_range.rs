//! Byte offset ranges shared by every Vize crate that maps positions.

use serde::{Deserialize, Serialize};

/// A range of byte offsets in a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRange {
    /// Start byte offset
    pub start: u32,
    /// End byte offset (exclusive)
    pub end: u32,
}

impl SourceRange {
    /// Create a new source range.
    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a range from a start offset and a length.
    #[inline]
    pub const fn at(start: u32, len: u32) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// Check if this range contains the given offset (end exclusive).
    #[inline]
    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Check if the offset lies inside the range or on one of its edges.
    ///
    /// A cursor placed right after an identifier sits on the `end` edge and
    /// still belongs to it.
    #[inline]
    pub fn touches(&self, offset: u32) -> bool {
        offset >= self.start && offset <= self.end
    }

    /// Check if `other` lies completely inside this range.
    #[inline]
    pub fn covers(&self, other: SourceRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Get the length of this range.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Check if this range is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl std::fmt::Display for SourceRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}
