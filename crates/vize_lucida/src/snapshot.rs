//! Immutable text snapshots compared by identity.
//!
//! A [`Snapshot`] is the content of a document at one point in time. Two
//! snapshots are equal only if one is a clone of the other: building a new
//! snapshot from the very same text yields a different identity. Every cache
//! in this crate relies on that, so producers must create a new snapshot
//! whenever content changes.

use std::borrow::Cow;
use std::sync::Arc;

use ropey::Rope;
use vize_carton::Stamp;

/// Text storage behind a [`Snapshot`].
pub trait ScriptSnapshot: Send + Sync {
    /// Length of the text in bytes.
    fn len(&self) -> u32;

    /// Text between two byte offsets.
    fn slice(&self, start: u32, end: u32) -> Cow<'_, str>;

    /// Check if the text is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ScriptSnapshot for String {
    fn len(&self) -> u32 {
        self.as_str().len() as u32
    }

    fn slice(&self, start: u32, end: u32) -> Cow<'_, str> {
        Cow::Borrowed(&self[start as usize..end as usize])
    }
}

impl ScriptSnapshot for Box<str> {
    fn len(&self) -> u32 {
        str::len(self) as u32
    }

    fn slice(&self, start: u32, end: u32) -> Cow<'_, str> {
        Cow::Borrowed(&self[start as usize..end as usize])
    }
}

impl ScriptSnapshot for &'static str {
    fn len(&self) -> u32 {
        str::len(self) as u32
    }

    fn slice(&self, start: u32, end: u32) -> Cow<'_, str> {
        Cow::Borrowed(&self[start as usize..end as usize])
    }
}

impl ScriptSnapshot for Rope {
    fn len(&self) -> u32 {
        self.len_bytes() as u32
    }

    fn slice(&self, start: u32, end: u32) -> Cow<'_, str> {
        let slice = self.byte_slice(start as usize..end as usize);
        match slice.as_str() {
            Some(text) => Cow::Borrowed(text),
            None => Cow::Owned(slice.to_string()),
        }
    }
}

/// Shared handle to an immutable text snapshot.
#[derive(Clone)]
pub struct Snapshot {
    stamp: Stamp,
    inner: Arc<dyn ScriptSnapshot>,
}

impl Snapshot {
    /// Wrap text storage into a snapshot with a fresh identity.
    pub fn new(content: impl ScriptSnapshot + 'static) -> Self {
        Self {
            stamp: Stamp::fresh(),
            inner: Arc::new(content),
        }
    }

    /// Create a snapshot from a string.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text.into())
    }

    /// Identity of this snapshot.
    #[inline]
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    /// Length in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the snapshot is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Text between two byte offsets.
    pub fn slice(&self, start: u32, end: u32) -> Cow<'_, str> {
        self.inner.slice(start, end)
    }

    /// Whole text.
    pub fn text(&self) -> Cow<'_, str> {
        self.inner.slice(0, self.inner.len())
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.stamp == other.stamp
    }
}

impl Eq for Snapshot {}

impl std::hash::Hash for Snapshot {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.stamp.hash(state);
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("stamp", &self.stamp)
            .field("len", &self.len())
            .finish()
    }
}

impl From<&str> for Snapshot {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}

impl From<String> for Snapshot {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl From<Rope> for Snapshot {
    fn from(rope: Rope) -> Self {
        Self::new(rope)
    }
}
