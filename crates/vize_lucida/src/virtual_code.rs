//! Virtual code trees produced by language plugins.
//!
//! ## Architecture
//!
//! ```text
//! comp.vue (SourceScript)
//!     │
//!     ▼
//! VirtualCode "root" (vue)
//!     ├─► VirtualCode "template" (ts)   mappings → comp.vue
//!     │       └─► VirtualCode "template_inline_css" (css)
//!     ├─► VirtualCode "script_setup" (ts)
//!     └─► VirtualCode "style_0" (css)
//! ```
//!
//! Nodes are immutable and shared through `Arc`, so an incremental update can
//! hand unchanged subtrees over to the new tree as they are.
//!
//! Every node carries a [`Stamp`] allocated by [`VirtualCode::new`]. The
//! registry tracks ownership by that stamp, so two nodes projecting the very
//! same snapshot are still told apart. Clones share the stamp and count as
//! the same node.

use std::sync::Arc;

use vize_carton::{CompactString, FxHashMap, Stamp};

use crate::mapping::{LinkedCodeMapping, Mapping};
use crate::snapshot::Snapshot;

/// A generated document.
#[derive(Debug, Clone)]
pub struct VirtualCode {
    /// Identifier, unique among siblings
    pub id: CompactString,
    /// Language of the generated content (e.g. "typescript")
    pub language_id: CompactString,
    /// Generated content
    pub snapshot: Snapshot,
    /// Segments mapping the generated content back to source scripts
    pub mappings: Vec<Mapping>,
    /// Pairs of ranges in `snapshot` that spell the same symbol
    pub linked_code_mappings: Option<Vec<LinkedCodeMapping>>,
    /// Nested virtual codes
    pub embedded_codes: Vec<Arc<VirtualCode>>,
    stamp: Stamp,
}

impl VirtualCode {
    /// Create a virtual code without mappings or children.
    pub fn new(
        id: impl Into<CompactString>,
        language_id: impl Into<CompactString>,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            id: id.into(),
            language_id: language_id.into(),
            snapshot,
            mappings: Vec::new(),
            linked_code_mappings: None,
            embedded_codes: Vec::new(),
            stamp: Stamp::fresh(),
        }
    }

    /// Identity of this node.
    #[inline]
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    pub fn with_mappings(mut self, mappings: Vec<Mapping>) -> Self {
        self.mappings = mappings;
        self
    }

    pub fn with_linked_code_mappings(mut self, linked: Vec<LinkedCodeMapping>) -> Self {
        self.linked_code_mappings = Some(linked);
        self
    }

    pub fn with_embedded(mut self, code: impl Into<Arc<VirtualCode>>) -> Self {
        self.embedded_codes.push(code.into());
        self
    }

    /// Walk `root` and every nested code in pre-order.
    pub fn walk(root: &Arc<VirtualCode>) -> EmbeddedCodes<'_> {
        EmbeddedCodes { stack: vec![root] }
    }
}

/// Pre-order iterator over a virtual code tree, root included.
///
/// Uses an explicit stack, so deeply nested trees do not grow the call stack.
#[derive(Debug, Clone)]
pub struct EmbeddedCodes<'a> {
    stack: Vec<&'a Arc<VirtualCode>>,
}

impl<'a> Iterator for EmbeddedCodes<'a> {
    type Item = &'a Arc<VirtualCode>;

    fn next(&mut self) -> Option<Self::Item> {
        let code = self.stack.pop()?;
        self.stack.extend(code.embedded_codes.iter().rev());
        Some(code)
    }
}

/// Flattened view of a generated tree.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedIndex {
    /// Every node in pre-order
    codes: Vec<Arc<VirtualCode>>,
    /// Id lookup; the later node in pre-order wins a shared id
    by_id: FxHashMap<CompactString, usize>,
}

impl EmbeddedIndex {
    /// Flatten `root` and all its descendants.
    pub fn build(root: &Arc<VirtualCode>) -> Self {
        let mut index = Self::default();
        for code in VirtualCode::walk(root) {
            let slot = index.codes.len();
            if index.by_id.insert(code.id.clone(), slot).is_some() {
                tracing::debug!("virtual code id {} appears more than once in tree", code.id);
            }
            index.codes.push(Arc::clone(code));
        }
        index
    }

    /// Look up a node by id.
    pub fn get(&self, id: &str) -> Option<&Arc<VirtualCode>> {
        self.by_id.get(id).map(|&i| &self.codes[i])
    }

    /// Iterate nodes in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<VirtualCode>> {
        self.codes.iter()
    }

    /// Ids in pre-order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(|c| c.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
