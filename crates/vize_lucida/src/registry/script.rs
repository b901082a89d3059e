//! Source scripts and their generated trees.

use std::sync::Arc;

use vize_carton::{CompactString, FxHashSet};

use crate::plugin::LanguagePlugin;
use crate::snapshot::Snapshot;
use crate::virtual_code::{EmbeddedIndex, VirtualCode};

/// Stable identifier of a source script (usually a path or URI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(CompactString);

impl ScriptId {
    pub fn new(id: impl Into<CompactString>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ScriptId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ScriptId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<&ScriptId> for ScriptId {
    fn from(id: &ScriptId) -> Self {
        id.clone()
    }
}

impl std::fmt::Display for ScriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source document known to the registry.
#[derive(Debug)]
pub struct SourceScript {
    pub(crate) id: ScriptId,
    pub(crate) language_id: CompactString,
    pub(crate) snapshot: Snapshot,
    pub(crate) generated: Option<GeneratedCode>,
    /// Scripts this script read while generating
    pub(crate) associated_ids: FxHashSet<ScriptId>,
    /// Scripts that read this script while generating
    pub(crate) target_ids: FxHashSet<ScriptId>,
    pub(crate) association_dirty: bool,
}

impl SourceScript {
    pub(crate) fn new(id: ScriptId, language_id: CompactString, snapshot: Snapshot) -> Self {
        Self {
            id,
            language_id,
            snapshot,
            generated: None,
            associated_ids: FxHashSet::default(),
            target_ids: FxHashSet::default(),
            association_dirty: false,
        }
    }

    pub fn id(&self) -> &ScriptId {
        &self.id
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// The generated tree, if some plugin projected this script.
    pub fn generated(&self) -> Option<&GeneratedCode> {
        self.generated.as_ref()
    }

    /// Scripts this script depends on.
    pub fn associated_ids(&self) -> impl Iterator<Item = &ScriptId> {
        self.associated_ids.iter()
    }

    /// Scripts depending on this script.
    pub fn target_ids(&self) -> impl Iterator<Item = &ScriptId> {
        self.target_ids.iter()
    }

    /// Whether a script this one depends on changed since it was generated.
    pub fn is_association_dirty(&self) -> bool {
        self.association_dirty
    }
}

/// A generated tree together with the plugin that owns it.
pub struct GeneratedCode {
    pub(crate) root: Arc<VirtualCode>,
    pub(crate) plugin: Arc<dyn LanguagePlugin>,
    pub(crate) embedded: EmbeddedIndex,
}

impl GeneratedCode {
    pub(crate) fn new(root: Arc<VirtualCode>, plugin: Arc<dyn LanguagePlugin>) -> Self {
        let embedded = EmbeddedIndex::build(&root);
        Self {
            root,
            plugin,
            embedded,
        }
    }

    pub fn root(&self) -> &Arc<VirtualCode> {
        &self.root
    }

    pub fn plugin(&self) -> &Arc<dyn LanguagePlugin> {
        &self.plugin
    }

    /// Every node of the tree in pre-order, root included.
    pub fn embedded_codes(&self) -> &EmbeddedIndex {
        &self.embedded
    }

    /// Look up a node by id.
    pub fn embedded_code(&self, id: &str) -> Option<&Arc<VirtualCode>> {
        self.embedded.get(id)
    }
}

impl std::fmt::Debug for GeneratedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedCode")
            .field("root", &self.root.id)
            .field("plugin", &self.plugin.name())
            .field("embedded", &self.embedded.len())
            .finish()
    }
}
