//! Language plugins: the pluggable half of the engine.
//!
//! The registry never looks inside a document. For every script it asks the
//! plugins, in order, which language the script is and what virtual code it
//! projects to; the first plugin that answers wins and owns the result.

use std::cell::RefCell;
use std::sync::Arc;

use vize_carton::{CompactString, FxHashMap};

use crate::registry::{ScriptId, SourceScript};
use crate::snapshot::Snapshot;
use crate::virtual_code::VirtualCode;

/// A language plugin.
pub trait LanguagePlugin: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Detect the language of a script.
    fn language_id(&self, id: &ScriptId) -> Option<CompactString>;

    /// Project a script into a virtual code tree.
    ///
    /// Returning `None` passes the script on to the next plugin.
    fn create_virtual_code(
        &self,
        id: &ScriptId,
        language_id: &str,
        snapshot: &Snapshot,
        ctx: &CodegenContext<'_>,
    ) -> Option<VirtualCode>;

    /// Update a tree this plugin created after the script changed.
    ///
    /// The returned tree may reuse any node of `code`, including `code`
    /// itself. Returning `None` makes the registry drop the tree and create
    /// a fresh one.
    fn update_virtual_code(
        &self,
        _id: &ScriptId,
        _code: &Arc<VirtualCode>,
        _snapshot: &Snapshot,
        _ctx: &CodegenContext<'_>,
    ) -> Option<Arc<VirtualCode>> {
        None
    }

    /// Release resources held for a tree that is being dropped.
    fn dispose_virtual_code(&self, _id: &ScriptId, _code: &VirtualCode) {}
}

/// Context handed to a plugin while it generates code for one script.
pub struct CodegenContext<'a> {
    scripts: &'a FxHashMap<ScriptId, SourceScript>,
    associated: RefCell<Vec<ScriptId>>,
}

impl<'a> CodegenContext<'a> {
    pub(crate) fn new(scripts: &'a FxHashMap<ScriptId, SourceScript>) -> Self {
        Self {
            scripts,
            associated: RefCell::new(Vec::new()),
        }
    }

    /// Read another registered script.
    ///
    /// The script being generated is marked as depending on `id` and gets
    /// regenerated the next time it is read after `id` changes or is deleted.
    /// The lookup does not synchronize `id`.
    pub fn associated_script(&self, id: &ScriptId) -> Option<&'a SourceScript> {
        let mut associated = self.associated.borrow_mut();
        if !associated.contains(id) {
            associated.push(id.clone());
        }
        self.scripts.get(id)
    }

    pub(crate) fn into_associations(self) -> Vec<ScriptId> {
        self.associated.into_inner()
    }
}
