//! Source script registry.
//!
//! The registry owns every known source script and the virtual code tree
//! generated for it, and decides between incremental updates and full
//! regeneration:
//!
//! ```text
//! set(id, snapshot)
//!     │
//!     ├─ unknown id ─────────────► create (plugins in order, first wins)
//!     ├─ language changed ───────► delete + create
//!     ├─ same snapshot ──────────► no-op
//!     └─ new snapshot ───────────► owning plugin update
//!                                     ├─ Some(root) ─► re-index
//!                                     └─ None ───────► delete + create
//! ```
//!
//! The registry and its caches are a single-threaded unit. Hosts that share
//! one between threads wrap it in a lock.

mod script;
mod sync;

use std::cell::RefCell;
use std::sync::Arc;

use vize_carton::{CompactString, FxHashMap, FxHashSet, Stamp};

pub use script::*;
pub use sync::*;

use crate::cache::{CacheStats, LinkedCodeCache, LinkedCodeMaps, MappingCache, SourceMaps};
use crate::options::LanguageOptions;
use crate::plugin::{CodegenContext, LanguagePlugin};
use crate::snapshot::Snapshot;
use crate::validate::validate_tree;
use crate::virtual_code::{EmbeddedIndex, VirtualCode};

/// Registry of source scripts and their generated virtual code.
pub struct ScriptRegistry {
    plugins: Vec<Arc<dyn LanguagePlugin>>,
    sync: Option<Box<dyn ScriptSync + Send>>,
    options: LanguageOptions,
    scripts: FxHashMap<ScriptId, SourceScript>,
    /// Owning script of every indexed virtual code, by node stamp
    code_owners: FxHashMap<Stamp, ScriptId>,
    /// Indexed nodes per generated snapshot; cache rows go when it drops to zero
    live_snapshots: FxHashMap<Stamp, u32>,
    pub(crate) map_cache: RefCell<MappingCache>,
    pub(crate) linked_code_cache: RefCell<LinkedCodeCache>,
}

impl ScriptRegistry {
    /// Create a registry probing `plugins` in order.
    pub fn new(plugins: Vec<Arc<dyn LanguagePlugin>>) -> Self {
        Self {
            plugins,
            sync: None,
            options: LanguageOptions::default(),
            scripts: FxHashMap::default(),
            code_owners: FxHashMap::default(),
            live_snapshots: FxHashMap::default(),
            map_cache: RefCell::new(MappingCache::default()),
            linked_code_cache: RefCell::new(LinkedCodeCache::default()),
        }
    }

    /// Install the hook run before every [`get`](Self::get).
    pub fn with_sync(mut self, sync: impl ScriptSync + Send + 'static) -> Self {
        self.sync = Some(Box::new(sync));
        self
    }

    pub fn with_options(mut self, options: LanguageOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LanguageOptions {
        &self.options
    }

    pub fn plugins(&self) -> &[Arc<dyn LanguagePlugin>] {
        &self.plugins
    }

    /// Synchronize `id` with the host, then read it.
    pub fn get(&mut self, id: &ScriptId) -> Option<&SourceScript> {
        let action = self.sync.as_ref().map(|sync| sync.sync(id));
        match action {
            None | Some(SyncAction::Keep) => {}
            Some(SyncAction::Set {
                snapshot,
                language_id,
            }) => {
                self.set(id, snapshot, language_id.as_deref());
            }
            Some(SyncAction::Delete) => self.delete(id),
        }

        let dirty = self
            .scripts
            .get(id)
            .filter(|script| script.association_dirty)
            .map(|script| (script.snapshot.clone(), script.language_id.clone()));
        if let Some((snapshot, language_id)) = dirty {
            tracing::debug!("regenerating {} after an associated script changed", id);
            self.set(id, snapshot, Some(language_id.as_str()));
        }

        self.scripts.get(id)
    }

    /// Read a script without synchronizing it.
    pub fn peek(&self, id: &ScriptId) -> Option<&SourceScript> {
        self.scripts.get(id)
    }

    /// Register or update a script using the registry's plugins.
    pub fn set(
        &mut self,
        id: impl Into<ScriptId>,
        snapshot: Snapshot,
        language_id: Option<&str>,
    ) -> Option<&SourceScript> {
        let plugins = self.plugins.clone();
        self.set_with_plugins(id, snapshot, language_id, &plugins)
    }

    /// Register or update a script using an explicit plugin list.
    ///
    /// Without `language_id`, the first plugin that recognizes the script
    /// decides its language. If none does, nothing changes and `None` is
    /// returned.
    pub fn set_with_plugins(
        &mut self,
        id: impl Into<ScriptId>,
        snapshot: Snapshot,
        language_id: Option<&str>,
        plugins: &[Arc<dyn LanguagePlugin>],
    ) -> Option<&SourceScript> {
        let id = id.into();
        let language_id = match language_id {
            Some(language_id) => CompactString::from(language_id),
            None => match detect_language(&id, plugins) {
                Some(language_id) => language_id,
                None => {
                    tracing::warn!("no language recognized for {}", id);
                    return None;
                }
            },
        };

        let Some(script) = self.scripts.get(&id) else {
            return Some(self.create(id, language_id, snapshot, plugins));
        };

        if script.language_id != language_id {
            tracing::debug!(
                "language of {} changed from {} to {}",
                id,
                script.language_id,
                language_id
            );
            self.delete(&id);
            return Some(self.create(id, language_id, snapshot, plugins));
        }

        if script.snapshot == snapshot && !script.association_dirty {
            return self.scripts.get(&id);
        }

        if self.update(&id, snapshot.clone()) {
            return self.scripts.get(&id);
        }

        self.delete(&id);
        Some(self.create(id, language_id, snapshot, plugins))
    }

    /// Remove a script, letting its owning plugin dispose the generated tree.
    pub fn delete(&mut self, id: &ScriptId) {
        let Some(mut script) = self.scripts.remove(id) else {
            return;
        };
        if let Some(generated) = script.generated.take() {
            generated.plugin.dispose_virtual_code(id, &generated.root);
            self.retire(id, &generated.embedded, None);
        }
        self.clear_associations(&mut script);
        self.mark_targets_dirty(&script);
        tracing::debug!("deleted {}", id);
    }

    /// Script owning a virtual code of this registry.
    pub fn script_for_code(&self, code: &VirtualCode) -> Option<&SourceScript> {
        self.owner_of(code).and_then(|id| self.scripts.get(id))
    }

    /// Position maps between virtual codes and source scripts.
    pub fn maps(&self) -> SourceMaps<'_> {
        SourceMaps::new(self)
    }

    /// Linked code maps of virtual codes.
    pub fn linked_code_maps(&self) -> LinkedCodeMaps<'_> {
        LinkedCodeMaps::new(self)
    }

    /// How many maps the caches have built so far.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            source_maps_built: self.map_cache.borrow().built(),
            linked_code_maps_built: self.linked_code_cache.borrow().built(),
        }
    }

    /// Ids of every registered script.
    pub fn ids(&self) -> impl Iterator<Item = &ScriptId> {
        self.scripts.keys()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub(crate) fn owner_of(&self, code: &VirtualCode) -> Option<&ScriptId> {
        self.code_owners.get(&code.stamp())
    }

    fn create(
        &mut self,
        id: ScriptId,
        language_id: CompactString,
        snapshot: Snapshot,
        plugins: &[Arc<dyn LanguagePlugin>],
    ) -> &SourceScript {
        let mut script = SourceScript::new(id.clone(), language_id, snapshot);
        let mut associations = Vec::new();

        for plugin in plugins {
            let ctx = CodegenContext::new(&self.scripts);
            let code =
                plugin.create_virtual_code(&id, &script.language_id, &script.snapshot, &ctx);
            let requested = ctx.into_associations();
            let Some(code) = code else {
                continue;
            };
            let root = Arc::new(code);
            if !self.accept(&root, &id, &script.snapshot) {
                continue;
            }
            tracing::debug!("{} generated virtual code for {}", plugin.name(), id);
            associations = requested;
            script.generated = Some(GeneratedCode::new(root, Arc::clone(plugin)));
            break;
        }

        match &script.generated {
            Some(generated) => self.index(&id, &generated.embedded),
            None => tracing::debug!("no plugin generated virtual code for {}", id),
        }
        self.associate(&mut script, associations);

        // scripts that read this id before it existed
        for dependent in self.scripts.values_mut() {
            if dependent.associated_ids.contains(&id) {
                dependent.association_dirty = true;
                script.target_ids.insert(dependent.id.clone());
            }
        }

        self.scripts.insert(id.clone(), script);
        &self.scripts[&id]
    }

    /// Assign a new snapshot and let the owning plugin update the tree.
    ///
    /// Returns `false` when the plugin declined; the script then still holds
    /// its previous tree so that deleting it disposes that tree.
    fn update(&mut self, id: &ScriptId, snapshot: Snapshot) -> bool {
        let Some(mut script) = self.scripts.remove(id) else {
            return false;
        };
        if script.snapshot != snapshot {
            self.mark_targets_dirty(&script);
        }
        script.snapshot = snapshot;
        script.association_dirty = false;

        let Some(generated) = script.generated.take() else {
            self.scripts.insert(id.clone(), script);
            return true;
        };

        self.clear_associations(&mut script);
        let ctx = CodegenContext::new(&self.scripts);
        let updated = generated
            .plugin
            .update_virtual_code(id, &generated.root, &script.snapshot, &ctx)
            .filter(|root| self.accept(root, id, &script.snapshot));
        let associations = ctx.into_associations();

        let Some(root) = updated else {
            tracing::debug!(
                "{} declined incremental update of {}",
                generated.plugin.name(),
                id
            );
            script.generated = Some(generated);
            self.scripts.insert(id.clone(), script);
            return false;
        };

        let next = GeneratedCode::new(root, Arc::clone(&generated.plugin));
        self.retire(id, &generated.embedded, Some(&next.embedded));
        self.index(id, &next.embedded);
        tracing::debug!(
            "{} updated virtual code for {} ({} codes)",
            next.plugin.name(),
            id,
            next.embedded.len()
        );
        script.generated = Some(next);
        self.associate(&mut script, associations);
        self.scripts.insert(id.clone(), script);
        true
    }

    fn accept(&self, root: &Arc<VirtualCode>, id: &ScriptId, snapshot: &Snapshot) -> bool {
        if !self.options.validate_virtual_code {
            return true;
        }
        match validate_tree(root, id, snapshot, &self.scripts) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!("rejected virtual code for {}: {}", id, err);
                false
            }
        }
    }

    fn index(&mut self, id: &ScriptId, embedded: &EmbeddedIndex) {
        for code in embedded.iter() {
            if self.code_owners.insert(code.stamp(), id.clone()).is_none() {
                *self.live_snapshots.entry(code.snapshot.stamp()).or_default() += 1;
            }
        }
    }

    /// Forget codes of `old` that are not part of `next`.
    ///
    /// Cache rows are keyed by generated snapshot and stay alive while any
    /// indexed node still projects that snapshot.
    fn retire(&mut self, id: &ScriptId, old: &EmbeddedIndex, next: Option<&EmbeddedIndex>) {
        let kept: FxHashSet<(Stamp, Stamp)> = next
            .map(|next| next.iter().map(|code| identity(code)).collect())
            .unwrap_or_default();
        let map_cache = self.map_cache.get_mut();
        let linked_code_cache = self.linked_code_cache.get_mut();
        for code in old.iter() {
            let owned = self.code_owners.get(&code.stamp()) == Some(id);
            if !owned || kept.contains(&identity(code)) {
                continue;
            }
            self.code_owners.remove(&code.stamp());

            let snapshot = code.snapshot.stamp();
            let Some(live) = self.live_snapshots.get_mut(&snapshot) else {
                continue;
            };
            *live -= 1;
            if *live == 0 {
                self.live_snapshots.remove(&snapshot);
                map_cache.evict(snapshot);
                linked_code_cache.evict(snapshot);
                tracing::trace!("evicted caches of virtual code {} ({})", code.id, snapshot);
            }
        }
    }

    fn associate(&mut self, script: &mut SourceScript, ids: Vec<ScriptId>) {
        for associated in ids {
            if let Some(other) = self.scripts.get_mut(&associated) {
                other.target_ids.insert(script.id.clone());
            }
            script.associated_ids.insert(associated);
        }
    }

    fn clear_associations(&mut self, script: &mut SourceScript) {
        for associated in script.associated_ids.drain() {
            if let Some(other) = self.scripts.get_mut(&associated) {
                other.target_ids.remove(&script.id);
            }
        }
    }

    fn mark_targets_dirty(&mut self, script: &SourceScript) {
        for target in &script.target_ids {
            if let Some(target) = self.scripts.get_mut(target) {
                target.association_dirty = true;
            }
        }
    }
}

impl std::fmt::Debug for ScriptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptRegistry")
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("scripts", &self.scripts)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Node and generated snapshot of a virtual code.
fn identity(code: &VirtualCode) -> (Stamp, Stamp) {
    (code.stamp(), code.snapshot.stamp())
}

/// First non-empty language id reported by `plugins`.
fn detect_language(id: &ScriptId, plugins: &[Arc<dyn LanguagePlugin>]) -> Option<CompactString> {
    plugins
        .iter()
        .find_map(|plugin| plugin.language_id(id).filter(|language| !language.is_empty()))
}
