//! Registry and cache behaviour tests.
//!
//! The plugins here are stubs: `{{ expr }}` templates project into an
//! `expr;` TypeScript snippet with a single mapping over the expression.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vize_carton::{CompactString, SourceRange};
use vize_lucida::{
    CodegenContext, LanguageOptions, LanguagePlugin, LinkedCodeMapping, Mapping, ScriptId,
    ScriptRegistry, Snapshot, SyncAction, VirtualCode,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[derive(Debug, Default)]
struct Calls {
    create: AtomicUsize,
    update: AtomicUsize,
    dispose: AtomicUsize,
}

impl Calls {
    fn create(&self) -> usize {
        self.create.load(Ordering::SeqCst)
    }

    fn update(&self) -> usize {
        self.update.load(Ordering::SeqCst)
    }

    fn dispose(&self) -> usize {
        self.dispose.load(Ordering::SeqCst)
    }
}

/// Projects `{{ expr }}` into `expr;`.
struct InterpolationPlugin {
    language: &'static str,
    extension: &'static str,
    incremental: bool,
    embedded: bool,
    calls: Arc<Calls>,
}

impl InterpolationPlugin {
    fn new(language: &'static str, extension: &'static str) -> Self {
        Self {
            language,
            extension,
            incremental: true,
            embedded: false,
            calls: Arc::new(Calls::default()),
        }
    }

    fn full_only(mut self) -> Self {
        self.incremental = false;
        self
    }

    fn with_embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    fn project(&self, id: &ScriptId, snapshot: &Snapshot) -> VirtualCode {
        let text = snapshot.text();
        let start = text.find("{{").map(|i| i + 2).unwrap_or(0);
        let end = text[start..]
            .find("}}")
            .map(|i| start + i)
            .unwrap_or(text.len());
        let inner = &text[start..end];
        let expr = inner.trim();
        let expr_start = start + (inner.len() - inner.trim_start().len());
        let len = expr.len() as u32;

        VirtualCode::new(
            "root",
            "typescript",
            Snapshot::from_text(format!("{};", expr)),
        )
        .with_mappings(vec![Mapping::new(
            SourceRange::at(expr_start as u32, len),
            SourceRange::at(0, len),
        )
        .in_source(id)])
    }
}

fn children() -> Vec<Arc<VirtualCode>> {
    let leaf = |id: &str| VirtualCode::new(id, "css", Snapshot::from_text(format!("/* {} */", id)));
    vec![
        Arc::new(leaf("e1")),
        Arc::new(
            leaf("e2")
                .with_linked_code_mappings(vec![LinkedCodeMapping::new(
                    SourceRange::at(3, 1),
                    SourceRange::at(3, 1),
                )])
                .with_embedded(leaf("e3")),
        ),
    ]
}

impl LanguagePlugin for InterpolationPlugin {
    fn name(&self) -> &str {
        self.language
    }

    fn language_id(&self, id: &ScriptId) -> Option<CompactString> {
        id.as_str()
            .ends_with(self.extension)
            .then(|| self.language.into())
    }

    fn create_virtual_code(
        &self,
        id: &ScriptId,
        language_id: &str,
        snapshot: &Snapshot,
        _ctx: &CodegenContext<'_>,
    ) -> Option<VirtualCode> {
        if language_id != self.language {
            return None;
        }
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        let mut code = self.project(id, snapshot);
        if self.embedded {
            code.embedded_codes = children();
        }
        Some(code)
    }

    fn update_virtual_code(
        &self,
        id: &ScriptId,
        code: &Arc<VirtualCode>,
        snapshot: &Snapshot,
        _ctx: &CodegenContext<'_>,
    ) -> Option<Arc<VirtualCode>> {
        self.calls.update.fetch_add(1, Ordering::SeqCst);
        if !self.incremental {
            return None;
        }
        let mut next = self.project(id, snapshot);
        next.embedded_codes = code.embedded_codes.clone();
        Some(Arc::new(next))
    }

    fn dispose_virtual_code(&self, _id: &ScriptId, _code: &VirtualCode) {
        self.calls.dispose.fetch_add(1, Ordering::SeqCst);
    }
}

/// Maps into both the owner and `shared.ts`; reads `shared.ts` while
/// generating when `track` is set.
struct IncludePlugin {
    calls: Arc<Calls>,
    track: bool,
}

impl LanguagePlugin for IncludePlugin {
    fn language_id(&self, id: &ScriptId) -> Option<CompactString> {
        id.as_str().ends_with(".tpl").then(|| "tpl".into())
    }

    fn create_virtual_code(
        &self,
        _id: &ScriptId,
        language_id: &str,
        _snapshot: &Snapshot,
        ctx: &CodegenContext<'_>,
    ) -> Option<VirtualCode> {
        if language_id != "tpl" {
            return None;
        }
        self.calls.create.fetch_add(1, Ordering::SeqCst);
        let shared_len = if self.track {
            let shared = ctx.associated_script(&ScriptId::from("shared.ts"));
            shared.map(|s| s.snapshot().len()).unwrap_or(0)
        } else {
            6
        };

        Some(
            VirtualCode::new("root", "typescript", Snapshot::from_text("include;")).with_mappings(
                vec![
                    Mapping::new(SourceRange::at(0, 2), SourceRange::at(0, 2)),
                    Mapping::new(SourceRange::at(0, shared_len.min(7)), SourceRange::at(0, 7))
                        .in_source("shared.ts"),
                ],
            ),
        )
    }
}

/// Emits a mapping far beyond the generated content.
struct BrokenPlugin;

impl LanguagePlugin for BrokenPlugin {
    fn name(&self) -> &str {
        "broken"
    }

    fn language_id(&self, id: &ScriptId) -> Option<CompactString> {
        id.as_str().ends_with(".tpl").then(|| "tpl".into())
    }

    fn create_virtual_code(
        &self,
        _id: &ScriptId,
        _language_id: &str,
        _snapshot: &Snapshot,
        _ctx: &CodegenContext<'_>,
    ) -> Option<VirtualCode> {
        Some(
            VirtualCode::new("root", "typescript", Snapshot::from_text("x;")).with_mappings(vec![
                Mapping::new(SourceRange::at(0, 1), SourceRange::at(0, 50)),
            ]),
        )
    }
}

/// Projects a script onto itself: the generated code is the source snapshot.
struct PassThroughPlugin;

impl LanguagePlugin for PassThroughPlugin {
    fn language_id(&self, id: &ScriptId) -> Option<CompactString> {
        id.as_str().ends_with(".ts").then(|| "typescript".into())
    }

    fn create_virtual_code(
        &self,
        _id: &ScriptId,
        _language_id: &str,
        snapshot: &Snapshot,
        _ctx: &CodegenContext<'_>,
    ) -> Option<VirtualCode> {
        let whole = SourceRange::at(0, snapshot.len());
        Some(
            VirtualCode::new("root", "typescript", snapshot.clone())
                .with_mappings(vec![Mapping::new(whole, whole)]),
        )
    }
}

/// Claims every script with an empty language id and never generates.
struct UndecidedPlugin;

impl LanguagePlugin for UndecidedPlugin {
    fn language_id(&self, _id: &ScriptId) -> Option<CompactString> {
        Some(CompactString::default())
    }

    fn create_virtual_code(
        &self,
        _id: &ScriptId,
        _language_id: &str,
        _snapshot: &Snapshot,
        _ctx: &CodegenContext<'_>,
    ) -> Option<VirtualCode> {
        None
    }
}

fn root_of(registry: &ScriptRegistry, id: &ScriptId) -> Arc<VirtualCode> {
    Arc::clone(registry.peek(id).unwrap().generated().unwrap().root())
}

fn single(plugin: InterpolationPlugin) -> (ScriptRegistry, Arc<Calls>) {
    init_tracing();
    let calls = Arc::clone(&plugin.calls);
    let plugins: Vec<Arc<dyn LanguagePlugin>> = vec![Arc::new(plugin)];
    (ScriptRegistry::new(plugins), calls)
}

// =============================================================================
// Registry lifecycle
// =============================================================================

mod registry {
    use super::*;

    #[test]
    fn end_to_end_interpolation() {
        let (mut registry, _) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let id = ScriptId::from("comp.tpl");

        let script = registry.set(&id, Snapshot::from_text("{{x}}"), None).unwrap();
        assert_eq!(script.language_id(), "tplLang");

        let root = root_of(&registry, &id);
        assert_eq!(root.snapshot.text(), "x;");

        let map = registry.maps().get(&root, Some(&id)).unwrap();
        assert_eq!(map.to_source_offset(0), Some(2));
        assert_eq!(map.to_generated_offset(2), Some(0));
    }

    #[test]
    fn same_snapshot_is_a_no_op() {
        let (mut registry, calls) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let id = ScriptId::from("comp.tpl");
        let snapshot = Snapshot::from_text("{{x}}");

        registry.set(&id, snapshot.clone(), Some("tplLang"));
        let root = root_of(&registry, &id);
        let map = registry.maps().get(&root, None).unwrap();
        let stats = registry.cache_stats();

        registry.set(&id, snapshot, Some("tplLang"));

        assert_eq!(calls.create(), 1);
        assert_eq!(calls.update(), 0);
        assert!(Arc::ptr_eq(&root, &root_of(&registry, &id)));
        assert!(Arc::ptr_eq(&map, &registry.maps().get(&root, None).unwrap()));
        assert_eq!(registry.cache_stats(), stats);
    }

    #[test]
    fn unrecognized_language_is_reported_and_ignored() {
        let (mut registry, calls) = single(InterpolationPlugin::new("tplLang", ".tpl"));

        assert!(registry
            .set("notes.txt", Snapshot::from_text("hello"), None)
            .is_none());
        assert!(registry.is_empty());
        assert_eq!(calls.create(), 0);
    }

    #[test]
    fn script_without_generated_code_is_still_registered() {
        let (mut registry, calls) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let id = ScriptId::from("notes.txt");

        let script = registry
            .set(&id, Snapshot::from_text("hello"), Some("plaintext"))
            .unwrap();
        assert!(script.generated().is_none());
        assert_eq!(registry.len(), 1);
        assert_eq!(calls.create(), 0);

        // an update of a plain script only swaps the snapshot
        let next = Snapshot::from_text("hello!");
        registry.set(&id, next.clone(), Some("plaintext"));
        assert_eq!(registry.peek(&id).unwrap().snapshot(), &next);
    }

    #[test]
    fn language_change_recreates_with_new_plugin() {
        init_tracing();
        let a = InterpolationPlugin::new("tplLang", ".tpl");
        let b = InterpolationPlugin::new("other", ".tpl");
        let (a_calls, b_calls) = (Arc::clone(&a.calls), Arc::clone(&b.calls));
        let plugins: Vec<Arc<dyn LanguagePlugin>> = vec![Arc::new(a), Arc::new(b)];
        let mut registry = ScriptRegistry::new(plugins);
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        let old_root = root_of(&registry, &id);
        assert!(registry.maps().get(&old_root, None).is_some());

        let script = registry
            .set(&id, Snapshot::from_text("{{y}}"), Some("other"))
            .unwrap();
        assert_eq!(script.language_id(), "other");
        assert_eq!(script.generated().unwrap().plugin().name(), "other");

        assert_eq!(a_calls.dispose(), 1);
        assert_eq!(a_calls.update(), 0);
        assert_eq!(b_calls.create(), 1);

        // the old tree is gone from every index
        assert!(registry.script_for_code(&old_root).is_none());
        assert!(registry.maps().get(&old_root, None).is_none());
    }

    #[test]
    fn declined_update_falls_back_to_full_recreation() {
        let (mut registry, calls) = single(InterpolationPlugin::new("tplLang", ".tpl").full_only());
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        registry.set(&id, Snapshot::from_text("{{ yy }}"), None);

        assert_eq!(calls.update(), 1);
        assert_eq!(calls.dispose(), 1);
        assert_eq!(calls.create(), 2);
        assert_eq!(root_of(&registry, &id).snapshot.text(), "yy;");
    }

    #[test]
    fn identical_text_in_a_new_snapshot_still_updates() {
        let (mut registry, calls) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        registry.set(&id, Snapshot::from_text("{{x}}"), None);

        assert_eq!(calls.create(), 1);
        assert_eq!(calls.update(), 1);
    }

    #[test]
    fn delete_disposes_generated_code() {
        let (mut registry, calls) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        let root = root_of(&registry, &id);
        registry.delete(&id);

        assert_eq!(calls.dispose(), 1);
        assert!(registry.peek(&id).is_none());
        assert!(registry.script_for_code(&root).is_none());

        // deleting twice is silent
        registry.delete(&id);
        assert_eq!(calls.dispose(), 1);
    }

    #[test]
    fn explicit_plugin_list_decides_creation_only() {
        let (mut registry, default_calls) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let custom = InterpolationPlugin::new("custom", ".tpl");
        let custom_calls = Arc::clone(&custom.calls);
        let listed: Vec<Arc<dyn LanguagePlugin>> =
            vec![Arc::new(UndecidedPlugin), Arc::new(custom)];
        let id = ScriptId::from("comp.tpl");

        let script = registry
            .set_with_plugins(&id, Snapshot::from_text("{{x}}"), None, &listed)
            .unwrap();
        assert_eq!(script.language_id(), "custom");
        assert_eq!(script.generated().unwrap().plugin().name(), "custom");
        assert_eq!(custom_calls.create(), 1);
        assert_eq!(default_calls.create(), 0);

        // updates go to the owning plugin whatever list is passed
        registry.set(&id, Snapshot::from_text("{{ yy }}"), Some("custom"));
        assert_eq!(custom_calls.update(), 1);
        assert_eq!(custom_calls.create(), 1);
        assert_eq!(default_calls.create() + default_calls.update(), 0);
        assert_eq!(root_of(&registry, &id).snapshot.text(), "yy;");
    }

    #[test]
    fn shared_snapshot_keeps_separate_owners() {
        init_tracing();
        let plugins: Vec<Arc<dyn LanguagePlugin>> = vec![Arc::new(PassThroughPlugin)];
        let mut registry = ScriptRegistry::new(plugins);
        let (a, b) = (ScriptId::from("a.ts"), ScriptId::from("b.ts"));
        let snapshot = Snapshot::from_text("export {}");

        registry.set(&a, snapshot.clone(), None);
        let root_a = root_of(&registry, &a);
        let map_a = registry.maps().get(&root_a, None).unwrap();

        registry.set(&b, snapshot, None);
        let root_b = root_of(&registry, &b);
        assert_eq!(registry.script_for_code(&root_a).unwrap().id(), &a);
        assert_eq!(registry.script_for_code(&root_b).unwrap().id(), &b);

        let sources: Vec<String> = registry
            .maps()
            .for_each(&root_a)
            .into_iter()
            .map(|(id, _, _)| id.to_string())
            .collect();
        insta::assert_snapshot!(sources.join(" "), @"a.ts");

        registry.delete(&b);
        assert_eq!(registry.script_for_code(&root_a).unwrap().id(), &a);
        let again = registry.maps().get(&root_a, None).unwrap();
        assert!(Arc::ptr_eq(&map_a, &again));
        assert_eq!(again.to_source_offset(3), Some(3));
    }

    #[test]
    fn accessors_reflect_construction() {
        let (mut registry, _) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let options = LanguageOptions {
            validate_virtual_code: true,
            ..Default::default()
        };
        registry = registry.with_options(options.clone());

        assert_eq!(registry.options(), &options);
        let names: Vec<&str> = registry.plugins().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["tplLang"]);

        registry.set("b.tpl", Snapshot::from_text("{{b}}"), None);
        registry.set("a.tpl", Snapshot::from_text("{{a}}"), None);
        let mut ids: Vec<&str> = registry.ids().map(ScriptId::as_str).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a.tpl", "b.tpl"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn embedded_index_is_pre_order() {
        let (mut registry, _) = single(InterpolationPlugin::new("tplLang", ".tpl").with_embedded());
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        let script = registry.peek(&id).unwrap();
        let generated = script.generated().unwrap();
        let ids: Vec<&str> = generated.embedded_codes().ids().collect();

        insta::assert_snapshot!(ids.join(","), @"root,e1,e2,e3");
        let e3 = generated.embedded_code("e3").unwrap();
        assert!(Arc::ptr_eq(
            e3,
            &generated.root().embedded_codes[1].embedded_codes[0]
        ));
        for code in generated.embedded_codes().iter() {
            assert_eq!(registry.script_for_code(code).unwrap().id(), &id);
        }
    }
}

// =============================================================================
// Synchronization and associations
// =============================================================================

mod sync {
    use super::*;

    #[test]
    fn get_runs_the_sync_hook_first() {
        init_tracing();
        let pending: Arc<Mutex<Option<SyncAction>>> = Arc::new(Mutex::new(None));
        let hook_calls = Arc::new(AtomicUsize::new(0));
        let plugins: Vec<Arc<dyn LanguagePlugin>> =
            vec![Arc::new(InterpolationPlugin::new("tplLang", ".tpl"))];

        let (hook_pending, hook_counter) = (Arc::clone(&pending), Arc::clone(&hook_calls));
        let mut registry = ScriptRegistry::new(plugins).with_sync(move |_id: &ScriptId| {
            hook_counter.fetch_add(1, Ordering::SeqCst);
            hook_pending
                .lock()
                .unwrap()
                .take()
                .unwrap_or(SyncAction::Keep)
        });
        let id = ScriptId::from("comp.tpl");

        assert!(registry.get(&id).is_none());

        *pending.lock().unwrap() = Some(SyncAction::Set {
            snapshot: Snapshot::from_text("{{x}}"),
            language_id: None,
        });
        let script = registry.get(&id).unwrap();
        assert_eq!(script.language_id(), "tplLang");
        assert!(script.generated().is_some());

        // peek does not synchronize
        *pending.lock().unwrap() = Some(SyncAction::Delete);
        assert!(registry.peek(&id).is_some());
        assert_eq!(hook_calls.load(Ordering::SeqCst), 2);

        assert!(registry.get(&id).is_none());
        assert_eq!(hook_calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn associated_change_regenerates_on_next_get() {
        init_tracing();
        let calls = Arc::new(Calls::default());
        let plugins: Vec<Arc<dyn LanguagePlugin>> = vec![Arc::new(IncludePlugin {
            calls: Arc::clone(&calls),
            track: true,
        })];
        let mut registry = ScriptRegistry::new(plugins);
        let (shared, comp) = (ScriptId::from("shared.ts"), ScriptId::from("comp.tpl"));

        registry.set(&shared, Snapshot::from_text("export const x = 1"), Some("ts"));
        registry.set(&comp, Snapshot::from_text("{{x}}"), None);
        assert_eq!(calls.create(), 1);

        let targets: Vec<&ScriptId> = registry.peek(&shared).unwrap().target_ids().collect();
        assert_eq!(targets, vec![&comp]);

        let root = root_of(&registry, &comp);
        let sources: Vec<String> = registry
            .maps()
            .for_each(&root)
            .into_iter()
            .map(|(id, _, map)| format!("{}:{}", id, map.len()))
            .collect();
        insta::assert_snapshot!(sources.join(" "), @"comp.tpl:1 shared.ts:1");

        registry.set(&shared, Snapshot::from_text("export const x = 2"), Some("ts"));
        assert!(registry.peek(&comp).unwrap().is_association_dirty());

        let script = registry.get(&comp).unwrap();
        assert!(!script.is_association_dirty());
        assert_eq!(calls.create(), 2);

        let targets: Vec<&ScriptId> = registry.peek(&shared).unwrap().target_ids().collect();
        assert_eq!(targets, vec![&comp]);
    }

    #[test]
    fn deleting_an_associated_script_dirties_its_targets() {
        let calls = Arc::new(Calls::default());
        let plugins: Vec<Arc<dyn LanguagePlugin>> = vec![Arc::new(IncludePlugin {
            calls: Arc::clone(&calls),
            track: true,
        })];
        let mut registry = ScriptRegistry::new(plugins);
        let (shared, comp) = (ScriptId::from("shared.ts"), ScriptId::from("comp.tpl"));

        registry.set(&shared, Snapshot::from_text("export const x = 1"), Some("ts"));
        registry.set(&comp, Snapshot::from_text("{{x}}"), None);
        registry.delete(&shared);

        assert!(registry.peek(&comp).unwrap().is_association_dirty());

        // registering it again marks the dependent dirty once more
        registry.get(&comp);
        assert!(!registry.peek(&comp).unwrap().is_association_dirty());
        registry.set(&shared, Snapshot::from_text("export const x = 3"), Some("ts"));
        assert!(registry.peek(&comp).unwrap().is_association_dirty());
    }
}

// =============================================================================
// Caches
// =============================================================================

mod caches {
    use super::*;

    #[test]
    fn map_is_reused_until_a_snapshot_changes() {
        let (mut registry, _) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        let root = root_of(&registry, &id);

        let first = registry.maps().get(&root, Some(&id)).unwrap();
        let second = registry.maps().get(&root, Some(&id)).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.cache_stats().source_maps_built, 1);

        registry.set(&id, Snapshot::from_text("{{ yy }}"), None);
        let root = root_of(&registry, &id);
        let third = registry.maps().get(&root, Some(&id)).unwrap();

        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.to_source_offset(0), Some(3));
        assert_eq!(third.to_generated_offset(3), Some(0));
        assert_eq!(first.to_source_offset(0), Some(2));
        assert_eq!(registry.cache_stats().source_maps_built, 2);
    }

    #[test]
    fn code_without_mappings_gets_an_empty_owner_map() {
        let (mut registry, _) = single(InterpolationPlugin::new("tplLang", ".tpl").with_embedded());
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        let e1 = Arc::clone(root_of(&registry, &id).embedded_codes.first().unwrap());

        let maps = registry.maps().for_each(&e1);
        assert_eq!(maps.len(), 1);
        assert_eq!(maps[0].0, id);
        assert!(maps[0].2.is_empty());

        let again = registry.maps().get(&e1, None).unwrap();
        assert!(Arc::ptr_eq(&maps[0].2, &again));
        assert_eq!(registry.cache_stats().source_maps_built, 1);
    }

    #[test]
    fn code_outside_the_registry_has_no_owner() {
        let (registry, _) = single(InterpolationPlugin::new("tplLang", ".tpl"));
        let stray = VirtualCode::new("stray", "ts", Snapshot::from_text("x;"));

        assert!(registry.maps().get(&stray, None).is_none());
        assert!(registry.maps().for_each(&stray).is_empty());
    }

    #[test]
    fn linked_code_absence_is_cached() {
        let (mut registry, _) = single(InterpolationPlugin::new("tplLang", ".tpl").with_embedded());
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        let root = root_of(&registry, &id);

        assert!(registry.linked_code_maps().get(&root).is_none());
        assert!(registry.linked_code_maps().get(&root).is_none());
        assert_eq!(registry.cache_stats().linked_code_maps_built, 0);

        let e2 = Arc::clone(&root.embedded_codes[1]);
        let first = registry.linked_code_maps().get(&e2).unwrap();
        let second = registry.linked_code_maps().get(&e2).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.cache_stats().linked_code_maps_built, 1);
    }

    #[test]
    fn update_keeps_caches_of_reused_codes() {
        let (mut registry, _) = single(InterpolationPlugin::new("tplLang", ".tpl").with_embedded());
        let id = ScriptId::from("comp.tpl");

        registry.set(&id, Snapshot::from_text("{{x}}"), None);
        let old_root = root_of(&registry, &id);
        let e2 = Arc::clone(&old_root.embedded_codes[1]);
        let linked = registry.linked_code_maps().get(&e2).unwrap();

        registry.set(&id, Snapshot::from_text("{{ yy }}"), None);
        let new_root = root_of(&registry, &id);

        assert!(Arc::ptr_eq(&new_root.embedded_codes[1], &e2));
        assert!(registry.script_for_code(&e2).is_some());
        assert!(registry.script_for_code(&old_root).is_none());
        assert!(Arc::ptr_eq(
            &linked,
            &registry.linked_code_maps().get(&e2).unwrap()
        ));
        assert_eq!(registry.cache_stats().linked_code_maps_built, 1);
    }

    #[test]
    fn only_the_changed_source_is_rebuilt() {
        init_tracing();
        let calls = Arc::new(Calls::default());
        let plugins: Vec<Arc<dyn LanguagePlugin>> = vec![Arc::new(IncludePlugin {
            calls: Arc::clone(&calls),
            track: false,
        })];
        let mut registry = ScriptRegistry::new(plugins);
        let (shared, comp) = (ScriptId::from("shared.ts"), ScriptId::from("comp.tpl"));
        registry.set(&shared, Snapshot::from_text("export const x = 1"), Some("ts"));
        registry.set(&comp, Snapshot::from_text("{{x}}"), None);

        let root = root_of(&registry, &comp);
        let owner_map = registry.maps().get(&root, Some(&comp)).unwrap();
        let shared_map = registry.maps().get(&root, Some(&shared)).unwrap();
        assert_eq!(registry.cache_stats().source_maps_built, 2);

        registry.set(&shared, Snapshot::from_text("export const x = 2"), Some("ts"));
        assert!(!registry.peek(&comp).unwrap().is_association_dirty());
        assert!(Arc::ptr_eq(&root, &root_of(&registry, &comp)));

        let next_shared = registry.maps().get(&root, Some(&shared)).unwrap();
        let next_owner = registry.maps().get(&root, Some(&comp)).unwrap();
        assert!(!Arc::ptr_eq(&shared_map, &next_shared));
        assert!(Arc::ptr_eq(&owner_map, &next_owner));
        assert_eq!(registry.cache_stats().source_maps_built, 3);
        assert_eq!(calls.create(), 1);
    }

    #[test]
    fn unreferenced_sources_are_kept_unless_configured() {
        for evict in [false, true] {
            let calls = Arc::new(Calls::default());
            let plugins: Vec<Arc<dyn LanguagePlugin>> =
                vec![Arc::new(IncludePlugin { calls, track: true })];
            let mut registry = ScriptRegistry::new(plugins).with_options(LanguageOptions {
                evict_unreferenced_sources: evict,
                ..Default::default()
            });
            let (shared, comp) = (ScriptId::from("shared.ts"), ScriptId::from("comp.tpl"));
            registry.set(&shared, Snapshot::from_text("export const x = 1"), Some("ts"));
            registry.set(&comp, Snapshot::from_text("{{x}}"), None);

            let root = root_of(&registry, &comp);
            assert_eq!(registry.maps().for_each(&root).len(), 2);
            let built = registry.cache_stats().source_maps_built;

            // same node and generated content, mappings narrowed to the owner
            let mut narrowed = (*root).clone();
            narrowed.mappings.truncate(1);
            assert_eq!(registry.maps().for_each(&narrowed).len(), 1);

            assert_eq!(registry.maps().for_each(&root).len(), 2);
            let rebuilt = registry.cache_stats().source_maps_built - built;
            assert_eq!(rebuilt, if evict { 1 } else { 0 });
        }
    }

    #[test]
    fn invalid_output_is_rejected_when_validating() {
        init_tracing();
        let make = |validate: bool| {
            let plugins: Vec<Arc<dyn LanguagePlugin>> = vec![
                Arc::new(BrokenPlugin),
                Arc::new(InterpolationPlugin::new("tpl", ".tpl")),
            ];
            ScriptRegistry::new(plugins).with_options(LanguageOptions {
                validate_virtual_code: validate,
                ..Default::default()
            })
        };
        let id = ScriptId::from("comp.tpl");

        let mut lenient = make(false);
        let script = lenient.set(&id, Snapshot::from_text("{{x}}"), None).unwrap();
        assert_eq!(script.generated().unwrap().plugin().name(), "broken");

        let mut strict = make(true);
        let script = strict.set(&id, Snapshot::from_text("{{x}}"), None).unwrap();
        assert_eq!(script.generated().unwrap().plugin().name(), "tpl");
    }
}
