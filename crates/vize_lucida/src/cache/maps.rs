//! Per-source position maps of a virtual code.

use std::sync::Arc;

use vize_carton::{FxHashMap, SmallVec, Stamp};

use crate::registry::{ScriptId, ScriptRegistry};
use crate::snapshot::Snapshot;
use crate::source_map::SourceMap;
use crate::virtual_code::VirtualCode;

type MapRow = FxHashMap<ScriptId, (Snapshot, Arc<SourceMap>)>;

/// Maps built per virtual code, keyed by its generated snapshot.
#[derive(Debug, Default)]
pub(crate) struct MappingCache {
    rows: FxHashMap<Stamp, MapRow>,
    built: u64,
}

impl MappingCache {
    pub(crate) fn evict(&mut self, code: Stamp) {
        self.rows.remove(&code);
    }

    pub(crate) fn built(&self) -> u64 {
        self.built
    }
}

/// Position maps between virtual codes and the scripts they map to.
pub struct SourceMaps<'a> {
    registry: &'a ScriptRegistry,
}

impl<'a> SourceMaps<'a> {
    pub(crate) fn new(registry: &'a ScriptRegistry) -> Self {
        Self { registry }
    }

    /// Map of `code` against `source`, or against its owning script when
    /// `source` is `None`.
    ///
    /// Returns the same `Arc` for as long as neither the generated content
    /// nor the source snapshot changes.
    pub fn get(&self, code: &VirtualCode, source: Option<&ScriptId>) -> Option<Arc<SourceMap>> {
        let source = match source {
            Some(source) => source,
            None => self.registry.owner_of(code)?,
        };
        self.for_each(code)
            .into_iter()
            .find(|(id, _, _)| id == source)
            .map(|(_, _, map)| map)
    }

    /// Every map of `code`, one per source script it maps to, sorted by
    /// script id.
    ///
    /// A code without any mapping still yields one empty map for its owning
    /// script. Within a row only the maps whose source snapshot changed are
    /// rebuilt.
    pub fn for_each(&self, code: &VirtualCode) -> Vec<(ScriptId, Snapshot, Arc<SourceMap>)> {
        let owner = self.registry.owner_of(code);

        let mut sources: SmallVec<[&ScriptId; 2]> = SmallVec::new();
        if code.mappings.is_empty() {
            sources.extend(owner);
        }
        for mapping in &code.mappings {
            if let Some(source) = mapping.source.as_ref().or(owner) {
                if !sources.contains(&source) {
                    sources.push(source);
                }
            }
        }

        let mut cache = self.registry.map_cache.borrow_mut();
        let cache = &mut *cache;
        // codes outside the registry are mapped without being cached
        let mut scratch = MapRow::default();
        let row = match owner {
            Some(_) => cache.rows.entry(code.snapshot.stamp()).or_default(),
            None => &mut scratch,
        };

        let mut maps = Vec::with_capacity(sources.len());
        for &source in &sources {
            let Some(snapshot) = self.registry.peek(source).map(|s| s.snapshot().clone()) else {
                tracing::trace!("{} maps to unregistered script {}", code.id, source);
                continue;
            };
            let cached = row
                .get(source)
                .filter(|(cached, _)| *cached == snapshot)
                .map(|(_, map)| Arc::clone(map));
            let map = match cached {
                Some(map) => map,
                None => {
                    let segments = code
                        .mappings
                        .iter()
                        .filter(|m| m.source.as_ref().or(owner) == Some(source))
                        .cloned()
                        .collect();
                    tracing::trace!("building map of {} against {}", code.id, source);
                    let map = Arc::new(SourceMap::from_mappings(segments));
                    row.insert(source.clone(), (snapshot.clone(), Arc::clone(&map)));
                    cache.built += 1;
                    map
                }
            };
            maps.push((source.clone(), snapshot, map));
        }

        if self.registry.options().evict_unreferenced_sources {
            row.retain(|id, _| sources.contains(&id));
        }

        maps.sort_by(|a, b| a.0.cmp(&b.0));
        maps
    }
}
