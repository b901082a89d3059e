//! Linked code maps of a virtual code.

use std::sync::Arc;

use vize_carton::{FxHashMap, Stamp};

use crate::linked_code::LinkedCodeMap;
use crate::registry::ScriptRegistry;
use crate::virtual_code::VirtualCode;

/// Linked code maps keyed by generated snapshot; `None` records a code
/// without linked code mappings.
#[derive(Debug, Default)]
pub(crate) struct LinkedCodeCache {
    entries: FxHashMap<Stamp, Option<Arc<LinkedCodeMap>>>,
    built: u64,
}

impl LinkedCodeCache {
    pub(crate) fn evict(&mut self, code: Stamp) {
        self.entries.remove(&code);
    }

    pub(crate) fn built(&self) -> u64 {
        self.built
    }
}

/// Linked code maps of virtual codes.
pub struct LinkedCodeMaps<'a> {
    registry: &'a ScriptRegistry,
}

impl<'a> LinkedCodeMaps<'a> {
    pub(crate) fn new(registry: &'a ScriptRegistry) -> Self {
        Self { registry }
    }

    /// Linked code map of `code`, or `None` if it declares no linked code.
    pub fn get(&self, code: &VirtualCode) -> Option<Arc<LinkedCodeMap>> {
        let stamp = code.snapshot.stamp();
        let mut cache = self.registry.linked_code_cache.borrow_mut();
        if let Some(entry) = cache.entries.get(&stamp) {
            return entry.clone();
        }

        let map = code.linked_code_mappings.as_deref().map(|mappings| {
            tracing::trace!("building linked code map of {}", code.id);
            Arc::new(LinkedCodeMap::new(mappings))
        });
        if map.is_some() {
            cache.built += 1;
        }
        if self.registry.owner_of(code).is_some() {
            cache.entries.insert(stamp, map.clone());
        }
        map
    }
}
