//! Lazily built, identity-keyed caches over virtual codes.
//!
//! Both caches are keyed by the stamp of a virtual code's generated snapshot:
//! new generated content means every generated coordinate moved, so the whole
//! row goes at once. The registry evicts a row once no indexed node projects
//! its snapshot anymore.

mod linked;
mod maps;

pub use linked::LinkedCodeMaps;
pub use maps::SourceMaps;

pub(crate) use linked::LinkedCodeCache;
pub(crate) use maps::MappingCache;

/// Counters of cache rebuilds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Source maps built since the registry was created
    pub source_maps_built: u64,
    /// Linked code maps built since the registry was created
    pub linked_code_maps_built: u64,
}
