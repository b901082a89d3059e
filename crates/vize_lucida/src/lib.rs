//! # vize_lucida
//!
//! Lucida - Virtual code projection and position mapping for Vize.
//!
//! ## Name Origin
//!
//! A **camera lucida** is an optical aid that lets an artist see the subject
//! and the drawing surface at once, projecting one onto the other so every
//! point of the sketch lines up with a point of the scene. `vize_lucida`
//! projects source documents (Vue SFCs, templates) onto virtual documents a
//! language service can understand, and keeps every position of one lined up
//! with the other.
//!
//! ## Architecture
//!
//! ```text
//! +------------------------------------------------------------------+
//! |                          vize_lucida                              |
//! +------------------------------------------------------------------+
//! |                                                                    |
//! |  +--------------------+     +-------------------+                  |
//! |  |  ScriptRegistry    |---->|  LanguagePlugin   |                  |
//! |  |  get / set / delete|<----|  create / update  |                  |
//! |  +--------------------+     +-------------------+                  |
//! |            |                                                       |
//! |            v                                                       |
//! |  +-----------------------------------------------------------+    |
//! |  |                 VirtualCode trees                          |    |
//! |  |  root + embedded codes, mappings, linked code mappings     |    |
//! |  +-----------------------------------------------------------+    |
//! |            |                                                       |
//! |            v                                                       |
//! |  +----------------------------+  +---------------------------+    |
//! |  | SourceMaps (per source)    |  | LinkedCodeMaps            |    |
//! |  | keyed by generated stamp   |  | keyed by generated stamp  |    |
//! |  +----------------------------+  +---------------------------+    |
//! +------------------------------------------------------------------+
//! ```
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use vize_carton::{CompactString, SourceRange};
//! use vize_lucida::{
//!     CodegenContext, LanguagePlugin, Mapping, ScriptId, ScriptRegistry, Snapshot, VirtualCode,
//! };
//!
//! struct Interpolation;
//!
//! impl LanguagePlugin for Interpolation {
//!     fn language_id(&self, id: &ScriptId) -> Option<CompactString> {
//!         id.as_str().ends_with(".tpl").then(|| "tpl".into())
//!     }
//!
//!     fn create_virtual_code(
//!         &self,
//!         _id: &ScriptId,
//!         _language_id: &str,
//!         _snapshot: &Snapshot,
//!         _ctx: &CodegenContext<'_>,
//!     ) -> Option<VirtualCode> {
//!         Some(
//!             VirtualCode::new("root", "typescript", Snapshot::from_text("x;")).with_mappings(
//!                 vec![Mapping::new(SourceRange::at(2, 1), SourceRange::at(0, 1))],
//!             ),
//!         )
//!     }
//! }
//!
//! let plugins: Vec<Arc<dyn LanguagePlugin>> = vec![Arc::new(Interpolation)];
//! let mut registry = ScriptRegistry::new(plugins);
//! let id = ScriptId::from("comp.tpl");
//! registry.set(&id, Snapshot::from_text("{{x}}"), None);
//!
//! let root = Arc::clone(registry.peek(&id).unwrap().generated().unwrap().root());
//! let map = registry.maps().get(&root, Some(&id)).unwrap();
//! assert_eq!(map.to_source_offset(0), Some(2));
//! assert_eq!(map.to_generated_offset(2), Some(0));
//! ```

mod cache;
mod error;
mod linked_code;
mod mapping;
mod options;
mod plugin;
mod registry;
mod snapshot;
mod source_map;
mod validate;
mod virtual_code;

pub use cache::{CacheStats, LinkedCodeMaps, SourceMaps};
pub use error::{LucidaResult, OptionsError, VirtualCodeError};
pub use linked_code::LinkedCodeMap;
pub use mapping::{CodeFeatures, LinkedCodeMapping, Mapping, MappingDirection};
pub use options::LanguageOptions;
pub use plugin::{CodegenContext, LanguagePlugin};
pub use registry::{GeneratedCode, ScriptId, ScriptRegistry, ScriptSync, SourceScript, SyncAction};
pub use snapshot::{ScriptSnapshot, Snapshot};
pub use source_map::SourceMap;
pub use virtual_code::{EmbeddedCodes, EmbeddedIndex, VirtualCode};
