//! Optional checks on plugin output.

use std::sync::Arc;

use vize_carton::{FxHashMap, FxHashSet};

use crate::error::{LucidaResult, VirtualCodeError};
use crate::registry::{ScriptId, SourceScript};
use crate::snapshot::Snapshot;
use crate::virtual_code::VirtualCode;

/// Check every node of a freshly generated tree.
///
/// Source ranges are checked against `owner` for segments without an
/// explicit source, and against the registered snapshot otherwise. Segments
/// pointing at unregistered scripts are not checked.
pub(crate) fn validate_tree(
    root: &Arc<VirtualCode>,
    owner: &ScriptId,
    owner_snapshot: &Snapshot,
    scripts: &FxHashMap<ScriptId, SourceScript>,
) -> LucidaResult<()> {
    for code in VirtualCode::walk(root) {
        let len = code.snapshot.len();

        for mapping in &code.mappings {
            if mapping.generated_range.end > len {
                return Err(VirtualCodeError::GeneratedRangeOutOfBounds {
                    code: code.id.clone(),
                    range: mapping.generated_range,
                    len,
                });
            }

            let source_id = mapping.source.as_ref().unwrap_or(owner);
            let source_len = if source_id == owner {
                Some(owner_snapshot.len())
            } else {
                scripts.get(source_id).map(|s| s.snapshot.len())
            };
            if let Some(source_len) = source_len {
                if mapping.source_range.end > source_len {
                    return Err(VirtualCodeError::SourceRangeOutOfBounds {
                        code: code.id.clone(),
                        source_id: source_id.as_str().into(),
                        range: mapping.source_range,
                        len: source_len,
                    });
                }
            }
        }

        for linked in code.linked_code_mappings.iter().flatten() {
            for range in [linked.first, linked.second] {
                if range.end > len {
                    return Err(VirtualCodeError::LinkedRangeOutOfBounds {
                        code: code.id.clone(),
                        range,
                        len,
                    });
                }
            }
        }

        let mut seen = FxHashSet::default();
        for child in &code.embedded_codes {
            if !seen.insert(child.id.as_str()) {
                return Err(VirtualCodeError::DuplicateEmbeddedId {
                    parent: code.id.clone(),
                    id: child.id.clone(),
                });
            }
        }
    }
    Ok(())
}
