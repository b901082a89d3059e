//! Synchronization hook run before every registry read.

use vize_carton::CompactString;

use super::ScriptId;
use crate::snapshot::Snapshot;

/// What the host wants done with a script before it is read.
#[derive(Debug, Clone)]
pub enum SyncAction {
    /// The registry is up to date.
    Keep,
    /// Register or update the script.
    Set {
        snapshot: Snapshot,
        language_id: Option<CompactString>,
    },
    /// The script no longer exists.
    Delete,
}

/// Brings the registry's view of a script in line with the host
/// (open editors, the file system, ...).
pub trait ScriptSync {
    fn sync(&self, id: &ScriptId) -> SyncAction;
}

impl<F> ScriptSync for F
where
    F: Fn(&ScriptId) -> SyncAction,
{
    fn sync(&self, id: &ScriptId) -> SyncAction {
        self(id)
    }
}
