//! Registry options.

use serde::{Deserialize, Serialize};

use crate::error::OptionsError;

/// Options controlling how strictly the registry treats plugin output and
/// how eagerly it drops cached maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageOptions {
    /// Check plugin trees for out-of-bounds ranges and duplicate sibling ids,
    /// rejecting invalid trees instead of storing them
    #[serde(default)]
    pub validate_virtual_code: bool,

    /// Drop cached maps for sources a virtual code no longer maps to
    #[serde(default)]
    pub evict_unreferenced_sources: bool,
}

impl LanguageOptions {
    /// Parse options from JSON, e.g. a `lucida` section of an editor config.
    pub fn from_json(json: &str) -> Result<Self, OptionsError> {
        Ok(serde_json::from_str(json)?)
    }
}
