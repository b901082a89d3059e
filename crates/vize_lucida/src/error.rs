//! Error types.

use vize_carton::{CompactString, SourceRange};

/// Plugin output that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VirtualCodeError {
    /// A mapping's generated range exceeds the generated content.
    #[error("virtual code `{code}`: generated range {range} exceeds length {len}")]
    GeneratedRangeOutOfBounds {
        code: CompactString,
        range: SourceRange,
        len: u32,
    },

    /// A mapping's source range exceeds its source script.
    #[error("virtual code `{code}`: source range {range} in `{source_id}` exceeds length {len}")]
    SourceRangeOutOfBounds {
        code: CompactString,
        source_id: CompactString,
        range: SourceRange,
        len: u32,
    },

    /// A linked code range exceeds the generated content.
    #[error("virtual code `{code}`: linked range {range} exceeds length {len}")]
    LinkedRangeOutOfBounds {
        code: CompactString,
        range: SourceRange,
        len: u32,
    },

    /// Two children of one node share an id.
    #[error("virtual code `{parent}` embeds `{id}` more than once")]
    DuplicateEmbeddedId {
        parent: CompactString,
        id: CompactString,
    },
}

/// Error loading [`LanguageOptions`](crate::LanguageOptions).
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// JSON parse error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// Result type for lucida operations.
pub type LucidaResult<T, E = VirtualCodeError> = Result<T, E>;
