//! Mapping segments between a source script and a virtual code.

use vize_carton::{bitflags, SourceRange};

use crate::registry::ScriptId;

bitflags! {
    /// Language features a mapping takes part in.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CodeFeatures: u16 {
        /// Hover information
        const HOVER = 1 << 0;
        /// Completion
        const COMPLETION = 1 << 1;
        /// Go-to-definition
        const DEFINITION = 1 << 2;
        /// Find references
        const REFERENCES = 1 << 3;
        /// Rename
        const RENAME = 1 << 4;
        /// Diagnostics
        const DIAGNOSTICS = 1 << 5;
        /// Semantic tokens
        const SEMANTIC_TOKENS = 1 << 6;
        /// Formatting
        const FORMAT = 1 << 7;
        /// Linked editing
        const LINKED_EDITING = 1 << 8;
    }
}

impl CodeFeatures {
    /// Only hover and diagnostics.
    pub fn basic() -> Self {
        Self::HOVER | Self::DIAGNOSTICS
    }

    /// Completion and navigation.
    pub fn navigation() -> Self {
        Self::COMPLETION | Self::DEFINITION | Self::REFERENCES
    }
}

impl Default for CodeFeatures {
    fn default() -> Self {
        Self::all()
    }
}

bitflags! {
    /// Which way a mapping may be followed.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MappingDirection: u8 {
        /// Generated positions may be translated back to the source.
        const TO_SOURCE = 1 << 0;
        /// Source positions may be translated into the generated code.
        const FROM_SOURCE = 1 << 1;
    }
}

impl Default for MappingDirection {
    fn default() -> Self {
        Self::all()
    }
}

/// A single mapping segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapping {
    /// Script the source range refers to; `None` is the owning script
    pub source: Option<ScriptId>,
    /// Range in the source script
    pub source_range: SourceRange,
    /// Range in the generated code
    pub generated_range: SourceRange,
    /// Directions this segment may be followed in
    pub direction: MappingDirection,
    /// Features enabled for this mapping
    pub features: CodeFeatures,
    /// Optional data associated with this mapping
    pub data: Option<serde_json::Value>,
}

impl Mapping {
    /// Create a bidirectional mapping against the owning script with all features enabled.
    pub fn new(source_range: SourceRange, generated_range: SourceRange) -> Self {
        Self {
            source: None,
            source_range,
            generated_range,
            direction: MappingDirection::default(),
            features: CodeFeatures::default(),
            data: None,
        }
    }

    /// Point the source range at another script.
    pub fn in_source(mut self, source: impl Into<ScriptId>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Restrict the directions this segment may be followed in.
    pub fn with_direction(mut self, direction: MappingDirection) -> Self {
        self.direction = direction;
        self
    }

    /// Create with specific features.
    pub fn with_features(mut self, features: CodeFeatures) -> Self {
        self.features = features;
        self
    }

    /// Attach data.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Map a source offset to a generated offset.
    ///
    /// Both edges of the source range are accepted. When the two ranges have
    /// different lengths the result is clamped to the end of the generated range.
    pub fn source_to_generated(&self, source_offset: u32) -> Option<u32> {
        translate(source_offset, self.source_range, self.generated_range)
    }

    /// Map a generated offset to a source offset.
    pub fn generated_to_source(&self, gen_offset: u32) -> Option<u32> {
        translate(gen_offset, self.generated_range, self.source_range)
    }
}

pub(crate) fn translate(offset: u32, from: SourceRange, to: SourceRange) -> Option<u32> {
    if !from.touches(offset) {
        return None;
    }
    let relative = (offset - from.start).min(to.len());
    Some(to.start + relative)
}

/// Two ranges of the same generated code that spell the same symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkedCodeMapping {
    pub first: SourceRange,
    pub second: SourceRange,
}

impl LinkedCodeMapping {
    pub fn new(first: SourceRange, second: SourceRange) -> Self {
        Self { first, second }
    }
}
