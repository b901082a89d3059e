//! Source map implementation for bidirectional position mapping.
//!
//! A [`SourceMap`] consolidates the mapping segments a virtual code holds
//! against one source script. Each side keeps the segments sorted by start
//! together with a running maximum of their ends; a lookup binary searches
//! both to narrow the candidates, then reports matches in declaration order,
//! so when segments overlap the one declared first wins.

use vize_carton::SourceRange;

use crate::mapping::{CodeFeatures, Mapping, MappingDirection};

/// Bidirectional source map over segments of a single source.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    /// Mappings in declaration order
    mappings: Vec<Mapping>,
    by_source: SortedIndex,
    by_generated: SortedIndex,
}

#[derive(Clone, Copy)]
enum Side {
    Source,
    Generated,
}

impl Side {
    fn range(self, mapping: &Mapping) -> SourceRange {
        match self {
            Side::Source => mapping.source_range,
            Side::Generated => mapping.generated_range,
        }
    }
}

/// Mapping indices sorted by the start of one side.
#[derive(Debug, Clone, Default)]
struct SortedIndex {
    order: Vec<u32>,
    /// Largest end among `order[..=i]`
    reach: Vec<u32>,
}

impl SortedIndex {
    fn new(mappings: &[Mapping], side: Side) -> Self {
        let mut order: Vec<u32> = (0..mappings.len() as u32).collect();
        // stable sort keeps declaration order among equal starts
        order.sort_by_key(|&i| side.range(&mappings[i as usize]).start);
        let mut max_end = 0;
        let reach = order
            .iter()
            .map(|&i| {
                max_end = max_end.max(side.range(&mappings[i as usize]).end);
                max_end
            })
            .collect();
        Self { order, reach }
    }

    /// Indices of segments that may touch `offset`.
    fn candidates(&self, mappings: &[Mapping], side: Side, offset: u32) -> &[u32] {
        let upper = self
            .order
            .partition_point(|&i| side.range(&mappings[i as usize]).start <= offset);
        let lower = self.reach.partition_point(|&end| end < offset).min(upper);
        &self.order[lower..upper]
    }
}

impl SourceMap {
    /// Create an empty source map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create from a list of mappings.
    pub fn from_mappings(mappings: Vec<Mapping>) -> Self {
        let by_source = SortedIndex::new(&mappings, Side::Source);
        let by_generated = SortedIndex::new(&mappings, Side::Generated);
        Self {
            mappings,
            by_source,
            by_generated,
        }
    }

    /// Get all mappings in declaration order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Check if the map is empty.
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Get the number of mappings.
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// Indices of mappings whose `side` range touches `offset`, in declaration order.
    fn matching(&self, side: Side, offset: u32, direction: MappingDirection) -> Vec<usize> {
        let index = match side {
            Side::Source => &self.by_source,
            Side::Generated => &self.by_generated,
        };

        let mut hits: Vec<usize> = index
            .candidates(&self.mappings, side, offset)
            .iter()
            .map(|&i| i as usize)
            .filter(|&i| {
                let mapping = &self.mappings[i];
                mapping.direction.contains(direction) && side.range(mapping).touches(offset)
            })
            .collect();
        hits.sort_unstable();
        hits
    }

    /// Map a generated offset to every source offset it corresponds to.
    pub fn to_source_offsets(&self, gen_offset: u32) -> Vec<(u32, &Mapping)> {
        self.matching(Side::Generated, gen_offset, MappingDirection::TO_SOURCE)
            .into_iter()
            .filter_map(|i| {
                let mapping = &self.mappings[i];
                mapping.generated_to_source(gen_offset).map(|o| (o, mapping))
            })
            .collect()
    }

    /// Map a source offset to every generated offset it corresponds to.
    pub fn to_generated_offsets(&self, source_offset: u32) -> Vec<(u32, &Mapping)> {
        self.matching(Side::Source, source_offset, MappingDirection::FROM_SOURCE)
            .into_iter()
            .filter_map(|i| {
                let mapping = &self.mappings[i];
                mapping.source_to_generated(source_offset).map(|o| (o, mapping))
            })
            .collect()
    }

    /// Map generated offset to source offset.
    /// Returns the earliest-declared matching mapping's result.
    pub fn to_source_offset(&self, gen_offset: u32) -> Option<u32> {
        self.to_source_offsets(gen_offset).first().map(|(o, _)| *o)
    }

    /// Map source offset to generated offset.
    pub fn to_generated_offset(&self, source_offset: u32) -> Option<u32> {
        self.to_generated_offsets(source_offset)
            .first()
            .map(|(o, _)| *o)
    }

    /// Map generated offset to source offset with feature check.
    pub fn to_source_offset_for(
        &self,
        gen_offset: u32,
        check: impl Fn(CodeFeatures) -> bool,
    ) -> Option<u32> {
        self.to_source_offsets(gen_offset)
            .into_iter()
            .find(|(_, m)| check(m.features))
            .map(|(o, _)| o)
    }

    /// Map source offset to generated offset with feature check.
    pub fn to_generated_offset_for(
        &self,
        source_offset: u32,
        check: impl Fn(CodeFeatures) -> bool,
    ) -> Option<u32> {
        self.to_generated_offsets(source_offset)
            .into_iter()
            .find(|(_, m)| check(m.features))
            .map(|(o, _)| o)
    }

    /// Map a generated range to a source range.
    ///
    /// A segment covering both ends is preferred. With `fallback`, the two
    /// ends may be mapped through different segments as long as the result
    /// is not inverted.
    pub fn to_source_range(&self, generated: SourceRange, fallback: bool) -> Option<SourceRange> {
        self.map_range(generated, fallback, Side::Generated)
    }

    /// Map a source range to a generated range.
    pub fn to_generated_range(&self, source: SourceRange, fallback: bool) -> Option<SourceRange> {
        self.map_range(source, fallback, Side::Source)
    }

    fn map_range(&self, range: SourceRange, fallback: bool, from: Side) -> Option<SourceRange> {
        let direction = match from {
            Side::Source => MappingDirection::FROM_SOURCE,
            Side::Generated => MappingDirection::TO_SOURCE,
        };
        let translate = |m: &Mapping, offset: u32| match from {
            Side::Source => m.source_to_generated(offset),
            Side::Generated => m.generated_to_source(offset),
        };

        let starts = self.matching(from, range.start, direction);
        for &i in &starts {
            let mapping = &self.mappings[i];
            if let (Some(start), Some(end)) =
                (translate(mapping, range.start), translate(mapping, range.end))
            {
                return Some(SourceRange::new(start, end));
            }
        }

        if !fallback {
            return None;
        }
        let start = starts
            .first()
            .and_then(|&i| translate(&self.mappings[i], range.start))?;
        let end = self
            .matching(from, range.end, direction)
            .into_iter()
            .find_map(|i| translate(&self.mappings[i], range.end))?;
        (start <= end).then(|| SourceRange::new(start, end))
    }
}
