//! Linked code: ranges of one generated document that spell the same symbol.
//!
//! Pairs declared by a plugin are merged transitively into equivalence
//! classes, so `a <-> b` and `b <-> c` put `a`, `b` and `c` in one class.
//! Editing any member can then be mirrored onto every other member without
//! touching the source script or regenerating anything.

use vize_carton::{FxHashMap, SmallVec, SourceRange};

use crate::mapping::LinkedCodeMapping;

/// Equivalence classes of linked ranges.
#[derive(Debug, Clone, Default)]
pub struct LinkedCodeMap {
    /// Members of each class, in order of first appearance
    classes: Vec<SmallVec<[SourceRange; 4]>>,
    /// Every member range with its class, sorted by start
    members: Vec<(SourceRange, u32)>,
    /// Largest end among `members[..=i]`
    reach: Vec<u32>,
}

impl LinkedCodeMap {
    /// Build the classes from declared pairs.
    pub fn new(mappings: &[LinkedCodeMapping]) -> Self {
        let mut ids: FxHashMap<SourceRange, usize> = FxHashMap::default();
        let mut ranges: Vec<SourceRange> = Vec::new();
        let mut parent: Vec<usize> = Vec::new();

        let mut intern =
            |range: SourceRange, ranges: &mut Vec<SourceRange>, parent: &mut Vec<usize>| {
                *ids.entry(range).or_insert_with(|| {
                    ranges.push(range);
                    parent.push(parent.len());
                    ranges.len() - 1
                })
            };

        for mapping in mappings {
            let a = intern(mapping.first, &mut ranges, &mut parent);
            let b = intern(mapping.second, &mut ranges, &mut parent);
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            if ra != rb {
                // the earlier-seen root stays the representative
                let (keep, merge) = if ra < rb { (ra, rb) } else { (rb, ra) };
                parent[merge] = keep;
            }
        }

        let mut class_of_root: FxHashMap<usize, u32> = FxHashMap::default();
        let mut classes: Vec<SmallVec<[SourceRange; 4]>> = Vec::new();
        let mut members = Vec::with_capacity(ranges.len());
        for (i, &range) in ranges.iter().enumerate() {
            let root = find(&mut parent, i);
            let class = *class_of_root.entry(root).or_insert_with(|| {
                classes.push(SmallVec::new());
                (classes.len() - 1) as u32
            });
            classes[class as usize].push(range);
            members.push((range, class));
        }
        members.sort_by_key(|(range, _)| (range.start, range.end));
        let mut max_end = 0;
        let reach = members
            .iter()
            .map(|(range, _)| {
                max_end = max_end.max(range.end);
                max_end
            })
            .collect();

        Self {
            classes,
            members,
            reach,
        }
    }

    /// All equivalence classes.
    pub fn classes(&self) -> impl Iterator<Item = &[SourceRange]> {
        self.classes.iter().map(|c| c.as_slice())
    }

    /// Check if no range is linked.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Member ranges touching `offset`, with their class.
    fn members_at(&self, offset: u32) -> impl Iterator<Item = &(SourceRange, u32)> {
        let upper = self.members.partition_point(|(r, _)| r.start <= offset);
        let lower = self.reach.partition_point(|&end| end < offset).min(upper);
        self.members[lower..upper]
            .iter()
            .filter(move |(r, _)| r.touches(offset))
    }

    /// Every other range linked to `range`.
    ///
    /// `range` must be a declared member or lie inside one.
    pub fn linked_ranges(&self, range: SourceRange) -> Vec<SourceRange> {
        let mut out = Vec::new();
        for &(member, class) in self.members_at(range.start) {
            if !member.covers(range) {
                continue;
            }
            for &other in &self.classes[class as usize] {
                if other != member && !out.contains(&other) {
                    out.push(other);
                }
            }
        }
        out
    }

    /// Offsets at the same relative position in every range linked to the
    /// one containing `offset`.
    pub fn linked_offsets(&self, offset: u32) -> Vec<u32> {
        let mut out = Vec::new();
        for &(member, class) in self.members_at(offset) {
            let relative = offset - member.start;
            for &other in &self.classes[class as usize] {
                if other == member {
                    continue;
                }
                let mapped = other.start + relative.min(other.len());
                if !out.contains(&mapped) {
                    out.push(mapped);
                }
            }
        }
        out
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}
