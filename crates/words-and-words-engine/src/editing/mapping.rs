//! Position mapping across document mutations.
//!
//! Every command records which range of the old document it replaced and
//! how large the replacement is. Positions captured before the edit are
//! carried to the new document through these records.

use std::ops::Range;

/// Which side of an insertion a mapped position sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

/// A single replaced range: `old_size` positions starting at `start` were
/// replaced with `new_size` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub start: usize,
    pub old_size: usize,
    pub new_size: usize,
}

/// Mapped position plus whether the original position was inside a
/// deleted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    pub deleted: bool,
}

impl StepMap {
    pub fn new(start: usize, old_size: usize, new_size: usize) -> Self {
        Self {
            start,
            old_size,
            new_size,
        }
    }

    pub fn insertion(at: usize, size: usize) -> Self {
        Self::new(at, 0, size)
    }

    pub fn deletion(range: Range<usize>) -> Self {
        Self::new(range.start, range.len(), 0)
    }

    /// A step that leaves every position where it was (mark changes).
    pub fn identity() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn is_identity(&self) -> bool {
        self.old_size == 0 && self.new_size == 0
    }

    pub fn old_end(&self) -> usize {
        self.start + self.old_size
    }

    pub fn new_end(&self) -> usize {
        self.start + self.new_size
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        if self.is_identity() || pos < self.start {
            return MapResult {
                pos,
                deleted: false,
            };
        }
        let end = self.old_end();
        if pos > end || (pos == end && self.old_size > 0) {
            return MapResult {
                pos: pos - self.old_size + self.new_size,
                deleted: false,
            };
        }
        // pos is at the start of the step or strictly inside the replaced range
        let deleted = pos > self.start;
        let pos = match assoc {
            Assoc::Before => self.start,
            Assoc::After if self.old_size > 0 && pos == self.start => self.start,
            Assoc::After => self.new_end(),
        };
        MapResult { pos, deleted }
    }
}

/// An ordered list of step maps, as produced by one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        if !map.is_identity() {
            self.maps.push(map);
        }
    }

    pub fn append(&mut self, other: Mapping) {
        self.maps.extend(other.maps);
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    /// True when no position moves under this mapping.
    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn map_result(&self, pos: usize, assoc: Assoc) -> MapResult {
        self.maps.iter().fold(
            MapResult {
                pos,
                deleted: false,
            },
            |acc, map| {
                let next = map.map_result(acc.pos, assoc);
                MapResult {
                    pos: next.pos,
                    deleted: acc.deleted || next.deleted,
                }
            },
        )
    }

    /// Map a range so that it does not grow over text inserted at its edges.
    /// Returns `None` when the range collapses.
    pub fn map_range(&self, range: &Range<usize>) -> Option<Range<usize>> {
        let from = self.map(range.start, Assoc::After);
        let to = self.map(range.end, Assoc::Before);
        (from < to).then_some(from..to)
    }
}

impl From<StepMap> for Mapping {
    fn from(map: StepMap) -> Self {
        let mut mapping = Mapping::new();
        mapping.push(map);
        mapping
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::before_step(3, Assoc::After, 3)]
    #[case::at_insertion_before(5, Assoc::Before, 5)]
    #[case::at_insertion_after(5, Assoc::After, 8)]
    #[case::after_step(9, Assoc::Before, 12)]
    fn test_insertion_mapping(#[case] pos: usize, #[case] assoc: Assoc, #[case] expected: usize) {
        let map = StepMap::insertion(5, 3);
        assert_eq!(map.map(pos, assoc), expected);
    }

    #[test]
    fn test_deletion_reports_swallowed_positions() {
        let map = StepMap::deletion(4..8);
        assert_eq!(
            map.map_result(6, Assoc::After),
            MapResult {
                pos: 4,
                deleted: true
            }
        );
        assert_eq!(
            map.map_result(4, Assoc::After),
            MapResult {
                pos: 4,
                deleted: false
            }
        );
        assert_eq!(map.map(8, Assoc::Before), 4);
        assert_eq!(map.map(10, Assoc::Before), 6);
    }

    #[test]
    fn test_replacement_inside_maps_to_edges() {
        let map = StepMap::new(2, 4, 1);
        assert_eq!(map.map(3, Assoc::Before), 2);
        assert_eq!(map.map(3, Assoc::After), 3);
        assert_eq!(map.map(7, Assoc::After), 4);
    }

    #[test]
    fn test_mapping_composes_in_order() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::insertion(0, 2));
        mapping.push(StepMap::deletion(10..12));
        assert_eq!(mapping.map(5, Assoc::After), 7);
        assert_eq!(mapping.map(11, Assoc::After), 11);
        assert!(mapping.map_result(9, Assoc::After).deleted);
    }

    #[test]
    fn test_identity_steps_are_dropped() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::identity());
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_map_range_collapses() {
        let mapping = Mapping::from(StepMap::deletion(2..6));
        assert_eq!(mapping.map_range(&(3..5)), None);
        assert_eq!(mapping.map_range(&(1..8)), Some(1..4));
    }
}
