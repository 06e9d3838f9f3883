use std::ops::Range;

use crate::editing::{Assoc, Mapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationKind {
    /// Styles the inline content between `from` and `to`
    Inline,
    /// Styles a whole node; `from..to` is the node's full extent
    Node,
    /// Zero-width marker at `from`
    Widget,
}

/// Presentation-only styling over a document range. Never part of the
/// persisted content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub from: usize,
    pub to: usize,
    pub class: String,
    pub kind: DecorationKind,
}

impl Decoration {
    pub fn inline(range: Range<usize>, class: impl Into<String>) -> Self {
        Self {
            from: range.start,
            to: range.end,
            class: class.into(),
            kind: DecorationKind::Inline,
        }
    }

    pub fn node(range: Range<usize>, class: impl Into<String>) -> Self {
        Self {
            from: range.start,
            to: range.end,
            class: class.into(),
            kind: DecorationKind::Node,
        }
    }

    pub fn widget(at: usize, class: impl Into<String>) -> Self {
        Self {
            from: at,
            to: at,
            class: class.into(),
            kind: DecorationKind::Widget,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.from..self.to
    }

    /// Carry the decoration through a mapping. Inline decorations do not grow
    /// over text inserted at their edges and vanish once empty; node and
    /// widget decorations vanish when their anchor was deleted.
    pub fn map(&self, mapping: &Mapping) -> Option<Decoration> {
        match self.kind {
            DecorationKind::Inline => {
                let range = mapping.map_range(&self.range())?;
                Some(Decoration {
                    from: range.start,
                    to: range.end,
                    ..self.clone()
                })
            }
            DecorationKind::Node => {
                let from = mapping.map_result(self.from, Assoc::After);
                let to = mapping.map_result(self.to, Assoc::Before);
                if from.deleted || to.deleted || from.pos >= to.pos {
                    return None;
                }
                Some(Decoration {
                    from: from.pos,
                    to: to.pos,
                    ..self.clone()
                })
            }
            DecorationKind::Widget => {
                let at = mapping.map_result(self.from, Assoc::Before);
                (!at.deleted).then(|| Decoration {
                    from: at.pos,
                    to: at.pos,
                    ..self.clone()
                })
            }
        }
    }
}

/// Decorations kept in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationSet {
    decorations: Vec<Decoration>,
}

impl DecorationSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(decorations: impl IntoIterator<Item = Decoration>) -> Self {
        let mut decorations: Vec<Decoration> = decorations.into_iter().collect();
        decorations.sort_by_key(|d| (d.from, d.to));
        Self { decorations }
    }

    pub fn is_empty(&self) -> bool {
        self.decorations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decorations.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter()
    }

    /// Decorations overlapping `range` (widgets touching it included).
    pub fn find(&self, range: Range<usize>) -> impl Iterator<Item = &Decoration> {
        self.decorations.iter().filter(move |d| {
            if d.kind == DecorationKind::Widget {
                range.start <= d.from && d.from <= range.end
            } else {
                d.from < range.end && range.start < d.to
            }
        })
    }

    pub fn map(&self, mapping: &Mapping) -> DecorationSet {
        if mapping.is_empty() {
            return self.clone();
        }
        Self::new(self.decorations.iter().filter_map(|d| d.map(mapping)))
    }

    /// Union of two sets, still in document order.
    pub fn merge(mut self, other: DecorationSet) -> DecorationSet {
        self.decorations.extend(other.decorations);
        Self::new(self.decorations)
    }
}

impl FromIterator<Decoration> for DecorationSet {
    fn from_iter<T: IntoIterator<Item = Decoration>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl IntoIterator for DecorationSet {
    type Item = Decoration;
    type IntoIter = std::vec::IntoIter<Decoration>;

    fn into_iter(self) -> Self::IntoIter {
        self.decorations.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::StepMap;

    #[test]
    fn test_inline_decoration_shifts_and_collapses() {
        let set = DecorationSet::new([
            Decoration::inline(2..5, "a"),
            Decoration::inline(10..12, "b"),
        ]);
        let mapping = Mapping::from(StepMap::deletion(9..13));
        let mapped: Vec<Range<usize>> = set.map(&mapping).iter().map(Decoration::range).collect();
        assert_eq!(mapped, vec![2..5]);

        let mapping = Mapping::from(StepMap::insertion(0, 3));
        let mapped: Vec<Range<usize>> = set.map(&mapping).iter().map(Decoration::range).collect();
        assert_eq!(mapped, vec![5..8, 13..15]);
    }

    #[test]
    fn test_inline_decoration_does_not_grow_at_edges() {
        let deco = Decoration::inline(2..5, "a");
        let mapped = deco.map(&Mapping::from(StepMap::insertion(5, 2))).unwrap();
        assert_eq!(mapped.range(), 2..5);
        let mapped = deco.map(&Mapping::from(StepMap::insertion(2, 2))).unwrap();
        assert_eq!(mapped.range(), 4..7);
    }

    #[test]
    fn test_node_decoration_dropped_when_node_deleted() {
        let deco = Decoration::node(4..10, "collapsed-content");
        assert!(deco.map(&Mapping::from(StepMap::deletion(2..6))).is_none());
    }

    #[test]
    fn test_find_and_merge() {
        let set = DecorationSet::new([Decoration::inline(0..3, "x")])
            .merge(DecorationSet::new([Decoration::widget(5, "w")]));
        assert_eq!(set.len(), 2);
        assert_eq!(set.find(3..5).count(), 1);
        assert_eq!(set.find(2..4).count(), 1);
    }
}
