use std::ops::Range;

use crate::model::{Block, Mark, Node, Text};
#[cfg(test)]
use crate::model::BlockKind;

/// The document: an ordered list of top-level blocks.
///
/// Positions index the document content. Each text run occupies one position
/// per character, inline atoms and leaf blocks one position, and every other
/// block an opening and closing token around its children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DocumentTree {
    pub(crate) blocks: Vec<Node>,
}

/// A node together with the position directly before it.
#[derive(Debug, Clone, Copy)]
pub struct Positioned<'a> {
    pub pos: usize,
    pub depth: usize,
    pub node: &'a Node,
}

impl Positioned<'_> {
    pub fn end(&self) -> usize {
        self.pos + self.node.size()
    }
}

/// Location of a textblock: its child-index path from the root and the
/// range of positions covering its inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextblockLocation {
    pub path: Vec<usize>,
    pub content: Range<usize>,
}

impl TextblockLocation {
    /// Position before the textblock's opening token
    pub fn start(&self) -> usize {
        self.content.start - 1
    }

    pub fn end(&self) -> usize {
        self.content.end + 1
    }
}

/// Depth-first, document-order traversal. Lazy and restartable: calling
/// [`DocumentTree::descendants`] again starts a fresh walk.
pub struct Descendants<'a> {
    stack: Vec<(std::slice::Iter<'a, Node>, usize)>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Positioned<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len().checked_sub(1)?;
            let (iter, pos) = self.stack.last_mut()?;
            let Some(node) = iter.next() else {
                self.stack.pop();
                continue;
            };
            let at = *pos;
            *pos += node.size();
            if let Node::Block(block) = node
                && !block.kind.is_leaf()
            {
                self.stack.push((block.children.iter(), at + 1));
            }
            return Some(Positioned {
                pos: at,
                depth,
                node,
            });
        }
    }
}

impl DocumentTree {
    pub fn new(blocks: Vec<Node>) -> Self {
        let mut tree = Self { blocks };
        tree.ensure_not_empty();
        tree
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn blocks(&self) -> &[Node] {
        &self.blocks
    }

    /// A document always holds at least one block for the cursor to live in.
    pub(crate) fn ensure_not_empty(&mut self) {
        if self.blocks.is_empty() {
            self.blocks.push(Node::paragraph(Vec::new()));
        }
    }

    pub fn content_size(&self) -> usize {
        self.blocks.iter().map(Node::size).sum()
    }

    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: vec![(self.blocks.iter(), 0)],
        }
    }

    /// Every text run in document order, with the position before it.
    pub fn text_runs(&self) -> impl Iterator<Item = (usize, &Text)> + '_ {
        self.descendants().filter_map(|p| match p.node {
            Node::Text(text) => Some((p.pos, text)),
            _ => None,
        })
    }

    /// Every inline leaf (text, variable reference, hard break) in document order.
    pub fn inline_leaves(&self) -> impl Iterator<Item = Positioned<'_>> + '_ {
        self.descendants().filter(|p| p.node.is_inline())
    }

    /// All textblocks, in document order.
    pub fn textblocks(&self) -> Vec<TextblockLocation> {
        let mut out = Vec::new();
        collect_textblocks(&self.blocks, 0, &mut Vec::new(), &mut out);
        out
    }

    /// The textblock whose inline content contains `pos` (edges inclusive).
    pub fn textblock_at(&self, pos: usize) -> Option<TextblockLocation> {
        self.textblocks()
            .into_iter()
            .find(|loc| loc.content.start <= pos && pos <= loc.content.end)
    }

    pub fn block_at_path(&self, path: &[usize]) -> Option<&Block> {
        let (first, rest) = path.split_first()?;
        let mut block = self.blocks.get(*first)?.as_block()?;
        for index in rest {
            block = block.children.get(*index)?.as_block()?;
        }
        Some(block)
    }

    pub(crate) fn block_at_path_mut(&mut self, path: &[usize]) -> Option<&mut Block> {
        let (first, rest) = path.split_first()?;
        let mut block = match self.blocks.get_mut(*first)? {
            Node::Block(block) => block,
            _ => return None,
        };
        for index in rest {
            block = match block.children.get_mut(*index)? {
                Node::Block(child) => child,
                _ => return None,
            };
        }
        Some(block)
    }

    /// Children list that owns the node at `path` (the document root for
    /// one-element paths).
    pub(crate) fn siblings_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        match path.split_last() {
            Some((_, [])) => Some(&mut self.blocks),
            Some((_, parent)) => self.block_at_path_mut(parent).map(|b| &mut b.children),
            None => None,
        }
    }

    /// Text between two positions. Block boundaries contribute `block_separator`
    /// between textblocks; inline atoms contribute nothing.
    pub fn text_between(&self, range: Range<usize>, block_separator: &str) -> String {
        let mut out = String::new();
        let mut first = true;
        for loc in self.textblocks() {
            if loc.content.end < range.start || loc.content.start > range.end {
                continue;
            }
            let Some(block) = self.block_at_path(&loc.path) else {
                continue;
            };
            if !first {
                out.push_str(block_separator);
            }
            first = false;
            let mut pos = loc.content.start;
            for child in &block.children {
                let size = child.size();
                if let Node::Text(text) = child {
                    let from = range.start.max(pos).saturating_sub(pos);
                    let to = range.end.min(pos + size).saturating_sub(pos);
                    if from < to {
                        out.extend(text.text.chars().skip(from).take(to - from));
                    }
                }
                pos += size;
            }
        }
        out
    }

    /// Plain text of the whole document, textblocks separated by newlines.
    pub fn text(&self) -> String {
        self.text_between(0..self.content_size(), "\n")
    }

    /// Word under a collapsed cursor: extend left and right while the adjoining
    /// character is a word character. `None` when the cursor touches no word.
    pub fn word_range_at(&self, pos: usize) -> Option<Range<usize>> {
        let loc = self.textblock_at(pos)?;
        let block = self.block_at_path(&loc.path)?;
        let chars = inline_chars(&block.children);
        let offset = pos - loc.content.start;
        let is_word = |c: &Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');

        let mut start = offset;
        while start > 0 && is_word(&chars[start - 1]) {
            start -= 1;
        }
        let mut end = offset;
        while end < chars.len() && is_word(&chars[end]) {
            end += 1;
        }
        (start != end).then(|| loc.content.start + start..loc.content.start + end)
    }

    /// Whitespace-delimited words across all text
    pub fn word_count(&self) -> usize {
        self.textblocks()
            .iter()
            .filter_map(|loc| self.block_at_path(&loc.path))
            .map(|block| block.text_content().split_whitespace().count())
            .sum()
    }

    pub fn char_count(&self) -> usize {
        self.text_runs().map(|(_, text)| text.len()).sum()
    }

    /// Distinct comment ids carried by any inline node, in first-seen order.
    pub fn comment_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for leaf in self.inline_leaves() {
            for id in leaf.node.marks().iter().filter_map(Mark::comment_id) {
                if !ids.iter().any(|known| known == id) {
                    ids.push(id.to_string());
                }
            }
        }
        ids
    }

    /// Ranges of inline nodes carrying the given comment mark
    pub fn comment_runs(&self, comment_id: &str) -> Vec<Range<usize>> {
        self.inline_leaves()
            .filter(|leaf| {
                leaf.node
                    .marks()
                    .iter()
                    .any(|m| m.comment_id() == Some(comment_id))
            })
            .map(|leaf| leaf.pos..leaf.end())
            .collect()
    }

    /// Top-most nodes starting inside `range`, without descending into them.
    /// Nodes that start before `range` but overlap it are descended into.
    pub fn nodes_between(&self, range: Range<usize>) -> Vec<Positioned<'_>> {
        let mut out = Vec::new();
        collect_between(&self.blocks, 0, 0, &range, &mut out);
        out
    }

    /// Marks at a position, as inherited by text typed there. Inside a run
    /// that run's marks apply; at a boundary the marks of the node before
    /// (or after, at the start of a textblock) apply, minus non-inclusive
    /// marks the other side does not share.
    pub fn marks_at(&self, pos: usize) -> Vec<Mark> {
        let Some(loc) = self.textblock_at(pos) else {
            return Vec::new();
        };
        let Some(block) = self.block_at_path(&loc.path) else {
            return Vec::new();
        };
        let offset = pos - loc.content.start;
        let mut before: Option<&[Mark]> = None;
        let mut after: Option<&[Mark]> = None;
        let mut at = 0;
        for child in &block.children {
            let size = child.size();
            if at < offset && offset < at + size {
                return child.marks().to_vec();
            }
            if at + size == offset {
                before = Some(child.marks());
            }
            if at == offset {
                after = Some(child.marks());
            }
            at += size;
        }
        let (main, other) = match (before, after) {
            (Some(b), a) => (b, a),
            (None, Some(a)) => (a, None),
            (None, None) => return Vec::new(),
        };
        main.iter()
            .filter(|m| m.is_inclusive() || other.is_some_and(|o| o.contains(m)))
            .cloned()
            .collect()
    }
}

fn collect_textblocks(
    nodes: &[Node],
    mut pos: usize,
    path: &mut Vec<usize>,
    out: &mut Vec<TextblockLocation>,
) {
    for (index, node) in nodes.iter().enumerate() {
        let size = node.size();
        if let Node::Block(block) = node {
            path.push(index);
            if block.kind.is_textblock() {
                out.push(TextblockLocation {
                    path: path.clone(),
                    content: pos + 1..pos + size - 1,
                });
            } else if !block.kind.is_leaf() {
                collect_textblocks(&block.children, pos + 1, path, out);
            }
            path.pop();
        }
        pos += size;
    }
}

fn collect_between<'a>(
    nodes: &'a [Node],
    mut pos: usize,
    depth: usize,
    range: &Range<usize>,
    out: &mut Vec<Positioned<'a>>,
) {
    for node in nodes {
        let size = node.size();
        let end = pos + size;
        if pos >= range.end {
            break;
        }
        if pos >= range.start {
            out.push(Positioned { pos, depth, node });
        } else if end > range.start
            && let Node::Block(block) = node
            && !block.kind.is_leaf()
        {
            collect_between(&block.children, pos + 1, depth + 1, range, out);
        }
        pos = end;
    }
}

/// One entry per position of an inline content list: `Some(char)` for text,
/// `None` for atoms.
pub(crate) fn inline_chars(children: &[Node]) -> Vec<Option<char>> {
    let mut out = Vec::new();
    for child in children {
        match child {
            Node::Text(text) => out.extend(text.text.chars().map(Some)),
            _ => out.push(None),
        }
    }
    out
}

impl From<Vec<Node>> for DocumentTree {
    fn from(blocks: Vec<Node>) -> Self {
        Self::new(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> DocumentTree {
        DocumentTree::new(vec![
            Node::heading(1, vec![Node::text("Title")]),
            Node::paragraph(vec![
                Node::text("hello "),
                Node::marked_text("world", vec![Mark::Bold]),
            ]),
            Node::block(
                BlockKind::BulletList,
                vec![Node::block(
                    BlockKind::ListItem,
                    vec![Node::paragraph(vec![Node::text("item")])],
                )],
            ),
        ])
    }

    #[test]
    fn descendants_report_positions() {
        let tree = sample();
        let positions: Vec<(usize, usize)> =
            tree.descendants().map(|p| (p.pos, p.depth)).collect();

        // heading@0, "Title"@1, paragraph@7, "hello "@8, "world"@14,
        // list@20, item@21, paragraph@22, "item"@23
        assert_eq!(
            positions,
            vec![
                (0, 0),
                (1, 1),
                (7, 0),
                (8, 1),
                (14, 1),
                (20, 0),
                (21, 1),
                (22, 2),
                (23, 3)
            ]
        );
        assert_eq!(tree.content_size(), 30);
    }

    #[test]
    fn descendants_restart() {
        let tree = sample();
        assert_eq!(tree.descendants().count(), tree.descendants().count());
    }

    #[test]
    fn textblocks_and_lookup() {
        let tree = sample();
        let blocks = tree.textblocks();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[1].content, 8..19);
        assert_eq!(blocks[2].path, vec![2, 0, 0]);

        let loc = tree.textblock_at(19).unwrap();
        assert_eq!(loc.path, vec![1]);
        assert!(tree.textblock_at(20).is_none());
    }

    #[test]
    fn text_between_spans_blocks() {
        let tree = sample();
        assert_eq!(tree.text_between(3..12, "|"), "tle|hell");
        assert_eq!(tree.text(), "Title\nhello world\nitem");
    }

    #[test]
    fn word_range_extends_both_ways() {
        let tree = sample();
        // cursor inside "world"
        assert_eq!(tree.word_range_at(16), Some(14..19));
        // cursor at the end of "hello", touching the word on its left
        assert_eq!(tree.word_range_at(13), Some(8..13));
    }

    #[test]
    fn word_range_none_on_whitespace_only() {
        let tree = DocumentTree::new(vec![Node::paragraph(vec![Node::text("a  b")])]);
        assert_eq!(tree.word_range_at(3), None);
    }

    #[test]
    fn empty_tree_has_a_paragraph() {
        let tree = DocumentTree::empty();
        assert_eq!(tree.content_size(), 2);
        assert_eq!(tree.textblock_at(1).unwrap().content, 1..1);
    }

    #[test]
    fn nodes_between_stays_top_most() {
        let tree = sample();
        let nodes: Vec<usize> = tree.nodes_between(7..30).iter().map(|p| p.pos).collect();
        assert_eq!(nodes, vec![7, 20]);
    }

    #[test]
    fn marks_at_boundaries() {
        let tree = DocumentTree::new(vec![Node::paragraph(vec![
            Node::marked_text("ab", vec![Mark::Bold, Mark::comment("c1")]),
            Node::text("cd"),
        ])]);
        // inside the marked run
        assert_eq!(tree.marks_at(2), vec![Mark::Bold, Mark::comment("c1")]);
        // at its end: the comment does not extend
        assert_eq!(tree.marks_at(3), vec![Mark::Bold]);
        // at the start of the block: marks of the node after, minus non-inclusive
        assert_eq!(tree.marks_at(1), vec![Mark::Bold]);
    }

    #[test]
    fn counters() {
        let tree = sample();
        assert_eq!(tree.word_count(), 4);
        assert_eq!(tree.char_count(), 20);
    }
}
