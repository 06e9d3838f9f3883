use std::ops::Range;

use thiserror::Error;

use crate::editing::{Mapping, StepMap};
use crate::model::mark::{add_to_set, remove_from_set};
use crate::model::{Block, BlockKind, DocumentTree, Mark, Node, Text, TextblockLocation};

/// Edit commands. Every mutation of a [`DocumentTree`] goes through one of
/// these so that it comes with a position mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Insert text at a position inside a textblock. The text inherits the
    /// marks at that position.
    InsertText { at: usize, text: String },
    /// Delete inline content, within one textblock or across sibling
    /// textblocks (which are joined).
    DeleteRange { range: Range<usize> },
    /// Replace a range with text carrying the marks of the first replaced
    /// character.
    ReplaceRange { range: Range<usize>, text: String },
    AddMark { range: Range<usize>, mark: Mark },
    RemoveMark { range: Range<usize>, mark: Mark },
    /// Remove a mark from every node in the document.
    StripMark { mark: Mark },
    InsertInline { at: usize, node: Node },
    /// Split the textblock at a position (Enter).
    SplitBlock { at: usize },
    /// Insert a block at a block boundary.
    InsertBlock { at: usize, node: Node },
    /// Delete the block starting at a position.
    DeleteBlock { at: usize },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("position {pos} is outside the document (size {size})")]
    OutOfBounds { pos: usize, size: usize },

    #[error("position {0} is not inside a textblock")]
    NotInTextblock(usize),

    #[error("range {from}..{to} cannot be edited as one unit")]
    UnsupportedRange { from: usize, to: usize },

    #[error("no block boundary at position {0}")]
    NoBlockAt(usize),

    #[error("expected an inline node")]
    ExpectedInline,

    #[error("expected a block node")]
    ExpectedBlock,
}

/// What one command did: how positions moved and which range of the new
/// document it touched.
#[derive(Debug, Default)]
pub(crate) struct Outcome {
    pub mapping: Mapping,
    pub changed: Option<Range<usize>>,
}

impl Outcome {
    fn step(map: StepMap) -> Self {
        Self {
            changed: Some(map.start..map.new_end()),
            mapping: map.into(),
        }
    }
}

/// One position of inline content, exploded for editing.
#[derive(Debug, Clone)]
enum Piece {
    Char(char, Vec<Mark>),
    Atom(Node),
}

impl Piece {
    fn marks(&self) -> &[Mark] {
        match self {
            Piece::Char(_, marks) => marks,
            Piece::Atom(node) => node.marks(),
        }
    }

    fn marks_mut(&mut self) -> Option<&mut Vec<Mark>> {
        match self {
            Piece::Char(_, marks) => Some(marks),
            Piece::Atom(Node::Variable(var)) => Some(&mut var.marks),
            Piece::Atom(_) => None,
        }
    }
}

fn explode(children: &[Node]) -> Vec<Piece> {
    let mut pieces = Vec::new();
    for child in children {
        match child {
            Node::Text(text) => {
                pieces.extend(text.text.chars().map(|c| Piece::Char(c, text.marks.clone())))
            }
            other => pieces.push(Piece::Atom(other.clone())),
        }
    }
    pieces
}

/// Rebuild inline content, merging adjacent characters with equal marks.
fn rebuild(pieces: Vec<Piece>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Char(c, marks) => match out.last_mut() {
                Some(Node::Text(last)) if last.marks == marks => last.text.push(c),
                _ => out.push(Node::Text(Text {
                    text: c.to_string(),
                    marks,
                })),
            },
            Piece::Atom(node) => out.push(node),
        }
    }
    out
}

fn text_pieces(text: &str, marks: &[Mark]) -> Vec<Piece> {
    text.chars().map(|c| Piece::Char(c, marks.to_vec())).collect()
}

fn check_bounds(tree: &DocumentTree, pos: usize) -> Result<(), EditError> {
    let size = tree.content_size();
    if pos > size {
        return Err(EditError::OutOfBounds { pos, size });
    }
    Ok(())
}

fn locate(tree: &DocumentTree, pos: usize) -> Result<TextblockLocation, EditError> {
    check_bounds(tree, pos)?;
    tree.textblock_at(pos).ok_or(EditError::NotInTextblock(pos))
}

fn edit_inline<R>(
    tree: &mut DocumentTree,
    loc: &TextblockLocation,
    f: impl FnOnce(&mut Vec<Piece>) -> R,
) -> Result<R, EditError> {
    let block = tree
        .block_at_path_mut(&loc.path)
        .ok_or(EditError::NotInTextblock(loc.content.start))?;
    let mut pieces = explode(&block.children);
    let result = f(&mut pieces);
    block.children = rebuild(pieces);
    Ok(result)
}

pub(crate) fn apply(tree: &mut DocumentTree, cmd: &Cmd) -> Result<Outcome, EditError> {
    match cmd {
        Cmd::InsertText { at, text } => insert_text(tree, *at, text),
        Cmd::DeleteRange { range } => delete_range(tree, range.clone()),
        Cmd::ReplaceRange { range, text } => replace_range(tree, range.clone(), text),
        Cmd::AddMark { range, mark } => {
            change_marks(tree, range.clone(), |set| add_to_set(set, mark))
        }
        Cmd::RemoveMark { range, mark } => {
            change_marks(tree, range.clone(), |set| remove_from_set(set, mark))
        }
        Cmd::StripMark { mark } => {
            let size = tree.content_size();
            let mut outcome =
                change_marks(tree, 0..size, |set| remove_from_set(set, mark))?;
            outcome.changed = None;
            Ok(outcome)
        }
        Cmd::InsertInline { at, node } => insert_inline(tree, *at, node),
        Cmd::SplitBlock { at } => split_block(tree, *at),
        Cmd::InsertBlock { at, node } => insert_block(tree, *at, node),
        Cmd::DeleteBlock { at } => delete_block(tree, *at),
    }
}

fn insert_text(tree: &mut DocumentTree, at: usize, text: &str) -> Result<Outcome, EditError> {
    let loc = locate(tree, at)?;
    if text.is_empty() {
        return Ok(Outcome::default());
    }
    let marks = tree.marks_at(at);
    let inserted = text_pieces(text, &marks);
    let size = inserted.len();
    let offset = at - loc.content.start;
    edit_inline(tree, &loc, |pieces| {
        pieces.splice(offset..offset, inserted);
    })?;
    Ok(Outcome::step(StepMap::insertion(at, size)))
}

fn insert_inline(tree: &mut DocumentTree, at: usize, node: &Node) -> Result<Outcome, EditError> {
    let inserted = match node {
        Node::Block(_) => return Err(EditError::ExpectedInline),
        Node::Text(text) => text_pieces(&text.text, &text.marks),
        atom => vec![Piece::Atom(atom.clone())],
    };
    let loc = locate(tree, at)?;
    let size = inserted.len();
    let offset = at - loc.content.start;
    edit_inline(tree, &loc, |pieces| {
        pieces.splice(offset..offset, inserted);
    })?;
    Ok(Outcome::step(StepMap::insertion(at, size)))
}

fn delete_range(tree: &mut DocumentTree, range: Range<usize>) -> Result<Outcome, EditError> {
    let unsupported = EditError::UnsupportedRange {
        from: range.start,
        to: range.end,
    };
    if range.start > range.end {
        return Err(unsupported);
    }
    check_bounds(tree, range.end)?;
    if range.is_empty() {
        return Ok(Outcome::default());
    }
    let first = tree.textblock_at(range.start).ok_or_else(|| unsupported.clone())?;
    let last = tree.textblock_at(range.end).ok_or_else(|| unsupported.clone())?;

    if first.path == last.path {
        let from = range.start - first.content.start;
        let to = range.end - first.content.start;
        edit_inline(tree, &first, |pieces| {
            pieces.drain(from..to);
        })?;
        return Ok(Outcome::step(StepMap::deletion(range)));
    }

    let (Some((first_index, first_parent)), Some((last_index, last_parent))) =
        (first.path.split_last(), last.path.split_last())
    else {
        return Err(unsupported);
    };
    if first_parent != last_parent || first_index >= last_index {
        return Err(unsupported);
    }

    let tail = match tree.block_at_path(&last.path) {
        Some(block) => explode(&block.children).split_off(range.end - last.content.start),
        None => return Err(unsupported),
    };
    let keep = range.start - first.content.start;
    edit_inline(tree, &first, |pieces| {
        pieces.truncate(keep);
        pieces.extend(tail);
    })?;
    if let Some(siblings) = tree.siblings_mut(&first.path) {
        siblings.drain(first_index + 1..=*last_index);
    }
    Ok(Outcome::step(StepMap::deletion(range)))
}

fn replace_range(
    tree: &mut DocumentTree,
    range: Range<usize>,
    text: &str,
) -> Result<Outcome, EditError> {
    if range.start > range.end {
        return Err(EditError::UnsupportedRange {
            from: range.start,
            to: range.end,
        });
    }
    check_bounds(tree, range.end)?;
    let loc = locate(tree, range.start)?;
    if range.end > loc.content.end {
        // spans textblocks: join first, then insert
        let mut outcome = delete_range(tree, range.clone())?;
        let inserted = insert_text(tree, range.start, text)?;
        outcome.mapping.append(inserted.mapping);
        outcome.changed = inserted.changed.or(outcome.changed);
        return Ok(outcome);
    }

    let from = range.start - loc.content.start;
    let to = range.end - loc.content.start;
    let marks = match tree.block_at_path(&loc.path) {
        Some(block) if from < to => explode(&block.children)
            .get(from)
            .map(|piece| piece.marks().to_vec())
            .unwrap_or_default(),
        _ => tree.marks_at(range.start),
    };
    let inserted = text_pieces(text, &marks);
    let size = inserted.len();
    edit_inline(tree, &loc, |pieces| {
        pieces.splice(from..to, inserted);
    })?;
    Ok(Outcome::step(StepMap::new(range.start, range.len(), size)))
}

fn change_marks(
    tree: &mut DocumentTree,
    range: Range<usize>,
    change: impl Fn(&[Mark]) -> Vec<Mark>,
) -> Result<Outcome, EditError> {
    if range.start > range.end {
        return Err(EditError::UnsupportedRange {
            from: range.start,
            to: range.end,
        });
    }
    check_bounds(tree, range.end)?;
    for loc in tree.textblocks() {
        if loc.content.end <= range.start || range.end <= loc.content.start {
            continue;
        }
        let from = range.start.max(loc.content.start) - loc.content.start;
        let to = range.end.min(loc.content.end) - loc.content.start;
        edit_inline(tree, &loc, |pieces| {
            for piece in &mut pieces[from..to] {
                if let Some(marks) = piece.marks_mut() {
                    *marks = change(marks.as_slice());
                }
            }
        })?;
    }
    Ok(Outcome {
        mapping: Mapping::new(),
        changed: (!range.is_empty()).then_some(range),
    })
}

fn split_block(tree: &mut DocumentTree, at: usize) -> Result<Outcome, EditError> {
    let loc = locate(tree, at)?;
    let Some(block) = tree.block_at_path(&loc.path) else {
        return Err(EditError::NotInTextblock(at));
    };
    if matches!(block.kind, BlockKind::CodeBlock { .. }) {
        return insert_text(tree, at, "\n");
    }

    let offset = at - loc.content.start;
    let mut head = explode(&block.children);
    let tail = head.split_off(offset);
    let at_end = tail.is_empty();
    let first = Block {
        kind: block.kind.clone(),
        align: block.align,
        children: rebuild(head),
    };
    let second = match block.kind {
        BlockKind::Heading { .. } | BlockKind::Title | BlockKind::Subtitle if at_end => {
            Block::new(BlockKind::Paragraph, Vec::new())
        }
        _ => Block {
            kind: block.kind.clone(),
            align: block.align,
            children: rebuild(tail),
        },
    };

    let Some((&index, parent_path)) = loc.path.split_last() else {
        return Err(EditError::NotInTextblock(at));
    };
    let in_list_item = tree
        .block_at_path(parent_path)
        .is_some_and(|parent| parent.kind == BlockKind::ListItem);

    if in_list_item {
        let Some(item) = tree.block_at_path_mut(parent_path) else {
            return Err(EditError::NotInTextblock(at));
        };
        item.children[index] = Node::Block(first);
        let mut moved = vec![Node::Block(second)];
        moved.extend(item.children.drain(index + 1..));
        let new_item = Node::Block(Block::new(BlockKind::ListItem, moved));
        let Some(&item_index) = parent_path.last() else {
            return Err(EditError::NotInTextblock(at));
        };
        if let Some(siblings) = tree.siblings_mut(parent_path) {
            siblings.insert(item_index + 1, new_item);
        }
        return Ok(Outcome::step(StepMap::insertion(at, 4)));
    }

    let Some(siblings) = tree.siblings_mut(&loc.path) else {
        return Err(EditError::NotInTextblock(at));
    };
    siblings[index] = Node::Block(first);
    siblings.insert(index + 1, Node::Block(second));
    Ok(Outcome::step(StepMap::insertion(at, 2)))
}

/// Child-index path of the slot at a block boundary: the parent's path
/// followed by the index a block inserted there would get.
fn slot_at(nodes: &[Node], mut cur: usize, target: usize, path: &mut Vec<usize>) -> bool {
    for (index, node) in nodes.iter().enumerate() {
        if cur == target {
            path.push(index);
            return true;
        }
        let end = cur + node.size();
        if target < end {
            if let Node::Block(block) = node
                && !block.kind.is_textblock()
                && !block.kind.is_leaf()
            {
                path.push(index);
                if slot_at(&block.children, cur + 1, target, path) {
                    return true;
                }
                path.pop();
            }
            return false;
        }
        cur = end;
    }
    if cur == target {
        path.push(nodes.len());
        return true;
    }
    false
}

/// Path of the top-most block starting exactly at `target`.
fn block_path_at(nodes: &[Node], mut cur: usize, target: usize, path: &mut Vec<usize>) -> bool {
    for (index, node) in nodes.iter().enumerate() {
        let Node::Block(block) = node else {
            cur += node.size();
            continue;
        };
        if cur == target {
            path.push(index);
            return true;
        }
        let end = cur + node.size();
        if target < end {
            if !block.kind.is_textblock() && !block.kind.is_leaf() {
                path.push(index);
                if block_path_at(&block.children, cur + 1, target, path) {
                    return true;
                }
                path.pop();
            }
            return false;
        }
        cur = end;
    }
    false
}

fn insert_block(tree: &mut DocumentTree, at: usize, node: &Node) -> Result<Outcome, EditError> {
    if node.is_inline() {
        return Err(EditError::ExpectedBlock);
    }
    check_bounds(tree, at)?;
    let mut path = Vec::new();
    if !slot_at(tree.blocks(), 0, at, &mut path) {
        return Err(EditError::NoBlockAt(at));
    }
    let Some(&index) = path.last() else {
        return Err(EditError::NoBlockAt(at));
    };
    let siblings = tree.siblings_mut(&path).ok_or(EditError::NoBlockAt(at))?;
    siblings.insert(index, node.clone());
    Ok(Outcome::step(StepMap::insertion(at, node.size())))
}

fn delete_block(tree: &mut DocumentTree, at: usize) -> Result<Outcome, EditError> {
    check_bounds(tree, at)?;
    let mut path = Vec::new();
    if !block_path_at(tree.blocks(), 0, at, &mut path) {
        return Err(EditError::NoBlockAt(at));
    }
    let Some(&index) = path.last() else {
        return Err(EditError::NoBlockAt(at));
    };
    let siblings = tree.siblings_mut(&path).ok_or(EditError::NoBlockAt(at))?;
    let removed = siblings.remove(index);
    let was_last = tree.blocks().is_empty();
    tree.ensure_not_empty();
    let new_size = if was_last { tree.content_size() } else { 0 };
    Ok(Outcome::step(StepMap::new(at, removed.size(), new_size)))
}
