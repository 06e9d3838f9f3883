//! Collapsible sections derived from heading structure.
//!
//! Collapse state is keyed by heading identity rather than position, so it
//! survives edits that leave a heading's level, rank and text alone.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

use crate::editing::{Decoration, DecorationSet, Session};
use crate::model::{DocumentTree, Node};

pub const HIDDEN_CLASS: &str = "collapsed-content";
pub const TOGGLE_CLASS: &str = "heading-collapse-toggle";

const KEY_TEXT_LIMIT: usize = 50;

/// `"{level}-{index}-{first 50 chars of text}"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeadingKey(String);

impl HeadingKey {
    pub fn new(level: u8, index: usize, text: &str) -> Self {
        let prefix: String = text.chars().take(KEY_TEXT_LIMIT).collect();
        Self(format!("{level}-{index}-{prefix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HeadingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingInfo {
    pub pos: usize,
    pub end: usize,
    pub level: u8,
    pub text: String,
    /// Rank among all headings in document order
    pub index: usize,
    pub key: HeadingKey,
}

/// Headings in document order, nested ones included.
pub fn headings(tree: &DocumentTree) -> impl Iterator<Item = HeadingInfo> + '_ {
    tree.descendants()
        .filter_map(|p| match p.node {
            Node::Block(block) => block.kind.heading_level().map(|level| (p, block, level)),
            _ => None,
        })
        .enumerate()
        .map(|(index, (p, block, level))| {
            let text = block.text_content();
            HeadingInfo {
                pos: p.pos,
                end: p.end(),
                level,
                key: HeadingKey::new(level, index, &text),
                text,
                index,
            }
        })
}

/// Where a toggle control for a heading should be drawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleAffordance {
    pub key: HeadingKey,
    /// Position at the start of the heading's content
    pub pos: usize,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CollapseEngine {
    collapsed: BTreeSet<HeadingKey>,
    always_show_toggle: bool,
}

impl CollapseEngine {
    pub fn new(always_show_toggle: bool) -> Self {
        Self {
            collapsed: BTreeSet::new(),
            always_show_toggle,
        }
    }

    /// Flip a heading's state. Returns whether it is now collapsed.
    pub fn toggle(&mut self, key: &HeadingKey) -> bool {
        if self.collapsed.remove(key) {
            false
        } else {
            self.collapsed.insert(key.clone());
            true
        }
    }

    pub fn is_collapsed(&self, key: &HeadingKey) -> bool {
        self.collapsed.contains(key)
    }

    pub fn collapsed_keys(&self) -> impl Iterator<Item = &HeadingKey> {
        self.collapsed.iter()
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    /// Ranges of the top-most nodes hidden by collapsed headings. A collapsed
    /// heading hides everything from its end up to the next heading of the
    /// same or a higher level, or the document end.
    pub fn hidden_ranges(&self, tree: &DocumentTree) -> Vec<Range<usize>> {
        if self.collapsed.is_empty() {
            return Vec::new();
        }
        let mut ranges = Vec::new();
        for (_, section) in self.collapsed_sections(tree) {
            ranges.extend(
                tree.nodes_between(section)
                    .into_iter()
                    .map(|p| p.pos..p.end()),
            );
        }
        ranges.sort_by_key(|r| r.start);
        ranges.dedup();
        ranges
    }

    /// Each collapsed heading with the non-empty span it hides, in
    /// document order.
    fn collapsed_sections(&self, tree: &DocumentTree) -> Vec<(HeadingKey, Range<usize>)> {
        let all: Vec<HeadingInfo> = headings(tree).collect();
        let doc_end = tree.content_size();
        all.iter()
            .enumerate()
            .filter(|(_, heading)| self.collapsed.contains(&heading.key))
            .filter_map(|(i, heading)| {
                let hide_until = all[i + 1..]
                    .iter()
                    .find(|h| h.level <= heading.level)
                    .map_or(doc_end, |h| h.pos);
                (heading.end < hide_until).then(|| (heading.key.clone(), heading.end..hide_until))
            })
            .collect()
    }

    pub fn is_hidden(&self, tree: &DocumentTree, pos: usize) -> bool {
        self.hidden_ranges(tree)
            .iter()
            .any(|r| r.start <= pos && pos < r.end)
    }

    /// Headings that get a toggle control. Headings without text are still
    /// collapsible but get none unless `always_show_toggle` is set.
    pub fn toggle_affordances(&self, tree: &DocumentTree) -> Vec<ToggleAffordance> {
        headings(tree)
            .filter(|h| self.always_show_toggle || !h.text.is_empty())
            .map(|h| ToggleAffordance {
                collapsed: self.collapsed.contains(&h.key),
                key: h.key,
                pos: h.pos + 1,
            })
            .collect()
    }

    pub fn decorations(&self, tree: &DocumentTree) -> DecorationSet {
        let toggles = self.toggle_affordances(tree).into_iter().map(|t| {
            let class = if t.collapsed {
                format!("{TOGGLE_CLASS} collapsed")
            } else {
                TOGGLE_CLASS.to_string()
            };
            Decoration::widget(t.pos, class)
        });
        let hidden = self
            .hidden_ranges(tree)
            .into_iter()
            .map(|r| Decoration::node(r, HIDDEN_CLASS));
        toggles.chain(hidden).collect()
    }

    /// The heading whose section holds the cursor: the last heading starting
    /// at or before it.
    pub fn current_section(&self, tree: &DocumentTree, cursor: usize) -> Option<HeadingInfo> {
        headings(tree).take_while(|h| h.pos <= cursor).last()
    }

    /// Toggle the section holding the cursor and park the cursor at the end
    /// of the heading text. Returns the new state, or `None` outside any
    /// section.
    pub fn toggle_current_section(&mut self, session: &mut Session) -> Option<bool> {
        let heading = self.current_section(session.tree(), session.cursor())?;
        let collapsed = self.toggle(&heading.key);
        session.set_selection(heading.end - 1..heading.end - 1);
        Some(collapsed)
    }

    /// Expand every collapsed section that hides `target`, innermost first.
    /// Sections that merely precede it stay collapsed. Returns the keys that
    /// were expanded.
    pub fn reveal(&mut self, tree: &DocumentTree, target: usize) -> Vec<HeadingKey> {
        let expanded: Vec<HeadingKey> = self
            .collapsed_sections(tree)
            .into_iter()
            .rev()
            .filter(|(_, section)| section.contains(&target))
            .map(|(key, _)| key)
            .collect();
        for key in &expanded {
            self.collapsed.remove(key);
        }
        if !expanded.is_empty() {
            log::debug!("expanded {} sections to reveal {target}", expanded.len());
        }
        expanded
    }

    /// Reveal a position and move the cursor there.
    pub fn navigate_to(&mut self, session: &mut Session, pos: usize) -> Vec<HeadingKey> {
        let expanded = self.reveal(session.tree(), pos);
        session.set_selection(pos..pos);
        expanded
    }
}
