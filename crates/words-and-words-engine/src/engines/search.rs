use std::ops::Range;

use regex::{Regex, RegexBuilder};

use crate::editing::{Cmd, Decoration, DecorationSet, EditError, Patch, Session};
use crate::model::DocumentTree;

pub const MATCH_CLASS: &str = "search-match";
pub const CURRENT_MATCH_CLASS: &str = "search-match search-match-current";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub from: usize,
    pub to: usize,
}

impl SearchMatch {
    pub fn range(&self) -> Range<usize> {
        self.from..self.to
    }
}

fn build_pattern(term: &str, match_case: bool) -> Option<Regex> {
    if term.is_empty() {
        return None;
    }
    match RegexBuilder::new(&regex::escape(term))
        .case_insensitive(!match_case)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(err) => {
            log::warn!("search term could not be compiled: {err}");
            None
        }
    }
}

/// Every occurrence of `term` as a literal string, scanning text runs in
/// document order. Matches never span two runs.
pub fn find_matches<'a>(
    tree: &'a DocumentTree,
    term: &str,
    match_case: bool,
) -> impl Iterator<Item = SearchMatch> + 'a {
    let pattern = build_pattern(term, match_case);
    tree.text_runs().flat_map(move |(pos, run)| {
        let Some(pattern) = &pattern else {
            return Vec::new();
        };
        let mut chars = 0;
        let mut last_byte = 0;
        pattern
            .find_iter(&run.text)
            .map(|found| {
                chars += run.text[last_byte..found.start()].chars().count();
                let len = found.as_str().chars().count();
                let from = pos + chars;
                chars += len;
                last_byte = found.end();
                SearchMatch {
                    from,
                    to: from + len,
                }
            })
            .collect()
    })
}

/// Find and replace over the live document.
///
/// Matches are recomputed from the tree on every [`SearchEngine::refresh`]
/// and before every replacement, never trusted from an earlier scan.
#[derive(Debug, Clone, Default)]
pub struct SearchEngine {
    term: String,
    match_case: bool,
    matches: Vec<SearchMatch>,
    current_index: Option<usize>,
}

impl SearchEngine {
    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn match_case(&self) -> bool {
        self.match_case
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    /// `None` until the first explicit navigation.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn current_match(&self) -> Option<SearchMatch> {
        self.current_index.and_then(|i| self.matches.get(i).copied())
    }

    fn scan(&self, tree: &DocumentTree) -> Vec<SearchMatch> {
        find_matches(tree, &self.term, self.match_case).collect()
    }

    pub fn set_search_term(&mut self, tree: &DocumentTree, term: &str, match_case: bool) {
        self.term = term.to_string();
        self.match_case = match_case;
        self.matches = self.scan(tree);
        self.current_index = None;
        log::debug!("search {term:?}: {} matches", self.matches.len());
    }

    pub fn clear(&mut self) {
        self.term.clear();
        self.matches.clear();
        self.current_index = None;
    }

    /// Recompute against the current document, clamping the current index.
    pub fn refresh(&mut self, tree: &DocumentTree) {
        self.matches = self.scan(tree);
        self.clamp_index();
    }

    fn clamp_index(&mut self) {
        if let Some(index) = self.current_index
            && index >= self.matches.len()
        {
            self.current_index = (!self.matches.is_empty()).then_some(0);
        }
    }

    /// Advance cyclically. Returns the match to scroll to.
    pub fn next(&mut self) -> Option<SearchMatch> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let index = self.current_index.map_or(0, |i| (i + 1) % len);
        self.current_index = Some(index);
        self.matches.get(index).copied()
    }

    pub fn previous(&mut self) -> Option<SearchMatch> {
        let len = self.matches.len();
        if len == 0 {
            return None;
        }
        let index = match self.current_index {
            None | Some(0) => len - 1,
            Some(i) => i - 1,
        };
        self.current_index = Some(index);
        self.matches.get(index).copied()
    }

    /// Replace the current match. Returns `Ok(None)` when there is nothing to
    /// replace at the current index.
    pub fn replace_current(
        &mut self,
        session: &mut Session,
        replacement: &str,
    ) -> Result<Option<Patch>, EditError> {
        let fresh = self.scan(session.tree());
        let Some(target) = self.current_index.and_then(|i| fresh.get(i).copied()) else {
            self.matches = fresh;
            self.clamp_index();
            return Ok(None);
        };
        let patch = session.apply(Cmd::ReplaceRange {
            range: target.range(),
            text: replacement.to_string(),
        })?;
        self.refresh(session.tree());
        Ok(Some(patch))
    }

    /// Replace every match in one transaction, back to front. The match list
    /// is cleared afterwards; the term is kept.
    pub fn replace_all(
        &mut self,
        session: &mut Session,
        replacement: &str,
    ) -> Result<Option<Patch>, EditError> {
        let fresh = self.scan(session.tree());
        if fresh.is_empty() {
            self.matches.clear();
            self.current_index = None;
            return Ok(None);
        }
        let count = fresh.len();
        let patch = session.apply_all(fresh.into_iter().rev().map(|m| Cmd::ReplaceRange {
            range: m.range(),
            text: replacement.to_string(),
        }))?;
        self.matches.clear();
        self.current_index = None;
        log::debug!("replaced {count} matches of {:?}", self.term);
        Ok(Some(patch))
    }

    pub fn decorations(&self) -> DecorationSet {
        self.matches
            .iter()
            .enumerate()
            .map(|(index, m)| {
                let class = if Some(index) == self.current_index {
                    CURRENT_MATCH_CLASS
                } else {
                    MATCH_CLASS
                };
                Decoration::inline(m.range(), class)
            })
            .collect()
    }
}
