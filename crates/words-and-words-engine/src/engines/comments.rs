//! Comment threads anchored by `comment` marks.
//!
//! A root comment owns a mark id in the document; replies point at their
//! root through `parent_id` and carry no mark. A root whose mark no longer
//! exists anywhere in the tree is orphaned.

use std::collections::HashSet;
use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::editing::{Cmd, Decoration, DecorationSet, EditError, Patch, Session};
use crate::model::{DocumentTree, Mark};

pub const HIGHLIGHT_CLASS: &str = "comment-highlight";
pub const ACTIVE_CLASS: &str = "comment-active";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved: bool,
    pub parent_id: Option<String>,
}

impl Comment {
    fn new(text: &str, parent_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("comment_{}", Uuid::new_v4().simple()),
            text: text.to_string(),
            created_at: now,
            updated_at: now,
            resolved: false,
            parent_id,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Whether replies may be added to a thread whose anchor text is gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyPolicy {
    #[default]
    AllowOrphaned,
    RejectOrphaned,
}

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment text is empty")]
    EmptyText,

    #[error("nothing to comment on: the range is empty and the cursor is not on a word")]
    InvalidRange,

    #[error("no comment thread with id {0}")]
    UnknownThread(String),

    #[error("no comment with id {0}")]
    UnknownComment(String),

    #[error("thread {0} has lost its anchor text")]
    OrphanedThread(String),

    #[error(transparent)]
    Edit(#[from] EditError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadStatus {
    Open,
    Orphaned,
    Resolved,
}

/// A root comment with its replies, oldest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread<'a> {
    pub root: &'a Comment,
    pub replies: Vec<&'a Comment>,
    pub status: ThreadStatus,
    /// Position of the first run carrying the thread's mark
    pub anchor: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct CommentEngine {
    comments: Vec<Comment>,
    policy: ReplyPolicy,
    active: Option<String>,
    active_decorations: DecorationSet,
    preview: DecorationSet,
}

impl CommentEngine {
    pub fn new(comments: Vec<Comment>) -> Self {
        Self {
            comments,
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ReplyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn policy(&self) -> ReplyPolicy {
        self.policy
    }

    pub fn get(&self, id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }

    fn root(&self, thread_id: &str) -> Option<&Comment> {
        self.comments
            .iter()
            .find(|c| c.id == thread_id && c.is_root())
    }

    fn root_mut(&mut self, thread_id: &str) -> Result<&mut Comment, CommentError> {
        self.comments
            .iter_mut()
            .find(|c| c.id == thread_id && c.is_root())
            .ok_or_else(|| CommentError::UnknownThread(thread_id.to_string()))
    }

    pub fn replies(&self, thread_id: &str) -> Vec<&Comment> {
        let mut replies: Vec<&Comment> = self
            .comments
            .iter()
            .filter(|c| c.parent_id.as_deref() == Some(thread_id))
            .collect();
        replies.sort_by_key(|c| c.created_at);
        replies
    }

    /// Range a new comment would cover: the selection, or the word under a
    /// collapsed cursor.
    pub fn comment_target(&self, session: &Session) -> Option<Range<usize>> {
        if session.is_collapsed() {
            session.tree().word_range_at(session.cursor())
        } else {
            Some(session.selection())
        }
    }

    pub fn can_comment(&self, session: &Session) -> bool {
        self.comment_target(session).is_some()
    }

    /// Anchor a new thread over `range`. An empty range falls back to the
    /// word at `range.start`. On success the cursor moves to the end of the
    /// commented range and the composing preview is cleared.
    pub fn add_comment(
        &mut self,
        session: &mut Session,
        range: Range<usize>,
        text: &str,
    ) -> Result<Comment, CommentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::EmptyText);
        }
        let range = if range.is_empty() {
            session
                .tree()
                .word_range_at(range.start)
                .ok_or(CommentError::InvalidRange)?
        } else {
            range
        };
        let covers_inline = session
            .tree()
            .inline_leaves()
            .any(|leaf| leaf.pos < range.end && range.start < leaf.end());
        if !covers_inline {
            return Err(CommentError::InvalidRange);
        }

        let comment = Comment::new(text, None);
        let patch = session.apply(Cmd::AddMark {
            range: range.clone(),
            mark: Mark::comment(&comment.id),
        })?;
        session.set_selection(range.end..range.end);
        self.on_patch(&patch);
        self.clear_preview();

        log::debug!("added comment {} over {range:?}", comment.id);
        self.comments.push(comment.clone());
        Ok(comment)
    }

    pub fn add_reply(
        &mut self,
        tree: &DocumentTree,
        thread_id: &str,
        text: &str,
    ) -> Result<Comment, CommentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::EmptyText);
        }
        if self.root(thread_id).is_none() {
            return Err(CommentError::UnknownThread(thread_id.to_string()));
        }
        if self.policy == ReplyPolicy::RejectOrphaned && self.is_orphaned(tree, thread_id) {
            return Err(CommentError::OrphanedThread(thread_id.to_string()));
        }
        let reply = Comment::new(text, Some(thread_id.to_string()));
        self.comments.push(reply.clone());
        Ok(reply)
    }

    /// Change the text of any comment, root or reply.
    pub fn edit(&mut self, comment_id: &str, text: &str) -> Result<(), CommentError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentError::EmptyText);
        }
        let comment = self
            .comments
            .iter_mut()
            .find(|c| c.id == comment_id)
            .ok_or_else(|| CommentError::UnknownComment(comment_id.to_string()))?;
        comment.text = text.to_string();
        comment.updated_at = Utc::now();
        Ok(())
    }

    pub fn resolve(&mut self, thread_id: &str) -> Result<(), CommentError> {
        self.set_resolved(thread_id, true)
    }

    pub fn reopen(&mut self, thread_id: &str) -> Result<(), CommentError> {
        self.set_resolved(thread_id, false)
    }

    fn set_resolved(&mut self, thread_id: &str, resolved: bool) -> Result<(), CommentError> {
        let root = self.root_mut(thread_id)?;
        root.resolved = resolved;
        root.updated_at = Utc::now();
        Ok(())
    }

    pub fn delete_reply(&mut self, reply_id: &str) -> Result<(), CommentError> {
        let before = self.comments.len();
        self.comments
            .retain(|c| !(c.id == reply_id && c.parent_id.is_some()));
        if self.comments.len() == before {
            return Err(CommentError::UnknownComment(reply_id.to_string()));
        }
        Ok(())
    }

    /// Remove a thread with its replies and strip its mark everywhere.
    pub fn delete_thread(
        &mut self,
        session: &mut Session,
        thread_id: &str,
    ) -> Result<Patch, CommentError> {
        let known = self.root(thread_id).is_some();
        if !known && session.tree().comment_runs(thread_id).is_empty() {
            return Err(CommentError::UnknownThread(thread_id.to_string()));
        }
        let patch = session.apply(Cmd::StripMark {
            mark: Mark::comment(thread_id),
        })?;
        self.comments
            .retain(|c| c.id != thread_id && c.parent_id.as_deref() != Some(thread_id));
        if self.active.as_deref() == Some(thread_id) {
            self.set_active(session.tree(), None);
        }
        self.on_patch(&patch);
        log::debug!("deleted comment thread {thread_id}");
        Ok(patch)
    }

    /// Root ids with no live mark in the tree.
    pub fn orphaned_ids(&self, tree: &DocumentTree) -> Vec<String> {
        let live: HashSet<String> = tree.comment_ids().into_iter().collect();
        self.comments
            .iter()
            .filter(|c| c.is_root() && !live.contains(&c.id))
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn is_orphaned(&self, tree: &DocumentTree, thread_id: &str) -> bool {
        tree.comment_runs(thread_id).is_empty()
    }

    /// Delete every orphaned thread and its replies in one batch. Returns the
    /// removed root ids.
    pub fn cleanup_orphaned(&mut self, tree: &DocumentTree) -> Vec<String> {
        let orphaned: HashSet<String> = self.orphaned_ids(tree).into_iter().collect();
        if orphaned.is_empty() {
            return Vec::new();
        }
        let removed: Vec<String> = self
            .comments
            .iter()
            .filter(|c| orphaned.contains(&c.id))
            .map(|c| c.id.clone())
            .collect();
        self.comments.retain(|c| {
            !orphaned.contains(&c.id)
                && !c.parent_id.as_ref().is_some_and(|p| orphaned.contains(p))
        });
        if self
            .active
            .as_ref()
            .is_some_and(|id| orphaned.contains(id))
        {
            self.active = None;
            self.active_decorations = DecorationSet::empty();
        }
        log::debug!("cleaned up {} orphaned comment threads", removed.len());
        removed
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Highlight every run carrying the thread's mark.
    pub fn set_active(&mut self, tree: &DocumentTree, thread_id: Option<&str>) {
        self.active = thread_id.map(str::to_string);
        self.active_decorations = match thread_id {
            Some(id) => tree
                .comment_runs(id)
                .into_iter()
                .map(|run| Decoration::inline(run, ACTIVE_CLASS))
                .collect(),
            None => DecorationSet::empty(),
        };
    }

    pub fn set_preview(&mut self, range: Range<usize>) {
        self.preview = if range.is_empty() {
            DecorationSet::empty()
        } else {
            DecorationSet::new([Decoration::inline(range, HIGHLIGHT_CLASS)])
        };
    }

    /// Preview whatever [`Self::add_comment`] would cover right now.
    pub fn preview_target(&mut self, session: &Session) {
        match self.comment_target(session) {
            Some(range) => self.set_preview(range),
            None => self.clear_preview(),
        }
    }

    pub fn clear_preview(&mut self) {
        self.preview = DecorationSet::empty();
    }

    /// Carry stored decorations through an edit.
    pub fn on_patch(&mut self, patch: &Patch) {
        self.preview = self.preview.map(&patch.mapping);
        self.active_decorations = self.active_decorations.map(&patch.mapping);
    }

    pub fn decorations(&self) -> DecorationSet {
        self.preview.clone().merge(self.active_decorations.clone())
    }

    /// Class string for a run carrying the given comment mark.
    pub fn mark_class(&self, comment_id: &str) -> String {
        let mut class = String::from(HIGHLIGHT_CLASS);
        if self.root(comment_id).is_some_and(|c| c.resolved) {
            class.push_str(" resolved");
        }
        if self.active.as_deref() == Some(comment_id) {
            class.push_str(" active");
        }
        class
    }

    pub fn anchor_of(&self, tree: &DocumentTree, thread_id: &str) -> Option<usize> {
        tree.comment_runs(thread_id).first().map(|run| run.start)
    }

    /// Text of every run carrying the thread's mark, concatenated.
    pub fn highlighted_text(&self, tree: &DocumentTree, thread_id: &str) -> String {
        tree.comment_runs(thread_id)
            .into_iter()
            .map(|run| tree.text_between(run, ""))
            .collect()
    }

    /// Thread clicked at a position, if any.
    pub fn comment_at(&self, tree: &DocumentTree, pos: usize) -> Option<String> {
        tree.marks_at(pos)
            .iter()
            .find_map(Mark::comment_id)
            .map(str::to_string)
    }

    /// Threads grouped for display: open threads in anchor order, then
    /// orphaned threads, then resolved threads.
    pub fn threads(&self, tree: &DocumentTree) -> Vec<Thread<'_>> {
        let mut open = Vec::new();
        let mut orphaned = Vec::new();
        let mut resolved = Vec::new();
        for root in self.comments.iter().filter(|c| c.is_root()) {
            let anchor = self.anchor_of(tree, &root.id);
            let status = match (anchor, root.resolved) {
                (None, _) => ThreadStatus::Orphaned,
                (Some(_), true) => ThreadStatus::Resolved,
                (Some(_), false) => ThreadStatus::Open,
            };
            let thread = Thread {
                root,
                replies: self.replies(&root.id),
                status,
                anchor,
            };
            match status {
                ThreadStatus::Open => open.push(thread),
                ThreadStatus::Orphaned => orphaned.push(thread),
                ThreadStatus::Resolved => resolved.push(thread),
            }
        }
        open.sort_by_key(|t| t.anchor);
        resolved.sort_by_key(|t| t.anchor);
        open.into_iter().chain(orphaned).chain(resolved).collect()
    }

    /// Thread ids reachable by keyboard navigation in the comment list.
    pub fn navigable_thread_ids(&self, tree: &DocumentTree, show_resolved: bool) -> Vec<String> {
        self.threads(tree)
            .into_iter()
            .filter(|t| show_resolved || t.status != ThreadStatus::Resolved)
            .map(|t| t.root.id.clone())
            .collect()
    }

    pub fn into_comments(self) -> Vec<Comment> {
        self.comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use pretty_assertions::assert_eq;

    fn session(text: &str) -> Session {
        Session::new(DocumentTree::new(vec![Node::paragraph(vec![Node::text(
            text,
        )])]))
    }

    #[test]
    fn test_add_comment_marks_range_and_moves_cursor() {
        let mut session = session("hello world");
        let mut engine = CommentEngine::default();
        engine.set_preview(1..6);

        let comment = engine.add_comment(&mut session, 1..6, "  nice  ").unwrap();

        assert_eq!(comment.text, "nice");
        assert!(comment.id.starts_with("comment_"));
        assert_eq!(session.tree().comment_runs(&comment.id), vec![1..6]);
        assert_eq!(session.selection(), 6..6);
        assert!(engine.decorations().is_empty());
    }

    #[test]
    fn test_collapsed_range_falls_back_to_word() {
        let mut session = session("hello world");
        let mut engine = CommentEngine::default();
        let comment = engine.add_comment(&mut session, 9..9, "x").unwrap();
        assert_eq!(engine.highlighted_text(session.tree(), &comment.id), "world");
    }

    #[test]
    fn test_no_word_is_invalid_range() {
        let mut session = session("a   b");
        let mut engine = CommentEngine::default();
        let err = engine.add_comment(&mut session, 3..3, "x").unwrap_err();
        assert!(matches!(err, CommentError::InvalidRange));
        assert!(engine.comments().is_empty());
        assert!(session.tree().comment_ids().is_empty());
    }

    #[test]
    fn test_empty_text_rejected() {
        let mut session = session("hello");
        let mut engine = CommentEngine::default();
        assert!(matches!(
            engine.add_comment(&mut session, 1..3, "   "),
            Err(CommentError::EmptyText)
        ));
    }

    #[test]
    fn test_overlapping_threads_keep_both_marks() {
        let mut session = session("abcdef");
        let mut engine = CommentEngine::default();
        let first = engine.add_comment(&mut session, 1..5, "one").unwrap();
        let second = engine.add_comment(&mut session, 3..7, "two").unwrap();

        assert_eq!(engine.highlighted_text(session.tree(), &first.id), "abcd");
        assert_eq!(engine.highlighted_text(session.tree(), &second.id), "cdef");
    }

    #[test]
    fn test_class_reflects_resolved_and_active() {
        let mut session = session("hello");
        let mut engine = CommentEngine::default();
        let c = engine.add_comment(&mut session, 1..6, "x").unwrap();
        assert_eq!(engine.mark_class(&c.id), "comment-highlight");

        engine.resolve(&c.id).unwrap();
        engine.set_active(session.tree(), Some(c.id.as_str()));
        assert_eq!(engine.mark_class(&c.id), "comment-highlight resolved active");

        engine.reopen(&c.id).unwrap();
        assert_eq!(engine.mark_class(&c.id), "comment-highlight active");
    }

    #[test]
    fn test_active_decoration_follows_edits() {
        let mut session = session("hello world");
        let mut engine = CommentEngine::default();
        let c = engine.add_comment(&mut session, 7..12, "x").unwrap();
        engine.set_active(session.tree(), Some(c.id.as_str()));

        let patch = session
            .apply(Cmd::InsertText {
                at: 1,
                text: ">> ".into(),
            })
            .unwrap();
        engine.on_patch(&patch);

        let ranges: Vec<Range<usize>> = engine.decorations().iter().map(|d| d.range()).collect();
        assert_eq!(ranges, vec![10..15]);
        assert_eq!(session.tree().text_between(10..15, ""), "world");
    }

    #[test]
    fn test_delete_thread_strips_marks_and_replies() {
        let mut session = session("hello");
        let mut engine = CommentEngine::default();
        let c = engine.add_comment(&mut session, 1..6, "x").unwrap();
        engine.add_reply(session.tree(), &c.id, "reply").unwrap();

        engine.delete_thread(&mut session, &c.id).unwrap();
        assert!(engine.comments().is_empty());
        assert!(session.tree().comment_ids().is_empty());
    }

    #[test]
    fn test_reply_to_unknown_thread() {
        let session = session("hello");
        let mut engine = CommentEngine::default();
        assert!(matches!(
            engine.add_reply(session.tree(), "nope", "x"),
            Err(CommentError::UnknownThread(_))
        ));
    }

    #[test]
    fn test_edit_and_delete_reply() {
        let mut session = session("hello");
        let mut engine = CommentEngine::default();
        let c = engine.add_comment(&mut session, 1..6, "x").unwrap();
        let reply = engine.add_reply(session.tree(), &c.id, "first").unwrap();

        engine.edit(&reply.id, "changed").unwrap();
        assert_eq!(engine.get(&reply.id).unwrap().text, "changed");

        engine.delete_reply(&reply.id).unwrap();
        assert!(engine.replies(&c.id).is_empty());
        assert!(matches!(
            engine.delete_reply(&c.id),
            Err(CommentError::UnknownComment(_))
        ));
    }

    #[test]
    fn test_thread_order_open_orphaned_resolved() {
        let mut session = session("one two three");
        let mut engine = CommentEngine::default();
        let late = engine.add_comment(&mut session, 9..14, "three").unwrap();
        let early = engine.add_comment(&mut session, 1..4, "one").unwrap();
        let done = engine.add_comment(&mut session, 5..8, "two").unwrap();
        engine.resolve(&done.id).unwrap();
        let gone = Comment::new("gone", None);
        engine.comments.push(gone.clone());

        let order: Vec<&str> = engine
            .threads(session.tree())
            .iter()
            .map(|t| t.root.id.as_str())
            .collect();
        assert_eq!(
            order,
            vec![
                early.id.as_str(),
                late.id.as_str(),
                gone.id.as_str(),
                done.id.as_str()
            ]
        );
        assert_eq!(engine.navigable_thread_ids(session.tree(), false).len(), 3);
    }

    #[test]
    fn test_comment_at_click_position() {
        let mut session = session("hello world");
        let mut engine = CommentEngine::default();
        let c = engine.add_comment(&mut session, 1..6, "x").unwrap();
        assert_eq!(engine.comment_at(session.tree(), 3), Some(c.id));
        assert_eq!(engine.comment_at(session.tree(), 9), None);
    }
}
