//! One open document: the editing session plus every engine layered on it.
//!
//! The engines never see each other. [`Editor`] forwards each change to the
//! ones that hold positions, so comment highlights follow the text, search
//! results stay current and decorations can be merged for display.

use std::ops::Range;

use crate::editing::{Cmd, DecorationSet, EditError, Patch, Session};
use crate::engines::{
    CollapseEngine, Comment, CommentEngine, CommentError, HeadingKey, Outline, ReplyPolicy,
    SearchEngine, SearchMatch, Variable, VariableEngine, VariableError, outline,
};
use crate::export::{ExportError, ExportedFile, FontFamily, export_to_word};
use crate::markup::{ViewContext, render, render_view, to_tree};
use crate::model::DocumentTree;
use crate::storage::{Document, DocumentUpdate};

/// Per-user behaviour switches, usually read from settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorOptions {
    pub reply_policy: ReplyPolicy,
    pub always_show_collapse_toggle: bool,
}

#[derive(Debug, Clone)]
pub struct Editor {
    id: String,
    title: String,
    font: FontFamily,
    session: Session,
    comments: CommentEngine,
    search: SearchEngine,
    collapse: CollapseEngine,
    variables: VariableEngine,
    dirty: bool,
}

impl Editor {
    pub fn open(doc: &Document, options: EditorOptions) -> Self {
        let tree = to_tree(&doc.content);
        log::debug!(
            "opened {} ({} positions, {} comments)",
            doc.id,
            tree.content_size(),
            doc.comments.len()
        );
        Self {
            id: doc.id.clone(),
            title: doc.title.clone(),
            font: doc.font,
            session: Session::new(tree),
            comments: CommentEngine::new(doc.comments.clone()).with_policy(options.reply_policy),
            search: SearchEngine::default(),
            collapse: CollapseEngine::new(options.always_show_collapse_toggle),
            variables: VariableEngine::new(doc.variables.clone()),
            dirty: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn font(&self) -> FontFamily {
        self.font
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tree(&self) -> &DocumentTree {
        self.session.tree()
    }

    pub fn comments(&self) -> &CommentEngine {
        &self.comments
    }

    pub fn search(&self) -> &SearchEngine {
        &self.search
    }

    pub fn collapse(&self) -> &CollapseEngine {
        &self.collapse
    }

    pub fn variables(&self) -> &VariableEngine {
        &self.variables
    }

    /// Whether anything changed since the last [`Editor::to_update`].
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.dirty = true;
    }

    pub fn set_font(&mut self, font: FontFamily) {
        self.font = font;
        self.dirty = true;
    }

    pub fn set_selection(&mut self, selection: Range<usize>) {
        self.session.set_selection(selection);
    }

    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        let patch = self.session.apply(cmd)?;
        self.observe(&patch);
        Ok(patch)
    }

    pub fn apply_all(&mut self, cmds: impl IntoIterator<Item = Cmd>) -> Result<Patch, EditError> {
        let patch = self.session.apply_all(cmds)?;
        self.observe(&patch);
        Ok(patch)
    }

    /// Carry engine state across a change made outside the engines.
    fn observe(&mut self, patch: &Patch) {
        self.comments.on_patch(patch);
        self.search.refresh(self.session.tree());
        self.dirty = true;
    }

    /// Refresh after an engine applied its own change. The engine that made
    /// it has already remapped itself.
    fn after_engine_edit(&mut self, refresh_search: bool) {
        if refresh_search {
            self.search.refresh(self.session.tree());
        }
        self.dirty = true;
    }

    // Comments

    /// Comment on the selection, or the word under the cursor.
    pub fn add_comment(&mut self, text: &str) -> Result<Comment, CommentError> {
        let range = self.session.selection();
        let comment = self.comments.add_comment(&mut self.session, range, text)?;
        self.after_engine_edit(true);
        Ok(comment)
    }

    pub fn reply(&mut self, thread_id: &str, text: &str) -> Result<Comment, CommentError> {
        let reply = self.comments.add_reply(self.session.tree(), thread_id, text)?;
        self.dirty = true;
        Ok(reply)
    }

    pub fn edit_comment(&mut self, comment_id: &str, text: &str) -> Result<(), CommentError> {
        self.comments.edit(comment_id, text)?;
        self.dirty = true;
        Ok(())
    }

    pub fn resolve_thread(&mut self, thread_id: &str) -> Result<(), CommentError> {
        self.comments.resolve(thread_id)?;
        self.dirty = true;
        Ok(())
    }

    pub fn reopen_thread(&mut self, thread_id: &str) -> Result<(), CommentError> {
        self.comments.reopen(thread_id)?;
        self.dirty = true;
        Ok(())
    }

    pub fn delete_reply(&mut self, reply_id: &str) -> Result<(), CommentError> {
        self.comments.delete_reply(reply_id)?;
        self.dirty = true;
        Ok(())
    }

    pub fn delete_thread(&mut self, thread_id: &str) -> Result<Patch, CommentError> {
        let patch = self.comments.delete_thread(&mut self.session, thread_id)?;
        self.after_engine_edit(true);
        Ok(patch)
    }

    /// Drop threads whose anchor text is gone. Returns the removed root ids.
    pub fn cleanup_orphaned_comments(&mut self) -> Vec<String> {
        let removed = self.comments.cleanup_orphaned(self.session.tree());
        if !removed.is_empty() {
            self.dirty = true;
        }
        removed
    }

    /// Highlight a thread and move the cursor to its anchor, expanding any
    /// collapsed section hiding it.
    pub fn focus_thread(&mut self, thread_id: Option<&str>) {
        self.comments.set_active(self.session.tree(), thread_id);
        if let Some(anchor) = thread_id.and_then(|id| self.comments.anchor_of(self.session.tree(), id))
        {
            self.collapse.navigate_to(&mut self.session, anchor);
        }
    }

    /// Show where a comment would land before it is written.
    pub fn preview_comment_target(&mut self) {
        self.comments.preview_target(&self.session);
    }

    pub fn clear_comment_preview(&mut self) {
        self.comments.clear_preview();
    }

    // Search

    pub fn set_search_term(&mut self, term: &str, match_case: bool) {
        self.search
            .set_search_term(self.session.tree(), term, match_case);
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    /// Step to the next match, select it and reveal it.
    pub fn find_next(&mut self) -> Option<SearchMatch> {
        let found = self.search.next()?;
        self.select_match(found);
        Some(found)
    }

    pub fn find_previous(&mut self) -> Option<SearchMatch> {
        let found = self.search.previous()?;
        self.select_match(found);
        Some(found)
    }

    fn select_match(&mut self, found: SearchMatch) {
        self.collapse.reveal(self.session.tree(), found.from);
        self.session.set_selection(found.range());
    }

    pub fn replace_current(&mut self, replacement: &str) -> Result<Option<Patch>, EditError> {
        let patch = self.search.replace_current(&mut self.session, replacement)?;
        if let Some(patch) = &patch {
            self.comments.on_patch(patch);
            self.after_engine_edit(false);
        }
        Ok(patch)
    }

    pub fn replace_all(&mut self, replacement: &str) -> Result<Option<Patch>, EditError> {
        let patch = self.search.replace_all(&mut self.session, replacement)?;
        if let Some(patch) = &patch {
            self.comments.on_patch(patch);
            self.after_engine_edit(false);
        }
        Ok(patch)
    }

    // Collapsible sections

    pub fn toggle_section(&mut self, key: &HeadingKey) -> bool {
        self.collapse.toggle(key)
    }

    pub fn toggle_current_section(&mut self) -> Option<bool> {
        self.collapse.toggle_current_section(&mut self.session)
    }

    pub fn expand_all_sections(&mut self) {
        self.collapse.expand_all();
    }

    /// Move the cursor to `pos`, expanding every section that hides it.
    pub fn navigate_to(&mut self, pos: usize) -> Vec<HeadingKey> {
        self.collapse.navigate_to(&mut self.session, pos)
    }

    // Variables

    pub fn create_variable(&mut self, name: &str, value: &str) -> Result<Variable, VariableError> {
        let variable = self.variables.create(name, value)?;
        self.dirty = true;
        Ok(variable)
    }

    pub fn update_variable(&mut self, id: &str, value: &str) -> Result<(), VariableError> {
        self.variables.update_value(id, value)?;
        self.dirty = true;
        Ok(())
    }

    pub fn rename_variable(&mut self, id: &str, name: &str) -> Result<(), VariableError> {
        self.variables.rename(id, name)?;
        self.dirty = true;
        Ok(())
    }

    pub fn remove_variable(&mut self, id: &str) -> Result<Variable, VariableError> {
        let removed = self.variables.remove(id)?;
        self.dirty = true;
        Ok(removed)
    }

    pub fn insert_variable(&mut self, id: &str) -> Result<Patch, VariableError> {
        let patch = self.variables.insert(&mut self.session, id)?;
        self.observe(&patch);
        Ok(patch)
    }

    // Presentation

    /// Comment, search and collapse decorations in one set.
    pub fn decorations(&self) -> DecorationSet {
        self.comments
            .decorations()
            .merge(self.search.decorations())
            .merge(self.collapse.decorations(self.session.tree()))
    }

    pub fn outline(&self) -> Outline {
        outline(self.session.tree(), self.session.cursor())
    }

    /// Display markup with variables resolved and comment states applied.
    pub fn render_view(&self) -> String {
        render_view(
            self.session.tree(),
            ViewContext {
                variables: self.variables.variables(),
                comments: Some(&self.comments),
            },
        )
    }

    pub fn word_count(&self) -> usize {
        self.session.tree().word_count()
    }

    pub fn char_count(&self) -> usize {
        self.session.tree().char_count()
    }

    // Persistence

    /// Markup to persist.
    pub fn content(&self) -> String {
        render(self.session.tree())
    }

    /// Everything needed to save the document, clearing the dirty flag.
    pub fn to_update(&mut self) -> DocumentUpdate {
        self.dirty = false;
        DocumentUpdate {
            title: Some(self.title.clone()),
            content: Some(self.content()),
            font: Some(self.font),
            variables: Some(self.variables.variables().to_vec()),
            comments: Some(self.comments.comments().to_vec()),
        }
    }

    pub fn export(&self) -> Result<ExportedFile, ExportError> {
        export_to_word(
            &self.content(),
            &self.title,
            self.font,
            self.variables.variables(),
        )
    }
}
