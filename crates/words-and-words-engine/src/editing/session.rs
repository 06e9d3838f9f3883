use std::ops::Range;

use crate::editing::commands;
use crate::editing::{Assoc, Cmd, EditError, Mapping, Patch};
use crate::model::DocumentTree;

/// The live editing session: the document tree, the selection and a version
/// counter. Engines receive it by reference; only [`Session::apply`] and
/// [`Session::apply_all`] mutate the tree.
#[derive(Debug, Clone)]
pub struct Session {
    tree: DocumentTree,
    selection: Range<usize>,
    version: u64,
}

impl Session {
    /// Start a session with the cursor at the start of the first textblock.
    pub fn new(tree: DocumentTree) -> Self {
        let start = tree
            .textblocks()
            .first()
            .map(|loc| loc.content.start)
            .unwrap_or(0);
        Self {
            tree,
            selection: start..start,
            version: 0,
        }
    }

    pub fn tree(&self) -> &DocumentTree {
        &self.tree
    }

    pub fn into_tree(self) -> DocumentTree {
        self.tree
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Head of the selection
    pub fn cursor(&self) -> usize {
        self.selection.end
    }

    pub fn is_collapsed(&self) -> bool {
        self.selection.is_empty()
    }

    /// Set the selection, clamped to the document. A reversed range is
    /// normalized.
    pub fn set_selection(&mut self, selection: Range<usize>) {
        let size = self.tree.content_size();
        let from = selection.start.min(selection.end).min(size);
        let to = selection.start.max(selection.end).min(size);
        self.selection = from..to;
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        self.apply_all([cmd])
    }

    /// Apply commands as one transaction. Each command sees the document as
    /// left by the previous one. On error the document is left untouched.
    pub fn apply_all(&mut self, cmds: impl IntoIterator<Item = Cmd>) -> Result<Patch, EditError> {
        let cmds: Vec<Cmd> = cmds.into_iter().collect();
        let backup = (cmds.len() > 1).then(|| self.tree.clone());

        let mut mapping = Mapping::new();
        let mut changed: Vec<Range<usize>> = Vec::new();
        for cmd in &cmds {
            let outcome = match commands::apply(&mut self.tree, cmd) {
                Ok(outcome) => outcome,
                Err(err) => {
                    if let Some(tree) = backup {
                        self.tree = tree;
                    }
                    log::debug!("rejected {cmd:?}: {err}");
                    return Err(err);
                }
            };
            changed = changed
                .into_iter()
                .map(|r| {
                    outcome.mapping.map(r.start, Assoc::Before)
                        ..outcome.mapping.map(r.end, Assoc::After)
                })
                .collect();
            changed.extend(outcome.changed);
            mapping.append(outcome.mapping);
        }

        self.selection = if self.selection.is_empty() {
            let at = mapping.map(self.selection.start, Assoc::After);
            at..at
        } else {
            let from = mapping.map(self.selection.start, Assoc::After);
            let to = mapping.map(self.selection.end, Assoc::Before).max(from);
            from..to
        };
        self.version += 1;

        Ok(Patch {
            changed,
            mapping,
            new_selection: self.selection.clone(),
            version: self.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mark, Node};
    use pretty_assertions::assert_eq;

    fn session(text: &str) -> Session {
        Session::new(DocumentTree::new(vec![Node::paragraph(vec![Node::text(
            text,
        )])]))
    }

    #[test]
    fn test_typing_moves_cursor() {
        let mut session = session("ab");
        session.set_selection(2..2);
        let patch = session
            .apply(Cmd::InsertText {
                at: 2,
                text: "xyz".into(),
            })
            .unwrap();

        assert_eq!(patch.new_selection, 5..5);
        assert_eq!(patch.version, 1);
        assert_eq!(session.tree().text(), "axyzb");
    }

    #[test]
    fn test_apply_all_is_atomic() {
        let mut session = session("hello");
        let before = session.tree().clone();
        let result = session.apply_all([
            Cmd::AddMark {
                range: 1..3,
                mark: Mark::Bold,
            },
            Cmd::InsertText {
                at: 99,
                text: "x".into(),
            },
        ]);

        assert!(result.is_err());
        assert_eq!(session.tree(), &before);
        assert_eq!(session.version(), 0);
    }

    #[test]
    fn test_apply_all_composes_mapping() {
        let mut session = session("one two three");
        // replace back to front so earlier positions stay valid
        let patch = session
            .apply_all([
                Cmd::ReplaceRange {
                    range: 9..14,
                    text: "3".into(),
                },
                Cmd::ReplaceRange {
                    range: 1..4,
                    text: "1".into(),
                },
            ])
            .unwrap();

        assert_eq!(session.tree().text(), "1 two 3");
        assert_eq!(patch.mapping.map(5, Assoc::After), 3);
        assert_eq!(patch.changed, vec![7..8, 1..2]);
    }

    #[test]
    fn test_selection_is_clamped() {
        let mut session = session("ab");
        session.set_selection(10..1);
        assert_eq!(session.selection(), 1..4);
    }
}
