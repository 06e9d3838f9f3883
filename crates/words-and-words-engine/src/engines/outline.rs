use crate::model::{BlockKind, DocumentTree, Node};

const UNTITLED: &str = "Untitled";

/// One line of the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    /// 0 for the document title, otherwise the heading level
    pub level: u8,
    pub text: String,
    pub pos: usize,
    /// Rank among headings, matching the collapse key index. `None` for the title.
    pub heading_index: Option<usize>,
}

impl OutlineEntry {
    pub fn is_title(&self) -> bool {
        self.heading_index.is_none()
    }

    /// Where the cursor goes when the entry is selected
    pub fn jump_target(&self) -> usize {
        self.pos + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outline {
    pub entries: Vec<OutlineEntry>,
    /// Position of the nearest entry at or before the cursor
    pub active: Option<usize>,
}

pub fn outline(tree: &DocumentTree, cursor: usize) -> Outline {
    let mut entries = Vec::new();
    let mut heading_index = 0;
    for p in tree.descendants() {
        let Node::Block(block) = p.node else {
            continue;
        };
        match block.kind {
            BlockKind::Title => {
                let text = block.text_content();
                entries.push(OutlineEntry {
                    level: 0,
                    text: if text.is_empty() {
                        UNTITLED.to_string()
                    } else {
                        text
                    },
                    pos: p.pos,
                    heading_index: None,
                });
            }
            BlockKind::Heading { level } => {
                entries.push(OutlineEntry {
                    level,
                    text: block.text_content(),
                    pos: p.pos,
                    heading_index: Some(heading_index),
                });
                heading_index += 1;
            }
            _ => {}
        }
    }
    let active = entries
        .iter()
        .rev()
        .find(|e| e.pos <= cursor)
        .map(|e| e.pos);
    Outline { entries, active }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outline_lists_title_and_headings() {
        let tree = DocumentTree::new(vec![
            Node::block(BlockKind::Title, vec![]),
            Node::heading(1, vec![Node::text("Intro")]),
            Node::paragraph(vec![Node::text("body")]),
            Node::heading(2, vec![Node::text("Details")]),
        ]);
        let outline = outline(&tree, 12);

        let summary: Vec<(u8, &str, Option<usize>)> = outline
            .entries
            .iter()
            .map(|e| (e.level, e.text.as_str(), e.heading_index))
            .collect();
        assert_eq!(
            summary,
            vec![(0, "Untitled", None), (1, "Intro", Some(0)), (2, "Details", Some(1))]
        );
        assert_eq!(outline.active, Some(2));
    }

    #[test]
    fn test_no_active_entry_before_first_heading() {
        let tree = DocumentTree::new(vec![
            Node::paragraph(vec![Node::text("x")]),
            Node::heading(1, vec![Node::text("H")]),
        ]);
        assert_eq!(outline(&tree, 1).active, None);
    }
}
