use serde::{Deserialize, Serialize};

use crate::model::Mark;

/// Paragraph-level text alignment read from (and written to) `text-align`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "left" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" => Some(Alignment::Right),
            "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

/// Block node types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    Title,
    Subtitle,
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    CodeBlock { language: Option<String> },
    Table,
    TableRow,
    TableCell,
    TableHeader,
    Image { src: String, alt: Option<String> },
}

impl BlockKind {
    /// Textblocks hold inline content (text runs and inline atoms).
    pub fn is_textblock(&self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph
                | BlockKind::Heading { .. }
                | BlockKind::Title
                | BlockKind::Subtitle
                | BlockKind::CodeBlock { .. }
        )
    }

    /// Leaf blocks have no content and occupy a single position.
    pub fn is_leaf(&self) -> bool {
        matches!(self, BlockKind::Image { .. })
    }

    pub fn is_heading(&self) -> bool {
        matches!(self, BlockKind::Heading { .. })
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockKind::Heading { level } => Some(*level),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Alignment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Block {
    pub fn new(kind: BlockKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            align: None,
            children,
        }
    }

    pub fn aligned(mut self, align: Alignment) -> Self {
        self.align = Some(align);
        self
    }

    pub fn content_size(&self) -> usize {
        self.children.iter().map(Node::size).sum()
    }

    /// Concatenated text of all descendant text runs (atoms contribute nothing)
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&text.text),
            Node::Block(block) => collect_text(&block.children, out),
            Node::Variable(_) | Node::HardBreak => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Text {
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_comment(&self, comment_id: &str) -> bool {
        self.marks.iter().any(|m| m.comment_id() == Some(comment_id))
    }
}

/// Atomic inline reference to a named variable. Only the id is stored; the
/// displayed value is resolved at render time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableRef {
    pub variable_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "camelCase")]
pub enum Node {
    Block(Block),
    Text(Text),
    Variable(VariableRef),
    HardBreak,
}

impl Node {
    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Block(Block::new(BlockKind::Paragraph, children))
    }

    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Node::Block(Block::new(BlockKind::Heading { level }, children))
    }

    pub fn block(kind: BlockKind, children: Vec<Node>) -> Self {
        Node::Block(Block::new(kind, children))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(Text {
            text: text.into(),
            marks: crate::model::mark::normalize_set(marks),
        })
    }

    pub fn variable(variable_id: impl Into<String>) -> Self {
        Node::Variable(VariableRef {
            variable_id: variable_id.into(),
            marks: Vec::new(),
        })
    }

    /// Number of positions this node occupies in the flattened document.
    pub fn size(&self) -> usize {
        match self {
            Node::Text(text) => text.len(),
            Node::Variable(_) | Node::HardBreak => 1,
            Node::Block(block) if block.kind.is_leaf() => 1,
            Node::Block(block) => block.content_size() + 2,
        }
    }

    pub fn is_inline(&self) -> bool {
        !matches!(self, Node::Block(_))
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Node::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn marks(&self) -> &[Mark] {
        match self {
            Node::Text(text) => &text.marks,
            Node::Variable(var) => &var.marks,
            Node::Block(_) | Node::HardBreak => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_follow_token_model() {
        let para = Node::paragraph(vec![Node::text("héllo"), Node::variable("v1")]);
        assert_eq!(para.size(), 2 + 5 + 1);

        let image = Node::block(
            BlockKind::Image {
                src: "a.png".into(),
                alt: None,
            },
            vec![],
        );
        assert_eq!(image.size(), 1);

        let list = Node::block(
            BlockKind::BulletList,
            vec![Node::block(BlockKind::ListItem, vec![para])],
        );
        assert_eq!(list.size(), 2 + 2 + 8);
    }

    #[test]
    fn text_content_skips_atoms() {
        let block = Block::new(
            BlockKind::Paragraph,
            vec![Node::text("a"), Node::variable("v"), Node::text("b")],
        );
        assert_eq!(block.text_content(), "ab");
    }

    #[test]
    fn alignment_parse() {
        assert_eq!(Alignment::parse(" center "), Some(Alignment::Center));
        assert_eq!(Alignment::parse("middle"), None);
    }
}
