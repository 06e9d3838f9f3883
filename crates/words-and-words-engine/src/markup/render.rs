//! [`DocumentTree`] to markup.
//!
//! [`render`] writes the persisted form: tags and attributes the editor's own
//! parser reads back. [`render_view`] writes what the presentation layer
//! displays, with variable values and comment states filled in.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::engines::comments::{CommentEngine, HIGHLIGHT_CLASS};
use crate::engines::variables::{VARIABLE_CLASS, Variable, resolve};
use crate::model::{Alignment, Block, BlockKind, DocumentTree, Mark, Node};

const LINK_ATTRS: &str = r#"target="_blank" rel="noopener noreferrer nofollow""#;

/// Serialize the tree for storage.
pub fn render(tree: &DocumentTree) -> String {
    Renderer { view: None }.document(tree)
}

/// What live rendering resolves against.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub variables: &'a [Variable],
    pub comments: Option<&'a CommentEngine>,
}

/// Serialize the tree for display, resolving variables and comment classes.
pub fn render_view(tree: &DocumentTree, view: ViewContext<'_>) -> String {
    Renderer { view: Some(view) }.document(tree)
}

struct Renderer<'a> {
    view: Option<ViewContext<'a>>,
}

fn align_attr(align: Option<Alignment>) -> String {
    match align {
        Some(align) if align != Alignment::Left => {
            format!(r#" style="text-align: {}""#, align.as_str())
        }
        _ => String::new(),
    }
}

fn close_mark(mark: &Mark) -> &'static str {
    match mark {
        Mark::Link { .. } => "</a>",
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Underline => "</u>",
        Mark::Strike => "</s>",
        Mark::Code => "</code>",
        Mark::TextStyle { .. } | Mark::Comment { .. } => "</span>",
    }
}

impl Renderer<'_> {
    fn document(&self, tree: &DocumentTree) -> String {
        let mut out = String::new();
        self.blocks(tree.blocks(), &mut out);
        out
    }

    fn blocks(&self, nodes: &[Node], out: &mut String) {
        for node in nodes {
            if let Node::Block(block) = node {
                self.block(block, out);
            }
        }
    }

    fn block(&self, block: &Block, out: &mut String) {
        match &block.kind {
            BlockKind::Paragraph => {
                out.push_str(&format!("<p{}>", align_attr(block.align)));
                self.inline(&block.children, out);
                out.push_str("</p>");
            }
            BlockKind::Heading { level } => {
                out.push_str(&format!("<h{level}{}>", align_attr(block.align)));
                self.inline(&block.children, out);
                out.push_str(&format!("</h{level}>"));
            }
            BlockKind::Title => {
                out.push_str(r#"<div data-type="title" class="document-title">"#);
                self.inline(&block.children, out);
                out.push_str("</div>");
            }
            BlockKind::Subtitle => {
                out.push_str(r#"<div data-type="subtitle" class="document-subtitle">"#);
                self.inline(&block.children, out);
                out.push_str("</div>");
            }
            BlockKind::CodeBlock { language } => {
                match language {
                    Some(lang) => out.push_str(&format!(
                        r#"<pre><code class="language-{}">"#,
                        encode_double_quoted_attribute(lang)
                    )),
                    None => out.push_str("<pre><code>"),
                }
                out.push_str(&encode_text(&block.text_content()));
                out.push_str("</code></pre>");
            }
            BlockKind::Image { src, alt } => {
                out.push_str(&format!(
                    r#"<img src="{}""#,
                    encode_double_quoted_attribute(src)
                ));
                if let Some(alt) = alt {
                    out.push_str(&format!(r#" alt="{}""#, encode_double_quoted_attribute(alt)));
                }
                out.push('>');
            }
            BlockKind::Table => {
                out.push_str("<table><tbody>");
                self.blocks(&block.children, out);
                out.push_str("</tbody></table>");
            }
            BlockKind::TableCell | BlockKind::TableHeader => {
                let tag = if block.kind == BlockKind::TableHeader {
                    "th"
                } else {
                    "td"
                };
                out.push_str(&format!(r#"<{tag} colspan="1" rowspan="1">"#));
                self.blocks(&block.children, out);
                out.push_str(&format!("</{tag}>"));
            }
            kind => {
                let tag = match kind {
                    BlockKind::BulletList => "ul",
                    BlockKind::OrderedList => "ol",
                    BlockKind::ListItem => "li",
                    BlockKind::TableRow => "tr",
                    _ => "blockquote",
                };
                out.push_str(&format!("<{tag}>"));
                self.blocks(&block.children, out);
                out.push_str(&format!("</{tag}>"));
            }
        }
    }

    fn open_mark(&self, mark: &Mark, out: &mut String) {
        match mark {
            Mark::Link { href } => out.push_str(&format!(
                r#"<a {LINK_ATTRS} href="{}">"#,
                encode_double_quoted_attribute(href)
            )),
            Mark::Bold => out.push_str("<strong>"),
            Mark::Italic => out.push_str("<em>"),
            Mark::Underline => out.push_str("<u>"),
            Mark::Strike => out.push_str("<s>"),
            Mark::Code => out.push_str("<code>"),
            Mark::TextStyle { font_family } => out.push_str(&format!(
                r#"<span style="font-family: {}">"#,
                encode_double_quoted_attribute(font_family)
            )),
            Mark::Comment { comment_id } => {
                let class = match self.view.and_then(|v| v.comments) {
                    Some(comments) => comments.mark_class(comment_id),
                    None => HIGHLIGHT_CLASS.to_string(),
                };
                out.push_str(&format!(
                    r#"<span data-comment-id="{}" class="{class}">"#,
                    encode_double_quoted_attribute(comment_id)
                ));
            }
        }
    }

    /// Inline children with marks opened and closed minimally: a mark shared
    /// with the previous node stays open.
    fn inline(&self, children: &[Node], out: &mut String) {
        let mut active: Vec<&Mark> = Vec::new();
        for child in children {
            let marks = child.marks();
            let keep = active
                .iter()
                .zip(marks)
                .take_while(|(open, mark)| **open == *mark)
                .count();
            for mark in active.drain(keep..).rev() {
                out.push_str(close_mark(mark));
            }
            for mark in &marks[keep..] {
                self.open_mark(mark, out);
                active.push(mark);
            }
            match child {
                Node::Text(text) => out.push_str(&encode_text(&text.text)),
                Node::Variable(var) => self.variable(&var.variable_id, out),
                Node::HardBreak => out.push_str("<br>"),
                Node::Block(_) => {}
            }
        }
        for mark in active.iter().rev() {
            out.push_str(close_mark(mark));
        }
    }

    fn variable(&self, variable_id: &str, out: &mut String) {
        let id = encode_double_quoted_attribute(variable_id);
        match self.view {
            None => out.push_str(&format!(
                r#"<span data-variable-id="{id}" class="{VARIABLE_CLASS}"></span>"#
            )),
            Some(view) => {
                let resolved = resolve(view.variables, variable_id);
                out.push_str(&format!(
                    r#"<span data-variable-id="{id}" class="{}" title="{}" contenteditable="false">{}</span>"#,
                    resolved.class,
                    encode_double_quoted_attribute(&resolved.title),
                    encode_text(&resolved.text),
                ));
            }
        }
    }
}
