//! Markup to [`DocumentTree`], the way the editor loads persisted content.

use crate::model::mark::normalize_set;
use crate::model::{Alignment, Block, BlockKind, DocumentTree, Mark, Node, Text, VariableRef};

use super::parse::{Element, MarkupNode, parse};

/// Convert markup into a document tree. Unknown elements are unwrapped,
/// loose inline content is wrapped in paragraphs.
pub fn to_tree(markup: &str) -> DocumentTree {
    let nodes = parse(markup);
    DocumentTree::new(blocks(&nodes))
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn is_block_tag(tag: &str) -> bool {
    heading_level(tag).is_some()
        || matches!(
            tag,
            "p" | "div"
                | "ul"
                | "ol"
                | "li"
                | "blockquote"
                | "pre"
                | "table"
                | "thead"
                | "tbody"
                | "tfoot"
                | "tr"
                | "td"
                | "th"
                | "img"
                | "hr"
                | "section"
                | "article"
                | "header"
                | "footer"
                | "main"
        )
}

fn alignment(el: &Element) -> Option<Alignment> {
    el.style("text-align").and_then(Alignment::parse)
}

fn textblock(kind: BlockKind, el: &Element) -> Node {
    let mut block = Block::new(kind, inline_content(&el.children));
    block.align = alignment(el);
    Node::Block(block)
}

/// Block-level children. Never empty, so containers stay valid.
fn block_content(nodes: &[MarkupNode]) -> Vec<Node> {
    let mut out = blocks(nodes);
    if out.is_empty() {
        out.push(Node::paragraph(Vec::new()));
    }
    out
}

fn blocks(nodes: &[MarkupNode]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut loose: Vec<MarkupNode> = Vec::new();
    for node in nodes {
        match node {
            MarkupNode::Element(el) if is_block_tag(&el.tag) => {
                flush_loose(&mut loose, &mut out);
                block(el, &mut out);
            }
            _ => loose.push(node.clone()),
        }
    }
    flush_loose(&mut loose, &mut out);
    out
}

fn flush_loose(loose: &mut Vec<MarkupNode>, out: &mut Vec<Node>) {
    if loose.iter().all(MarkupNode::is_blank_text) {
        loose.clear();
        return;
    }
    out.push(Node::paragraph(inline_content(loose)));
    loose.clear();
}

fn block(el: &Element, out: &mut Vec<Node>) {
    if let Some(level) = heading_level(&el.tag) {
        out.push(textblock(BlockKind::Heading { level }, el));
        return;
    }
    match el.tag.as_str() {
        "p" => out.push(textblock(BlockKind::Paragraph, el)),
        "div" => match el.attr("data-type") {
            Some("title") => out.push(textblock(BlockKind::Title, el)),
            Some("subtitle") => out.push(textblock(BlockKind::Subtitle, el)),
            _ => out.extend(blocks(&el.children)),
        },
        "ul" => out.push(list(BlockKind::BulletList, el)),
        "ol" => out.push(list(BlockKind::OrderedList, el)),
        "blockquote" => out.push(Node::block(
            BlockKind::Blockquote,
            block_content(&el.children),
        )),
        "pre" => out.push(code_block(el)),
        "table" => out.push(table(el)),
        "img" => {
            let Some(src) = el.attr("src") else {
                log::debug!("skipping image without src");
                return;
            };
            out.push(Node::block(
                BlockKind::Image {
                    src: src.to_string(),
                    alt: el.attr("alt").filter(|a| !a.is_empty()).map(str::to_string),
                },
                Vec::new(),
            ));
        }
        "hr" => {}
        _ => out.extend(blocks(&el.children)),
    }
}

fn list(kind: BlockKind, el: &Element) -> Node {
    let mut items = Vec::new();
    let mut stray: Vec<MarkupNode> = Vec::new();
    for child in &el.children {
        match child {
            MarkupNode::Element(li) if li.tag == "li" => {
                if !stray.iter().all(MarkupNode::is_blank_text) {
                    items.push(Node::block(BlockKind::ListItem, block_content(&stray)));
                }
                stray.clear();
                items.push(Node::block(BlockKind::ListItem, block_content(&li.children)));
            }
            _ => stray.push(child.clone()),
        }
    }
    if !stray.iter().all(MarkupNode::is_blank_text) {
        items.push(Node::block(BlockKind::ListItem, block_content(&stray)));
    }
    if items.is_empty() {
        items.push(Node::block(
            BlockKind::ListItem,
            vec![Node::paragraph(Vec::new())],
        ));
    }
    Node::block(kind, items)
}

fn code_block(el: &Element) -> Node {
    let language = el
        .child_elements()
        .find(|c| c.tag == "code")
        .and_then(|code| code.attr("class"))
        .and_then(|class| {
            class
                .split_whitespace()
                .find_map(|c| c.strip_prefix("language-"))
        })
        .map(str::to_string);
    let text = el.text_content();
    let children = if text.is_empty() {
        Vec::new()
    } else {
        vec![Node::text(text)]
    };
    Node::block(BlockKind::CodeBlock { language }, children)
}

fn table_rows<'a>(el: &'a Element, out: &mut Vec<&'a Element>) {
    for child in el.child_elements() {
        match child.tag.as_str() {
            "tr" => out.push(child),
            "thead" | "tbody" | "tfoot" => table_rows(child, out),
            _ => {}
        }
    }
}

fn table(el: &Element) -> Node {
    let mut rows = Vec::new();
    table_rows(el, &mut rows);
    let rows: Vec<Node> = rows
        .into_iter()
        .map(|tr| {
            let cells = tr
                .child_elements()
                .filter_map(|cell| {
                    let kind = match cell.tag.as_str() {
                        "td" => BlockKind::TableCell,
                        "th" => BlockKind::TableHeader,
                        _ => return None,
                    };
                    Some(Node::block(kind, block_content(&cell.children)))
                })
                .collect();
            Node::block(BlockKind::TableRow, cells)
        })
        .filter(|row| row.as_block().is_some_and(|b| !b.children.is_empty()))
        .collect();
    Node::block(BlockKind::Table, rows)
}

/// Inline content of a textblock with whitespace collapsed.
fn inline_content(nodes: &[MarkupNode]) -> Vec<Node> {
    let mut raw = Vec::new();
    inlines(nodes, &[], &mut raw);
    collapse_whitespace(raw)
}

fn inlines(nodes: &[MarkupNode], marks: &[Mark], out: &mut Vec<Node>) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => {
                if !text.is_empty() {
                    out.push(Node::Text(Text {
                        text: text.clone(),
                        marks: marks.to_vec(),
                    }));
                }
            }
            MarkupNode::Element(el) => inline_element(el, marks, out),
        }
    }
}

fn with_mark(marks: &[Mark], mark: Mark) -> Vec<Mark> {
    normalize_set(marks.iter().cloned().chain([mark]))
}

fn inline_element(el: &Element, marks: &[Mark], out: &mut Vec<Node>) {
    let added = match el.tag.as_str() {
        "br" => {
            out.push(Node::HardBreak);
            return;
        }
        "img" => {
            log::debug!("dropping image inside inline content");
            return;
        }
        "strong" | "b" => Some(Mark::Bold),
        "em" | "i" => Some(Mark::Italic),
        "u" => Some(Mark::Underline),
        "s" | "strike" | "del" => Some(Mark::Strike),
        "code" => Some(Mark::Code),
        "a" => el.attr("href").map(Mark::link),
        "span" => {
            if let Some(id) = el.attr("data-variable-id") {
                out.push(Node::Variable(VariableRef {
                    variable_id: id.to_string(),
                    marks: marks.to_vec(),
                }));
                return;
            }
            if let Some(id) = el.attr("data-comment-id") {
                Some(Mark::comment(id))
            } else {
                el.style("font-family").map(|family| Mark::TextStyle {
                    font_family: family.to_string(),
                })
            }
        }
        _ => None,
    };
    match added {
        Some(mark) => inlines(&el.children, &with_mark(marks, mark), out),
        None => inlines(&el.children, marks, out),
    }
}

fn push_text(out: &mut Vec<Node>, text: String, marks: Vec<Mark>) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(prev)) = out.last_mut()
        && prev.marks == marks
    {
        prev.text.push_str(&text);
        return;
    }
    out.push(Node::Text(Text { text, marks }));
}

/// Collapse whitespace runs to one space, dropping it at the start and end of
/// the block and after a line break.
fn collapse_whitespace(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    // true at block start, after a break, or after emitted whitespace
    let mut at_gap = true;
    for node in nodes {
        match node {
            Node::Text(Text { text, marks }) => {
                let mut collapsed = String::with_capacity(text.len());
                for ch in text.chars() {
                    if ch.is_ascii_whitespace() {
                        if !at_gap {
                            collapsed.push(' ');
                            at_gap = true;
                        }
                    } else {
                        collapsed.push(ch);
                        at_gap = false;
                    }
                }
                push_text(&mut out, collapsed, marks);
            }
            Node::HardBreak => {
                trim_trailing_space(&mut out);
                out.push(Node::HardBreak);
                at_gap = true;
            }
            other => {
                out.push(other);
                at_gap = false;
            }
        }
    }
    trim_trailing_space(&mut out);
    out
}

fn trim_trailing_space(out: &mut Vec<Node>) {
    if let Some(Node::Text(last)) = out.last_mut()
        && last.text.ends_with(' ')
    {
        last.text.pop();
        if last.text.is_empty() {
            out.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn first_block(tree: &DocumentTree) -> &Block {
        tree.blocks()[0].as_block().unwrap()
    }

    #[test]
    fn test_paragraph_with_marks() {
        let tree = to_tree("<p>Hello <strong>bold <em>both</em></strong></p>");
        assert_eq!(
            first_block(&tree).children,
            vec![
                Node::text("Hello "),
                Node::marked_text("bold ", vec![Mark::Bold]),
                Node::marked_text("both", vec![Mark::Bold, Mark::Italic]),
            ]
        );
    }

    #[test]
    fn test_title_subtitle_and_alignment() {
        let tree = to_tree(
            r#"<div data-type="title" class="document-title">T</div><div data-type="subtitle">S</div><p style="text-align: center">c</p>"#,
        );
        let kinds: Vec<&BlockKind> = tree
            .blocks()
            .iter()
            .map(|b| &b.as_block().unwrap().kind)
            .collect();
        assert_eq!(
            kinds,
            vec![&BlockKind::Title, &BlockKind::Subtitle, &BlockKind::Paragraph]
        );
        assert_eq!(
            tree.blocks()[2].as_block().unwrap().align,
            Some(Alignment::Center)
        );
    }

    #[test]
    fn test_variables_and_comments() {
        let tree = to_tree(
            r#"<p>Dear <span data-variable-id="var_1" class="variable-node"></span>, <span data-comment-id="c1" class="comment-highlight">see</span></p>"#,
        );
        assert_eq!(
            first_block(&tree).children,
            vec![
                Node::text("Dear "),
                Node::variable("var_1"),
                Node::text(", "),
                Node::marked_text("see", vec![Mark::comment("c1")]),
            ]
        );
    }

    #[test]
    fn test_overlapping_comment_spans() {
        let tree = to_tree(
            r#"<p><span data-comment-id="a">x<span data-comment-id="b">y</span></span></p>"#,
        );
        assert_eq!(tree.comment_runs("a"), vec![1..2, 2..3]);
        assert_eq!(tree.comment_runs("b"), vec![2..3]);
    }

    #[test]
    fn test_whitespace_collapsed() {
        let tree = to_tree("<p>\n  a   b\n</p>\n<p>c<br>  d</p>");
        assert_eq!(tree.text_between(0..tree.content_size(), "|"), "a b|cd");
        assert_eq!(
            tree.blocks()[1].as_block().unwrap().children,
            vec![Node::text("c"), Node::HardBreak, Node::text("d")]
        );
    }

    #[test]
    fn test_code_block_keeps_whitespace() {
        let tree = to_tree("<pre><code class=\"language-rust\">fn main() {\n    x\n}</code></pre>");
        let block = first_block(&tree);
        assert_eq!(
            block.kind,
            BlockKind::CodeBlock {
                language: Some("rust".into())
            }
        );
        assert_eq!(block.text_content(), "fn main() {\n    x\n}");
    }

    #[test]
    fn test_lists_and_tables() {
        let tree = to_tree(
            "<ul><li><p>a</p><ol><li>b</li></ol></li></ul><table><tbody><tr><th>h</th><td><p>d</p></td></tr></tbody></table>",
        );
        assert_eq!(tree.blocks().len(), 2);
        let list = first_block(&tree);
        assert_eq!(list.kind, BlockKind::BulletList);
        let item = list.children[0].as_block().unwrap();
        assert_eq!(item.children.len(), 2);

        let table = tree.blocks()[1].as_block().unwrap();
        let row = table.children[0].as_block().unwrap();
        let kinds: Vec<&BlockKind> = row
            .children
            .iter()
            .map(|c| &c.as_block().unwrap().kind)
            .collect();
        assert_eq!(kinds, vec![&BlockKind::TableHeader, &BlockKind::TableCell]);
    }

    #[test]
    fn test_loose_text_wrapped() {
        let tree = to_tree("just text <b>here</b><p>next</p>");
        assert_eq!(tree.blocks().len(), 2);
        assert_eq!(first_block(&tree).text_content(), "just text here");
    }

    #[test]
    fn test_empty_markup_gives_empty_paragraph() {
        let tree = to_tree("");
        assert_eq!(tree.blocks(), &[Node::paragraph(Vec::new())]);
    }
}
