//! Walks persisted markup and builds a [`WordDocument`].
//!
//! Nothing here can fail: unknown elements are unwrapped or flattened into a
//! paragraph of their inline content.

use crate::engines::variables::{Variable, resolve};
use crate::markup::{Element, MarkupNode, parse};
use crate::model::Alignment;

use super::model::{
    BodyElement, INDENT_STEP, InlineElement, Paragraph, ParagraphStyle, Run, RunStyle, Table,
    TableRow, WordDocument,
};

const HYPERLINK_STYLE: &str = "Hyperlink";

pub fn transpile(markup: &str, variables: &[Variable]) -> WordDocument {
    let nodes = parse(markup);
    let transpiler = Transpiler { variables };
    let mut body = Vec::new();
    transpiler.blocks(&nodes, 0, &mut body);
    if body.is_empty() {
        body.push(BodyElement::Paragraph(Paragraph::default()));
    }
    WordDocument { body }
}

fn heading_level(tag: &str) -> Option<u8> {
    let level = tag.strip_prefix('h')?.parse::<u8>().ok()?;
    (1..=6).contains(&level).then_some(level)
}

fn alignment(el: &Element) -> Option<Alignment> {
    el.style("text-align")
        .and_then(Alignment::parse)
        .filter(|a| *a != Alignment::Left)
}

fn indent(level: u32) -> Option<u32> {
    (level > 0).then_some(level)
}

struct Transpiler<'a> {
    variables: &'a [Variable],
}

impl Transpiler<'_> {
    fn blocks(&self, nodes: &[MarkupNode], indent_left: u32, out: &mut Vec<BodyElement>) {
        for node in nodes {
            match node {
                MarkupNode::Element(el) => self.block(el, indent_left, out),
                MarkupNode::Text(text) if !text.trim().is_empty() => {
                    out.push(BodyElement::Paragraph(Paragraph {
                        indent_left: indent(indent_left),
                        children: vec![InlineElement::Run(Run::new(
                            text.clone(),
                            RunStyle::default(),
                        ))],
                        ..Default::default()
                    }));
                }
                MarkupNode::Text(_) => {}
            }
        }
    }

    fn textblock(
        &self,
        el: &Element,
        style: Option<ParagraphStyle>,
        indent_left: u32,
    ) -> BodyElement {
        BodyElement::Paragraph(Paragraph {
            style,
            alignment: alignment(el),
            indent_left: indent(indent_left),
            children: self.inline_content(&el.children),
        })
    }

    fn block(&self, el: &Element, indent_left: u32, out: &mut Vec<BodyElement>) {
        if let Some(level) = heading_level(&el.tag) {
            out.push(self.textblock(el, Some(ParagraphStyle::Heading(level)), indent_left));
            return;
        }
        match el.tag.as_str() {
            "p" => out.push(self.textblock(el, None, indent_left)),
            "div" => match el.attr("data-type") {
                Some("title") => {
                    out.push(self.textblock(el, Some(ParagraphStyle::Title), indent_left))
                }
                Some("subtitle") => {
                    out.push(self.textblock(el, Some(ParagraphStyle::Subtitle), indent_left))
                }
                _ => self.blocks(&el.children, indent_left, out),
            },
            "section" | "article" | "header" | "footer" | "main" => {
                self.blocks(&el.children, indent_left, out)
            }
            "blockquote" => {
                let before = out.len();
                self.blocks(&el.children, indent_left + INDENT_STEP, out);
                if out.len() == before {
                    out.push(self.textblock(el, None, indent_left + INDENT_STEP));
                }
                // quoted paragraphs inherit the quote's alignment
                if let Some(align) = alignment(el) {
                    for element in &mut out[before..] {
                        if let BodyElement::Paragraph(p) = element {
                            if p.alignment.is_none() {
                                p.alignment = Some(align);
                            }
                        }
                    }
                }
            }
            "ul" | "ol" => self.list(el, indent_left, out),
            "pre" => self.code_block(el, indent_left, out),
            "table" => {
                if let Some(table) = self.table(el) {
                    out.push(BodyElement::Table(table));
                }
            }
            "img" => {
                let alt = el.attr("alt").filter(|a| !a.is_empty()).unwrap_or("Image");
                let style = RunStyle {
                    italic: true,
                    ..Default::default()
                };
                out.push(BodyElement::Paragraph(Paragraph {
                    indent_left: indent(indent_left),
                    children: vec![InlineElement::Run(Run::new(format!("[{alt}]"), style))],
                    ..Default::default()
                }));
            }
            "br" | "hr" | "script" | "style" => {}
            _ => {
                let children = self.inline_content(&el.children);
                if !children.is_empty() {
                    out.push(BodyElement::Paragraph(Paragraph {
                        alignment: alignment(el),
                        indent_left: indent(indent_left),
                        children,
                        ..Default::default()
                    }));
                }
            }
        }
    }

    /// One paragraph per item with a literal marker. Lists nested inside an
    /// item follow it, one indent step further in.
    fn list(&self, el: &Element, indent_left: u32, out: &mut Vec<BodyElement>) {
        let ordered = el.tag == "ol";
        let item_indent = indent_left + INDENT_STEP;
        for (index, li) in el.child_elements().filter(|c| c.tag == "li").enumerate() {
            let marker = if ordered {
                format!("{}. ", index + 1)
            } else {
                "• ".to_string()
            };
            let mut children = vec![InlineElement::Run(Run::new(marker, RunStyle::default()))];
            let mut nested = Vec::new();
            for child in &li.children {
                match child {
                    MarkupNode::Element(sub) if matches!(sub.tag.as_str(), "ul" | "ol") => {
                        nested.push(sub)
                    }
                    other => self.inline(
                        std::slice::from_ref(other),
                        RunStyle::default(),
                        &mut children,
                    ),
                }
            }
            out.push(BodyElement::Paragraph(Paragraph {
                indent_left: Some(item_indent),
                children,
                ..Default::default()
            }));
            for sub in nested {
                self.list(sub, item_indent, out);
            }
        }
    }

    fn code_block(&self, el: &Element, indent_left: u32, out: &mut Vec<BodyElement>) {
        let text = el
            .child_elements()
            .find(|c| c.tag == "code")
            .map_or_else(|| el.text_content(), Element::text_content);
        let style = RunStyle {
            code: true,
            ..Default::default()
        };
        for line in text.split('\n') {
            out.push(BodyElement::Paragraph(Paragraph {
                indent_left: indent(indent_left),
                children: vec![InlineElement::Run(Run::new(line, style))],
                ..Default::default()
            }));
        }
    }

    fn table(&self, el: &Element) -> Option<Table> {
        let mut rows = Vec::new();
        self.collect_rows(el, &mut rows);
        (!rows.is_empty()).then_some(Table { rows })
    }

    fn collect_rows(&self, el: &Element, rows: &mut Vec<TableRow>) {
        for child in el.child_elements() {
            match child.tag.as_str() {
                "tr" => {
                    let cells: Vec<Paragraph> = child
                        .child_elements()
                        .filter(|c| matches!(c.tag.as_str(), "td" | "th"))
                        .map(|cell| Paragraph::new(self.inline_content(&cell.children)))
                        .collect();
                    if !cells.is_empty() {
                        rows.push(TableRow { cells });
                    }
                }
                "thead" | "tbody" | "tfoot" => self.collect_rows(child, rows),
                _ => {}
            }
        }
    }

    fn inline_content(&self, nodes: &[MarkupNode]) -> Vec<InlineElement> {
        let mut out = Vec::new();
        self.inline(nodes, RunStyle::default(), &mut out);
        out
    }

    fn inline(&self, nodes: &[MarkupNode], style: RunStyle, out: &mut Vec<InlineElement>) {
        for node in nodes {
            let el = match node {
                MarkupNode::Text(text) => {
                    if !text.is_empty() {
                        out.push(InlineElement::Run(Run::new(text.clone(), style)));
                    }
                    continue;
                }
                MarkupNode::Element(el) => el,
            };
            if el.tag == "span"
                && let Some(id) = el.attr("data-variable-id")
            {
                let text = resolve(self.variables, id).text;
                let style = RunStyle {
                    code: false,
                    ..style
                };
                out.push(InlineElement::Run(Run::new(text, style)));
                continue;
            }
            let mut inner = style;
            match el.tag.as_str() {
                "br" => {
                    out.push(InlineElement::Break);
                    continue;
                }
                "a" => {
                    let href = el.attr("href").unwrap_or_default().to_string();
                    let text = el.text_content();
                    let text = if text.is_empty() { href.clone() } else { text };
                    let run_style = RunStyle {
                        bold: style.bold,
                        italic: style.italic,
                        ..Default::default()
                    };
                    let run = Run {
                        char_style: Some(HYPERLINK_STYLE),
                        ..Run::new(text, run_style)
                    };
                    out.push(InlineElement::Hyperlink { href, run });
                    continue;
                }
                "strong" | "b" => inner.bold = true,
                "em" | "i" => inner.italic = true,
                "u" => inner.underline = true,
                "s" | "strike" | "del" => inner.strike = true,
                "code" => inner.code = true,
                _ => {}
            }
            self.inline(&el.children, inner, out);
        }
    }
}
