//! Word-processor document structure, before packaging.

use crate::model::Alignment;

pub const CODE_FONT: &str = "Courier New";
/// Left indent for quotes and list levels, in twentieths of a point.
pub const INDENT_STEP: u32 = 720;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordDocument {
    pub body: Vec<BodyElement>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyElement {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    Heading(u8),
    Title,
    Subtitle,
}

impl ParagraphStyle {
    /// Style id in `word/styles.xml`
    pub fn style_id(&self) -> String {
        match self {
            ParagraphStyle::Heading(level) => format!("Heading{level}"),
            ParagraphStyle::Title => "Title".to_string(),
            ParagraphStyle::Subtitle => "Subtitle".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    pub style: Option<ParagraphStyle>,
    pub alignment: Option<Alignment>,
    pub indent_left: Option<u32>,
    pub children: Vec<InlineElement>,
}

impl Paragraph {
    pub fn new(children: Vec<InlineElement>) -> Self {
        Self {
            children,
            ..Default::default()
        }
    }

    /// Visible text, breaks as newlines.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .map(|child| match child {
                InlineElement::Run(run) => run.text.as_str(),
                InlineElement::Hyperlink { run, .. } => run.text.as_str(),
                InlineElement::Break => "\n",
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineElement {
    Run(Run),
    Hyperlink { href: String, run: Run },
    Break,
}

/// Formatting accumulated from enclosing inline elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub code: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
    /// Character style, e.g. `Hyperlink`
    pub char_style: Option<&'static str>,
}

impl Run {
    pub fn new(text: impl Into<String>, style: RunStyle) -> Self {
        Self {
            text: text.into(),
            style,
            char_style: None,
        }
    }

    pub fn font(&self) -> Option<&'static str> {
        self.style.code.then_some(CODE_FONT)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRow {
    /// One paragraph per cell
    pub cells: Vec<Paragraph>,
}
