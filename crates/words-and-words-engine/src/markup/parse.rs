//! Tolerant markup parser.
//!
//! Accepts whatever the editor (or a user pasting from elsewhere) produced and
//! always yields a tree: unknown tags are kept as generic elements, stray
//! closing tags are dropped, unclosed elements are closed at the end of input
//! and a `<` that does not start a well-formed tag is plain text.

use html_escape::decode_html_entities;

use super::cursor::Cursor;

/// Elements that never have content or a closing tag.
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is skipped instead of parsed.
const RAW_TEXT_TAGS: &[&str] = &["script", "style"];

/// Block elements that implicitly close an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "p", "div", "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "pre", "blockquote", "table",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    Text(String),
}

impl MarkupNode {
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            MarkupNode::Element(el) => Some(el),
            MarkupNode::Text(_) => None,
        }
    }

    pub fn is_blank_text(&self) -> bool {
        matches!(self, MarkupNode::Text(t) if t.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    /// Lowercased tag name
    pub tag: String,
    /// Attributes in source order, names lowercased, values entity-decoded
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// A property of the inline `style` attribute, e.g. `text-align`.
    pub fn style(&self, property: &str) -> Option<&str> {
        self.attr("style")?
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .map(|(_, value)| value.trim())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(MarkupNode::as_element)
    }

    /// All descendant text, concatenated.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => out.push_str(text),
            MarkupNode::Element(el) => collect_text(&el.children, out),
        }
    }
}

#[derive(Debug)]
enum Token {
    Open { element: Element, self_closing: bool },
    Close(String),
    Text(String),
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b':'
}

fn decode(raw: &str) -> String {
    decode_html_entities(raw).into_owned()
}

/// Parse an opening tag starting at `<`. Returns `None` when the input ends
/// before the tag does.
fn open_tag(cur: &mut Cursor<'_>) -> Option<Token> {
    cur.bump();
    let tag = cur.take_while(is_name_byte).to_ascii_lowercase();
    let mut element = Element::new(tag);
    loop {
        cur.skip_whitespace();
        match cur.peek()? {
            b'>' => {
                cur.bump();
                return Some(Token::Open {
                    element,
                    self_closing: false,
                });
            }
            b'/' => {
                cur.bump();
                if cur.peek() == Some(b'>') {
                    cur.bump();
                    return Some(Token::Open {
                        element,
                        self_closing: true,
                    });
                }
            }
            _ => {
                let name = cur.take_while(|b| {
                    !b.is_ascii_whitespace() && !matches!(b, b'=' | b'>' | b'/')
                });
                if name.is_empty() {
                    cur.bump();
                    continue;
                }
                let name = name.to_ascii_lowercase();
                cur.skip_whitespace();
                let value = if cur.peek() == Some(b'=') {
                    cur.bump();
                    cur.skip_whitespace();
                    attr_value(cur)?
                } else {
                    String::new()
                };
                element.attrs.push((name, value));
            }
        }
    }
}

fn attr_value(cur: &mut Cursor<'_>) -> Option<String> {
    match cur.peek()? {
        quote @ (b'"' | b'\'') => {
            cur.bump();
            let raw = cur.take_until(if quote == b'"' { "\"" } else { "'" });
            cur.bump()?;
            Some(decode(raw))
        }
        _ => Some(decode(
            cur.take_while(|b| !b.is_ascii_whitespace() && b != b'>'),
        )),
    }
}

fn close_tag(cur: &mut Cursor<'_>) -> Option<Token> {
    cur.bump_n(2);
    let tag = cur.take_while(is_name_byte).to_ascii_lowercase();
    cur.take_until(">");
    cur.bump()?;
    Some(Token::Close(tag))
}

fn next_token(cur: &mut Cursor<'_>) -> Option<Token> {
    loop {
        if cur.eof() {
            return None;
        }
        if cur.starts_with("<!--") {
            cur.take_until("-->");
            cur.bump_n(3);
            continue;
        }
        if cur.starts_with("<!") || cur.starts_with("<?") {
            cur.take_until(">");
            cur.bump();
            continue;
        }
        if cur.starts_with("</") && cur.peek_at(2).is_some_and(|b| b.is_ascii_alphabetic()) {
            let mut probe = cur.clone();
            if let Some(token) = close_tag(&mut probe) {
                *cur = probe;
                return Some(token);
            }
        } else if cur.peek() == Some(b'<') && cur.peek_at(1).is_some_and(|b| b.is_ascii_alphabetic())
        {
            let mut probe = cur.clone();
            if let Some(token) = open_tag(&mut probe) {
                *cur = probe;
                return Some(token);
            }
        }
        if cur.peek() == Some(b'<') {
            cur.bump();
            return Some(Token::Text("<".to_string()));
        }
        return Some(Token::Text(decode(cur.take_until("<"))));
    }
}

#[derive(Default)]
struct TreeBuilder {
    stack: Vec<Element>,
    roots: Vec<MarkupNode>,
}

impl TreeBuilder {
    fn push(&mut self, node: MarkupNode) {
        let siblings = match self.stack.last_mut() {
            Some(parent) => &mut parent.children,
            None => &mut self.roots,
        };
        if let MarkupNode::Text(text) = &node
            && let Some(MarkupNode::Text(prev)) = siblings.last_mut()
        {
            prev.push_str(text);
            return;
        }
        siblings.push(node);
    }

    fn is_open(&self, tag: &str) -> bool {
        self.stack.iter().any(|el| el.tag == tag)
    }

    /// Close `tag` and everything opened after it. No-op if it is not open.
    fn close(&mut self, tag: &str) {
        let Some(index) = self.stack.iter().rposition(|el| el.tag == tag) else {
            log::debug!("dropping stray closing tag </{tag}>");
            return;
        };
        while self.stack.len() > index {
            if let Some(el) = self.stack.pop() {
                self.push(MarkupNode::Element(el));
            }
        }
    }

    /// Close the nearest open `tag` unless one of `scope` is opened after it.
    fn close_within(&mut self, tag: &str, scope: &[&str]) {
        for el in self.stack.iter().rev() {
            if el.tag == tag {
                self.close(tag);
                return;
            }
            if scope.contains(&el.tag.as_str()) {
                return;
            }
        }
    }

    fn open(&mut self, element: Element, self_closing: bool) {
        let tag = element.tag.as_str();
        if CLOSES_PARAGRAPH.contains(&tag) && self.stack.last().is_some_and(|el| el.tag == "p") {
            self.close("p");
        }
        match tag {
            "li" => self.close_within("li", &["ul", "ol"]),
            "tr" => self.close_within("tr", &["table"]),
            "td" | "th" => {
                self.close_within("td", &["tr", "table"]);
                self.close_within("th", &["tr", "table"]);
            }
            _ => {}
        }
        if self_closing || VOID_TAGS.contains(&element.tag.as_str()) {
            self.push(MarkupNode::Element(element));
        } else {
            self.stack.push(element);
        }
    }

    fn finish(mut self) -> Vec<MarkupNode> {
        while let Some(el) = self.stack.pop() {
            self.push(MarkupNode::Element(el));
        }
        self.roots
    }
}

/// Parse markup into a forest of nodes. Never fails.
pub fn parse(input: &str) -> Vec<MarkupNode> {
    let mut cur = Cursor::new(input);
    let mut builder = TreeBuilder::default();
    while let Some(token) = next_token(&mut cur) {
        match token {
            Token::Open {
                element,
                self_closing,
            } => {
                let raw = RAW_TEXT_TAGS.contains(&element.tag.as_str()) && !self_closing;
                let tag = element.tag.clone();
                builder.open(element, self_closing);
                if raw {
                    let end = cur
                        .rest()
                        .to_ascii_lowercase()
                        .find(&format!("</{tag}"))
                        .unwrap_or(cur.rest().len());
                    cur.bump_n(end);
                }
            }
            Token::Close(tag) => {
                if builder.is_open(&tag) {
                    builder.close(&tag);
                } else {
                    log::debug!("dropping stray closing tag </{tag}>");
                }
            }
            Token::Text(text) => builder.push(MarkupNode::Text(text)),
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn el(tag: &str, children: Vec<MarkupNode>) -> MarkupNode {
        MarkupNode::Element(Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children,
        })
    }

    fn text(s: &str) -> MarkupNode {
        MarkupNode::Text(s.to_string())
    }

    #[test]
    fn test_nested_elements() {
        let nodes = parse("<p>Hello <strong>world</strong></p>");
        assert_eq!(
            nodes,
            vec![el(
                "p",
                vec![text("Hello "), el("strong", vec![text("world")])]
            )]
        );
    }

    #[test]
    fn test_attributes_and_entities() {
        let nodes = parse(r#"<a href="https://x.test/?a=1&amp;b=2" data-x='q' hidden>Tom &amp; Jerry</a>"#);
        let link = nodes[0].as_element().unwrap();
        assert_eq!(link.attr("href"), Some("https://x.test/?a=1&b=2"));
        assert_eq!(link.attr("data-x"), Some("q"));
        assert_eq!(link.attr("hidden"), Some(""));
        assert_eq!(link.text_content(), "Tom & Jerry");
    }

    #[test]
    fn test_style_properties() {
        let nodes = parse(r#"<p style="color: red; Text-Align: center">x</p>"#);
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.style("text-align"), Some("center"));
        assert_eq!(p.style("font-family"), None);
    }

    #[test]
    fn test_void_and_self_closing() {
        let nodes = parse("<p>a<br>b<img src=x.png/>c</p>");
        let p = nodes[0].as_element().unwrap();
        let tags: Vec<&str> = p.child_elements().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["br", "img"]);
        assert_eq!(p.text_content(), "abc");
    }

    #[test]
    fn test_malformed_input_becomes_text() {
        assert_eq!(parse("1 < 2 and <b"), vec![text("1 < 2 and <b")]);
        assert_eq!(parse("</>"), vec![text("</>")]);
    }

    #[test]
    fn test_unclosed_and_stray_tags() {
        let nodes = parse("<p><em>open</div>");
        assert_eq!(nodes, vec![el("p", vec![el("em", vec![text("open")])])]);
    }

    #[test]
    fn test_implicit_closing() {
        let nodes = parse("<ul><li>a<li>b</ul><p>x<p>y");
        assert_eq!(
            nodes,
            vec![
                el("ul", vec![el("li", vec![text("a")]), el("li", vec![text("b")])]),
                el("p", vec![text("x")]),
                el("p", vec![text("y")]),
            ]
        );
    }

    #[test]
    fn test_comments_and_scripts_skipped() {
        let nodes = parse("<!-- note --><p>a</p><script>if (a < b) {}</script>");
        assert_eq!(nodes, vec![el("p", vec![text("a")]), el("script", vec![])]);
    }

    #[test]
    fn test_uppercase_tags_normalized() {
        let nodes = parse("<P CLASS=\"x\">a</P>");
        let p = nodes[0].as_element().unwrap();
        assert_eq!(p.tag, "p");
        assert_eq!(p.attr("class"), Some("x"));
    }
}
