//! Packages a [`WordDocument`] as an Office Open XML (`.docx`) zip.

use std::io::{Cursor, Write};

use chrono::{SecondsFormat, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use super::ExportError;
use super::fonts::FontFamily;
use super::model::{BodyElement, InlineElement, Paragraph, Run, Table, WordDocument};

const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_HYPERLINK: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Body text size in half-points (12pt)
const BODY_SIZE: u32 = 24;
/// (size in half-points, spacing before, spacing after) per heading level
const HEADING_STYLES: [(u32, u32, u32); 6] = [
    (54, 240, 120),
    (44, 200, 80),
    (36, 160, 80),
    (30, 120, 60),
    (26, 120, 60),
    (24, 120, 60),
];

/// Build the `.docx` archive bytes.
pub fn package(doc: &WordDocument, title: &str, font: FontFamily) -> Result<Vec<u8>, ExportError> {
    let mut body = BodyWriter::default();
    body.document(doc);

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let parts = [
        ("[Content_Types].xml", content_types()),
        ("_rels/.rels", package_rels()),
        ("docProps/core.xml", core_properties(title)),
        ("word/_rels/document.xml.rels", document_rels(&body.links)),
        ("word/document.xml", body.xml),
        ("word/styles.xml", styles(font)),
    ];
    for (name, xml) in parts {
        zip.start_file(name, options)?;
        zip.write_all(xml.as_bytes())?;
    }
    let bytes = zip.finish()?.into_inner();
    log::debug!("packaged {} body elements into {} bytes", doc.body.len(), bytes.len());
    Ok(bytes)
}

fn content_types() -> String {
    format!(
        concat!(
            "{}<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">",
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>",
            "<Default Extension=\"xml\" ContentType=\"application/xml\"/>",
            "<Override PartName=\"/word/document.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>",
            "<Override PartName=\"/word/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml\"/>",
            "<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>",
            "</Types>"
        ),
        XML_HEADER
    )
}

fn package_rels() -> String {
    format!(
        concat!(
            "{}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
            "<Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" Target=\"word/document.xml\"/>",
            "<Relationship Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties\" Target=\"docProps/core.xml\"/>",
            "</Relationships>"
        ),
        XML_HEADER
    )
}

fn core_properties(title: &str) -> String {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    format!(
        concat!(
            "{header}<cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" ",
            "xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" ",
            "xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">",
            "<dc:title>{title}</dc:title>",
            "<dcterms:created xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:created>",
            "<dcterms:modified xsi:type=\"dcterms:W3CDTF\">{now}</dcterms:modified>",
            "</cp:coreProperties>"
        ),
        header = XML_HEADER,
        title = encode_text(title),
        now = now.as_str(),
    )
}

/// Styles are rId1; hyperlinks follow from rId2.
fn document_rels(links: &[String]) -> String {
    let mut xml = format!(
        "{XML_HEADER}<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
         <Relationship Id=\"rId1\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\" Target=\"styles.xml\"/>"
    );
    for (i, href) in links.iter().enumerate() {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="{REL_HYPERLINK}" Target="{}" TargetMode="External"/>"#,
            i + 2,
            encode_double_quoted_attribute(href)
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn styles(font: FontFamily) -> String {
    let font = font.word_font();
    let fonts = format!(r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#);
    let mut xml = format!(
        "{XML_HEADER}<w:styles xmlns:w=\"{NS_W}\">\
         <w:docDefaults><w:rPrDefault><w:rPr>{fonts}<w:sz w:val=\"{BODY_SIZE}\"/><w:szCs w:val=\"{BODY_SIZE}\"/></w:rPr></w:rPrDefault>\
         <w:pPrDefault><w:pPr><w:spacing w:after=\"120\" w:line=\"276\" w:lineRule=\"auto\"/></w:pPr></w:pPrDefault></w:docDefaults>\
         <w:style w:type=\"paragraph\" w:default=\"1\" w:styleId=\"Normal\"><w:name w:val=\"Normal\"/><w:qFormat/></w:style>"
    );
    for (i, (size, before, after)) in HEADING_STYLES.iter().enumerate() {
        let level = i + 1;
        xml.push_str(&format!(
            "<w:style w:type=\"paragraph\" w:styleId=\"Heading{level}\"><w:name w:val=\"heading {level}\"/>\
             <w:basedOn w:val=\"Normal\"/><w:next w:val=\"Normal\"/><w:qFormat/>\
             <w:pPr><w:keepNext/><w:spacing w:before=\"{before}\" w:after=\"{after}\"/><w:outlineLvl w:val=\"{i}\"/></w:pPr>\
             <w:rPr>{fonts}<w:b/><w:sz w:val=\"{size}\"/><w:szCs w:val=\"{size}\"/></w:rPr></w:style>"
        ));
    }
    xml.push_str(&format!(
        "<w:style w:type=\"paragraph\" w:styleId=\"Title\"><w:name w:val=\"Title\"/><w:basedOn w:val=\"Normal\"/><w:next w:val=\"Normal\"/><w:qFormat/>\
         <w:pPr><w:spacing w:after=\"80\"/></w:pPr><w:rPr>{fonts}<w:sz w:val=\"56\"/><w:szCs w:val=\"56\"/></w:rPr></w:style>\
         <w:style w:type=\"paragraph\" w:styleId=\"Subtitle\"><w:name w:val=\"Subtitle\"/><w:basedOn w:val=\"Normal\"/><w:next w:val=\"Normal\"/><w:qFormat/>\
         <w:rPr>{fonts}<w:color w:val=\"595959\"/><w:sz w:val=\"30\"/><w:szCs w:val=\"30\"/></w:rPr></w:style>\
         <w:style w:type=\"character\" w:styleId=\"Hyperlink\"><w:name w:val=\"Hyperlink\"/>\
         <w:rPr><w:color w:val=\"0563C1\"/><w:u w:val=\"single\"/></w:rPr></w:style>\
         </w:styles>"
    ));
    xml
}

/// Writes `word/document.xml`, collecting hyperlink targets as it goes.
#[derive(Default)]
struct BodyWriter {
    xml: String,
    links: Vec<String>,
}

impl BodyWriter {
    fn document(&mut self, doc: &WordDocument) {
        self.xml.push_str(&format!(
            "{XML_HEADER}<w:document xmlns:w=\"{NS_W}\" xmlns:r=\"{NS_R}\"><w:body>"
        ));
        for element in &doc.body {
            match element {
                BodyElement::Paragraph(p) => self.paragraph(p),
                BodyElement::Table(t) => self.table(t),
            }
        }
        self.xml.push_str(
            "<w:sectPr><w:pgSz w:w=\"11906\" w:h=\"16838\"/>\
             <w:pgMar w:top=\"1440\" w:right=\"1440\" w:bottom=\"1440\" w:left=\"1440\" w:header=\"708\" w:footer=\"708\" w:gutter=\"0\"/>\
             </w:sectPr></w:body></w:document>",
        );
    }

    fn paragraph(&mut self, p: &Paragraph) {
        self.xml.push_str("<w:p>");
        let mut props = String::new();
        if let Some(style) = p.style {
            props.push_str(&format!(r#"<w:pStyle w:val="{}"/>"#, style.style_id()));
        }
        if let Some(left) = p.indent_left {
            props.push_str(&format!(r#"<w:ind w:left="{left}"/>"#));
        }
        if let Some(align) = p.alignment {
            let val = match align.as_str() {
                "justify" => "both",
                other => other,
            };
            props.push_str(&format!(r#"<w:jc w:val="{val}"/>"#));
        }
        if !props.is_empty() {
            self.xml.push_str(&format!("<w:pPr>{props}</w:pPr>"));
        }
        for child in &p.children {
            match child {
                InlineElement::Run(run) => self.run(run),
                InlineElement::Break => self.xml.push_str("<w:r><w:br/></w:r>"),
                InlineElement::Hyperlink { href, run } => {
                    self.links.push(href.clone());
                    let id = self.links.len() + 1;
                    self.xml
                        .push_str(&format!(r#"<w:hyperlink r:id="rId{id}" w:history="1">"#));
                    self.run(run);
                    self.xml.push_str("</w:hyperlink>");
                }
            }
        }
        self.xml.push_str("</w:p>");
    }

    fn run(&mut self, run: &Run) {
        let mut props = String::new();
        if let Some(style) = run.char_style {
            props.push_str(&format!(r#"<w:rStyle w:val="{style}"/>"#));
        }
        if let Some(font) = run.font() {
            props.push_str(&format!(
                r#"<w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:cs="{font}"/>"#
            ));
        }
        if run.style.bold {
            props.push_str("<w:b/>");
        }
        if run.style.italic {
            props.push_str("<w:i/>");
        }
        if run.style.strike {
            props.push_str("<w:strike/>");
        }
        if run.style.underline {
            props.push_str(r#"<w:u w:val="single"/>"#);
        }
        self.xml.push_str("<w:r>");
        if !props.is_empty() {
            self.xml.push_str(&format!("<w:rPr>{props}</w:rPr>"));
        }
        self.xml.push_str(&format!(
            r#"<w:t xml:space="preserve">{}</w:t></w:r>"#,
            encode_text(&run.text)
        ));
    }

    fn table(&mut self, table: &Table) {
        let columns = table.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0);
        self.xml.push_str(
            "<w:tbl><w:tblPr><w:tblW w:w=\"5000\" w:type=\"pct\"/><w:tblBorders>\
             <w:top w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>\
             <w:left w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>\
             <w:bottom w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>\
             <w:right w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>\
             <w:insideH w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>\
             <w:insideV w:val=\"single\" w:sz=\"4\" w:space=\"0\" w:color=\"auto\"/>\
             </w:tblBorders></w:tblPr><w:tblGrid>",
        );
        for _ in 0..columns {
            self.xml.push_str("<w:gridCol/>");
        }
        self.xml.push_str("</w:tblGrid>");
        for row in &table.rows {
            self.xml.push_str("<w:tr>");
            for cell in &row.cells {
                self.xml
                    .push_str(r#"<w:tc><w:tcPr><w:tcW w:w="0" w:type="auto"/></w:tcPr>"#);
                self.paragraph(cell);
                self.xml.push_str("</w:tc>");
            }
            self.xml.push_str("</w:tr>");
        }
        self.xml.push_str("</w:tbl>");
    }
}
