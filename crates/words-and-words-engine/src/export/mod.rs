//! Export to a word-processor file.
//!
//! Export works on the persisted markup rather than the live tree, so what
//! gets exported is exactly what was saved. Markup problems never fail an
//! export; only packaging and writing can.

pub mod docx;
pub mod fonts;
pub mod model;
pub mod transpile;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::engines::variables::Variable;

pub use fonts::FontFamily;
pub use model::{
    BodyElement, InlineElement, Paragraph, ParagraphStyle, Run, RunStyle, Table, TableRow,
    WordDocument,
};
pub use transpile::transpile;

const FALLBACK_FILENAME: &str = "document";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to package document: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

/// A finished export, ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// Write into `dir`, returning the full path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        log::info!("exported {}", path.display());
        Ok(path)
    }
}

/// Keep ASCII letters, digits, whitespace and hyphens.
pub fn sanitize_filename(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace() || *c == '-')
        .collect();
    let trimmed = kept.trim();
    if trimmed.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn export_to_word(
    markup: &str,
    title: &str,
    font: FontFamily,
    variables: &[Variable],
) -> Result<ExportedFile, ExportError> {
    let doc = transpile(markup, variables);
    let bytes = docx::package(&doc, title, font)?;
    Ok(ExportedFile {
        filename: format!("{}.docx", sanitize_filename(title)),
        bytes,
    })
}
