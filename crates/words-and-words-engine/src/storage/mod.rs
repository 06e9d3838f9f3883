//! Local document persistence.

pub mod autosave;
pub mod document;
pub mod file;
pub mod memory;

use thiserror::Error;

pub use autosave::{AutoSave, SaveStatus};
pub use document::{Document, DocumentMetadata, DocumentUpdate};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Name the document collection is stored under.
pub const STORAGE_KEY: &str = "words-and-words-documents";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CRUD over persisted documents.
pub trait DocumentStore {
    /// Metadata of every document, most recently updated first.
    fn list(&self) -> Result<Vec<DocumentMetadata>, StoreError>;

    fn get(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create a document with default font and no variables or comments.
    fn create(&mut self, title: &str, content: Option<&str>) -> Result<Document, StoreError>;

    /// Overwrite the given fields. Fails with [`StoreError::NotFound`] for an
    /// unknown id.
    fn update(&mut self, id: &str, update: DocumentUpdate) -> Result<Document, StoreError>;

    /// Remove a document. Unknown ids are ignored.
    fn delete(&mut self, id: &str) -> Result<(), StoreError>;
}

pub(crate) fn sorted_metadata<'a>(docs: impl Iterator<Item = &'a Document>) -> Vec<DocumentMetadata> {
    let mut list: Vec<DocumentMetadata> = docs.map(Document::metadata).collect();
    list.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    list
}

pub(crate) fn apply_update(
    docs: &mut [Document],
    id: &str,
    update: DocumentUpdate,
) -> Result<Document, StoreError> {
    let doc = docs
        .iter_mut()
        .find(|d| d.id == id)
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    doc.apply(update);
    Ok(doc.clone())
}
