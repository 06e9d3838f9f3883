use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{
    Document, DocumentMetadata, DocumentStore, DocumentUpdate, STORAGE_KEY, StoreError,
    apply_update, sorted_metadata,
};

/// All documents in one JSON file, read and rewritten on every operation.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Store inside `dir`, in a file named after [`STORAGE_KEY`].
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("{STORAGE_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable-as-JSON file counts as an empty store.
    fn load(&self) -> Result<Vec<Document>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str(&raw) {
            Ok(docs) => Ok(docs),
            Err(err) => {
                log::warn!(
                    "ignoring corrupt document store {}: {err}",
                    self.path.display()
                );
                Ok(Vec::new())
            }
        }
    }

    /// Written to a sibling temp file, then renamed into place.
    fn save(&self, docs: &[Document]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(docs)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!("saved {} documents to {}", docs.len(), self.path.display());
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn list(&self) -> Result<Vec<DocumentMetadata>, StoreError> {
        Ok(sorted_metadata(self.load()?.iter()))
    }

    fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.load()?.into_iter().find(|d| d.id == id))
    }

    fn create(&mut self, title: &str, content: Option<&str>) -> Result<Document, StoreError> {
        let mut docs = self.load()?;
        let doc = Document::new(title, content.unwrap_or_default());
        docs.push(doc.clone());
        self.save(&docs)?;
        Ok(doc)
    }

    fn update(&mut self, id: &str, update: DocumentUpdate) -> Result<Document, StoreError> {
        let mut docs = self.load()?;
        let doc = apply_update(&mut docs, id, update)?;
        self.save(&docs)?;
        Ok(doc)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        let mut docs = self.load()?;
        let before = docs.len();
        docs.retain(|d| d.id != id);
        if docs.len() != before {
            self.save(&docs)?;
        }
        Ok(())
    }
}
