use super::{
    Document, DocumentMetadata, DocumentStore, DocumentUpdate, StoreError, apply_update,
    sorted_metadata,
};

/// Store that lives only as long as the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Vec<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(docs: Vec<Document>) -> Self {
        Self { docs }
    }
}

impl DocumentStore for MemoryStore {
    fn list(&self) -> Result<Vec<DocumentMetadata>, StoreError> {
        Ok(sorted_metadata(self.docs.iter()))
    }

    fn get(&self, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.iter().find(|d| d.id == id).cloned())
    }

    fn create(&mut self, title: &str, content: Option<&str>) -> Result<Document, StoreError> {
        let doc = Document::new(title, content.unwrap_or_default());
        self.docs.push(doc.clone());
        Ok(doc)
    }

    fn update(&mut self, id: &str, update: DocumentUpdate) -> Result<Document, StoreError> {
        apply_update(&mut self.docs, id, update)
    }

    fn delete(&mut self, id: &str) -> Result<(), StoreError> {
        self.docs.retain(|d| d.id != id);
        Ok(())
    }
}
