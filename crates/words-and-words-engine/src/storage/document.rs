use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engines::comments::Comment;
use crate::engines::variables::Variable;
use crate::export::FontFamily;

/// A persisted document. `content` is the markup form of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub font: FontFamily,
    #[serde(default)]
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: format!("doc_{}", Uuid::new_v4().simple()),
            title: title.into(),
            content: content.into(),
            font: FontFamily::default(),
            variables: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn metadata(&self) -> DocumentMetadata {
        DocumentMetadata {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Apply a partial update and bump `updated_at`.
    pub fn apply(&mut self, update: DocumentUpdate) {
        let DocumentUpdate {
            title,
            content,
            font,
            variables,
            comments,
        } = update;
        if let Some(title) = title {
            self.title = title;
        }
        if let Some(content) = content {
            self.content = content;
        }
        if let Some(font) = font {
            self.font = font;
        }
        if let Some(variables) = variables {
            self.variables = variables;
        }
        if let Some(comments) = comments {
            self.comments = comments;
        }
        self.updated_at = Utc::now().max(self.updated_at);
    }
}

/// Listing entry, without content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields to overwrite; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub font: Option<FontFamily>,
    pub variables: Option<Vec<Variable>>,
    pub comments: Option<Vec<Comment>>,
}

impl DocumentUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_document_defaults() {
        let doc = Document::new("Notes", "");
        assert!(doc.id.starts_with("doc_"));
        assert_eq!(doc.font, FontFamily::System);
        assert!(doc.variables.is_empty() && doc.comments.is_empty());
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[test]
    fn test_older_records_fill_defaults() {
        let json = r#"{
            "id": "doc_1",
            "title": "Old",
            "content": "<p>x</p>",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z"
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.font, FontFamily::System);
        assert!(doc.variables.is_empty());
        assert_eq!(doc.updated_at.to_rfc3339(), "2024-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_serializes_camel_case() {
        let doc = Document::new("T", "");
        let value = serde_json::to_value(&doc).unwrap();
        assert!(value.get("createdAt").is_some());
        assert!(value.get("updatedAt").is_some());
        assert_eq!(value["font"], "system");
    }

    #[test]
    fn test_apply_update_bumps_timestamp() {
        let mut doc = Document::new("T", "");
        let before = doc.updated_at;
        doc.apply(DocumentUpdate {
            font: Some(FontFamily::Mono),
            ..DocumentUpdate::title("New")
        });
        assert_eq!(doc.title, "New");
        assert_eq!(doc.font, FontFamily::Mono);
        assert_eq!(doc.content, "");
        assert!(doc.updated_at >= before);
    }
}
