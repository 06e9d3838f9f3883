//! Document annotation and transformation engine for words-and-words.
//!
//! A document is a tree of blocks and marked inline content addressed by
//! integer positions. Every change goes through [`editing::Session`] and
//! yields a [`editing::Patch`] whose mapping the engines use to keep their
//! own positions current.

pub mod editing;
pub mod editor;
pub mod engines;
pub mod export;
pub mod markup;
pub mod model;
pub mod storage;

// Re-export key types for easier usage
pub use editing::{Cmd, DecorationSet, EditError, Patch, Session};
pub use editor::{Editor, EditorOptions};
pub use engines::{
    CollapseEngine, Comment, CommentEngine, CommentError, HeadingKey, ReplyPolicy, SearchEngine,
    SearchMatch, Variable, VariableEngine, VariableError,
};
pub use export::{ExportError, ExportedFile, FontFamily, export_to_word};
pub use markup::{render, render_view, to_tree};
pub use model::{Alignment, Block, BlockKind, DocumentTree, Mark, Node};
pub use storage::{
    AutoSave, Document, DocumentMetadata, DocumentStore, DocumentUpdate, FileStore, MemoryStore,
    SaveStatus, StoreError,
};
