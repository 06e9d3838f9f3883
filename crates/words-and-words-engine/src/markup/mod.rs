//! Markup codec: the HTML dialect documents are persisted in.

pub mod cursor;
pub mod parse;
pub mod read;
pub mod render;

pub use parse::{Element, MarkupNode, parse};
pub use read::to_tree;
pub use render::{ViewContext, render, render_view};
