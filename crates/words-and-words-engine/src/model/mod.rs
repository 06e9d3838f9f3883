//! Document tree: blocks, inline runs, marks and atomic nodes.
//!
//! Positions are offsets into a flattened traversal of the tree (see
//! [`DocumentTree`]). The tree itself is only mutated through
//! [`crate::editing::Cmd`]s so that every change comes with a position
//! mapping.

pub mod mark;
pub mod node;
pub mod tree;

pub use mark::Mark;
pub use node::{Alignment, Block, BlockKind, Node, Text, VariableRef};
pub use tree::{Descendants, DocumentTree, Positioned, TextblockLocation};
