//! Command-based editing over the document tree.
//!
//! All changes are expressed as [`Cmd`]s applied to a [`Session`]. Applying
//! returns a [`Patch`] whose [`Mapping`] lets every holder of a position
//! (decorations, comment previews, the selection) carry it into the new
//! document.

pub mod commands;
pub mod decorations;
pub mod mapping;
pub mod patch;
pub mod session;

pub use commands::{Cmd, EditError};
pub use decorations::{Decoration, DecorationKind, DecorationSet};
pub use mapping::{Assoc, MapResult, Mapping, StepMap};
pub use patch::Patch;
pub use session::Session;
