use std::ops::Range;

use crate::editing::Mapping;

/// Result of applying one or more commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Ranges of the new document touched by the edit
    pub changed: Vec<Range<usize>>,
    pub mapping: Mapping,
    pub new_selection: Range<usize>,
    pub version: u64,
}
