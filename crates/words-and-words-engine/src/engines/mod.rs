//! Engines layered over the editing session: comments, search/replace,
//! collapsible sections, variables and the outline.

pub mod collapse;
pub mod comments;
pub mod outline;
pub mod search;
pub mod variables;

pub use collapse::{CollapseEngine, HeadingInfo, HeadingKey, ToggleAffordance};
pub use comments::{Comment, CommentEngine, CommentError, ReplyPolicy, Thread, ThreadStatus};
pub use outline::{Outline, OutlineEntry, outline};
pub use search::{SearchEngine, SearchMatch, find_matches};
pub use variables::{
    DELETED_VARIABLE_PLACEHOLDER, Resolved, Variable, VariableEngine, VariableError, resolve,
};
