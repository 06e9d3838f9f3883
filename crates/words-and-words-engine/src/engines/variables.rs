//! Named values referenced from the document by atomic `variable` nodes.
//!
//! Reference nodes only hold an id. The displayed text is looked up on every
//! render, so editing a value never touches the tree.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::editing::{Cmd, EditError, Patch, Session};
use crate::model::{DocumentTree, Node};

pub const DELETED_VARIABLE_PLACEHOLDER: &str = "[Deleted Variable]";
pub const VARIABLE_CLASS: &str = "variable-node";
pub const DELETED_VARIABLE_CLASS: &str = "variable-node variable-deleted";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Error)]
pub enum VariableError {
    #[error("variable name is empty")]
    EmptyName,

    #[error("no variable with id {0}")]
    UnknownVariable(String),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// What a reference node displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    pub class: &'static str,
    /// Hover title: the variable name, or a deletion notice
    pub title: String,
}

impl Resolved {
    pub fn is_deleted(&self) -> bool {
        self.class == DELETED_VARIABLE_CLASS
    }
}

/// Look up a reference in a variable list. Shared by live rendering and
/// export so both always show the same text.
pub fn resolve(variables: &[Variable], variable_id: &str) -> Resolved {
    match variables.iter().find(|v| v.id == variable_id) {
        Some(var) => Resolved {
            text: var.value.clone(),
            class: VARIABLE_CLASS,
            title: var.name.clone(),
        },
        None => Resolved {
            text: DELETED_VARIABLE_PLACEHOLDER.to_string(),
            class: DELETED_VARIABLE_CLASS,
            title: "This variable has been deleted".to_string(),
        },
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableEngine {
    variables: Vec<Variable>,
}

impl VariableEngine {
    pub fn new(variables: Vec<Variable>) -> Self {
        Self { variables }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn get(&self, id: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.id == id)
    }

    pub fn create(&mut self, name: &str, value: &str) -> Result<Variable, VariableError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VariableError::EmptyName);
        }
        let variable = Variable {
            id: format!("var_{}", Uuid::new_v4().simple()),
            name: name.to_string(),
            value: value.to_string(),
        };
        self.variables.push(variable.clone());
        Ok(variable)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Variable, VariableError> {
        self.variables
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| VariableError::UnknownVariable(id.to_string()))
    }

    pub fn update_value(&mut self, id: &str, value: &str) -> Result<(), VariableError> {
        self.get_mut(id)?.value = value.to_string();
        Ok(())
    }

    pub fn rename(&mut self, id: &str, name: &str) -> Result<(), VariableError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(VariableError::EmptyName);
        }
        self.get_mut(id)?.name = name.to_string();
        Ok(())
    }

    /// Drop a variable from the list. References in the tree stay and render
    /// as deleted.
    pub fn remove(&mut self, id: &str) -> Result<Variable, VariableError> {
        let index = self
            .variables
            .iter()
            .position(|v| v.id == id)
            .ok_or_else(|| VariableError::UnknownVariable(id.to_string()))?;
        Ok(self.variables.remove(index))
    }

    pub fn resolve(&self, variable_id: &str) -> Resolved {
        resolve(&self.variables, variable_id)
    }

    /// Insert a reference at the cursor, replacing a non-empty selection.
    pub fn insert(&self, session: &mut Session, variable_id: &str) -> Result<Patch, VariableError> {
        let selection = session.selection();
        let node = Node::variable(variable_id);
        let patch = if selection.is_empty() {
            session.apply(Cmd::InsertInline {
                at: selection.start,
                node,
            })?
        } else {
            session.apply_all([
                Cmd::DeleteRange {
                    range: selection.clone(),
                },
                Cmd::InsertInline {
                    at: selection.start,
                    node,
                },
            ])?
        };
        Ok(patch)
    }

    /// Positions of every reference node, with the id it points at.
    pub fn references<'a>(
        &self,
        tree: &'a DocumentTree,
    ) -> impl Iterator<Item = (usize, &'a str)> + 'a {
        tree.inline_leaves().filter_map(|leaf| match leaf.node {
            Node::Variable(var) => Some((leaf.pos, var.variable_id.as_str())),
            _ => None,
        })
    }

    /// References whose variable no longer exists.
    pub fn dangling_references(&self, tree: &DocumentTree) -> Vec<usize> {
        self.references(tree)
            .filter(|(_, id)| self.get(id).is_none())
            .map(|(pos, _)| pos)
            .collect()
    }

    pub fn into_variables(self) -> Vec<Variable> {
        self.variables
    }
}
