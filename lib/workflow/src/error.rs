//! Error types for the workflow crate.
//!
//! - `DefinitionError`: a workflow catalog violates a structural invariant
//!   (raised once, at startup, wrapped in a rootcause report)
//! - `RegistryError`: a lookup against the loaded registry failed

use folio_core::{ContentType, StateId};
use std::fmt;

/// Errors from validating workflow definitions and the content type mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    /// The workflow declares no initial state.
    NoInitialState { workflow: String },
    /// The workflow declares more than one initial state.
    MultipleInitialStates {
        workflow: String,
        states: Vec<StateId>,
    },
    /// Two states share an id.
    DuplicateState { workflow: String, state: StateId },
    /// A transition references a state the workflow does not declare.
    UnknownState { workflow: String, state: StateId },
    /// Two transitions connect the same pair of states.
    DuplicateTransition {
        workflow: String,
        from: StateId,
        to: StateId,
    },
    /// A transition grants no role at all.
    EmptyRoles {
        workflow: String,
        from: StateId,
        to: StateId,
    },
    /// Two workflows share a name.
    DuplicateWorkflow { workflow: String },
    /// A content type is mapped to a workflow that does not exist.
    UnknownWorkflow {
        content_type: ContentType,
        workflow: String,
    },
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInitialState { workflow } => {
                write!(f, "workflow '{workflow}' has no initial state")
            }
            Self::MultipleInitialStates { workflow, states } => {
                let names: Vec<&str> = states.iter().map(StateId::as_str).collect();
                write!(
                    f,
                    "workflow '{workflow}' has several initial states: {}",
                    names.join(", ")
                )
            }
            Self::DuplicateState { workflow, state } => {
                write!(f, "workflow '{workflow}' declares state '{state}' twice")
            }
            Self::UnknownState { workflow, state } => {
                write!(
                    f,
                    "workflow '{workflow}' has a transition referencing unknown state '{state}'"
                )
            }
            Self::DuplicateTransition { workflow, from, to } => {
                write!(
                    f,
                    "workflow '{workflow}' declares transition {from} -> {to} twice"
                )
            }
            Self::EmptyRoles { workflow, from, to } => {
                write!(
                    f,
                    "workflow '{workflow}' transition {from} -> {to} allows no roles"
                )
            }
            Self::DuplicateWorkflow { workflow } => {
                write!(f, "workflow '{workflow}' is defined twice")
            }
            Self::UnknownWorkflow {
                content_type,
                workflow,
            } => {
                write!(
                    f,
                    "content type '{content_type}' is mapped to unknown workflow '{workflow}'"
                )
            }
        }
    }
}

impl std::error::Error for DefinitionError {}

/// Errors from registry lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// No workflow is mapped to the content type.
    ContentTypeNotFound { content_type: ContentType },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContentTypeNotFound { content_type } => {
                write!(f, "no workflow for content type: {content_type}")
            }
        }
    }
}

impl std::error::Error for RegistryError {}
