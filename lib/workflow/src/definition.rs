//! Workflow definition types.
//!
//! A workflow definition is a named graph of states and role-gated
//! transitions. One definition governs the publication lifecycle of one or
//! more content types. Definitions are loaded once at startup and are
//! read-only afterwards.

use crate::error::DefinitionError;
use folio_access::RoleSet;
use folio_core::StateId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A lifecycle stage of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// Identifier referenced by transitions and stored on content.
    pub id: StateId,
    /// Human-readable label.
    pub label: String,
    /// Display color used by editorial UIs.
    pub color: String,
    /// Whether new content starts in this state.
    #[serde(default)]
    pub initial: bool,
    /// Whether content in this state is publicly visible.
    #[serde(default)]
    pub published: bool,
}

impl State {
    /// Creates a state that is neither initial nor published.
    #[must_use]
    pub fn new(id: impl Into<StateId>, label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            color: color.into(),
            initial: false,
            published: false,
        }
    }

    /// Flags this state as the initial state.
    #[must_use]
    pub fn initial(mut self) -> Self {
        self.initial = true;
        self
    }

    /// Flags this state as a published state.
    #[must_use]
    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }
}

/// A directed, role-gated edge between two states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Source state.
    pub from: StateId,
    /// Destination state.
    pub to: StateId,
    /// Roles permitted to traverse this edge.
    #[serde(rename = "roles", alias = "allowed_roles")]
    pub allowed_roles: RoleSet,
}

impl Transition {
    /// Creates a new transition.
    #[must_use]
    pub fn new(from: impl Into<StateId>, to: impl Into<StateId>, allowed_roles: RoleSet) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            allowed_roles,
        }
    }

    /// Returns true if any of the given roles may traverse this edge.
    #[must_use]
    pub fn permits(&self, roles: &RoleSet) -> bool {
        self.allowed_roles.intersects(roles)
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique workflow name, referenced by the content type mapping.
    pub name: String,
    /// States, in display order.
    pub states: Vec<State>,
    /// Transitions, in display order.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl WorkflowDefinition {
    /// Creates an empty workflow with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: Vec::new(),
            transitions: Vec::new(),
        }
    }

    /// Adds a state.
    #[must_use]
    pub fn with_state(mut self, state: State) -> Self {
        self.states.push(state);
        self
    }

    /// Adds a transition.
    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    /// Returns the state with the given id.
    #[must_use]
    pub fn state(&self, id: &StateId) -> Option<&State> {
        self.states.iter().find(|s| &s.id == id)
    }

    /// Returns true if the workflow declares the given state.
    #[must_use]
    pub fn has_state(&self, id: &StateId) -> bool {
        self.state(id).is_some()
    }

    /// Returns the initial state.
    ///
    /// Always `Some` for a validated definition.
    #[must_use]
    pub fn initial_state(&self) -> Option<&State> {
        self.states.iter().find(|s| s.initial)
    }

    /// Returns true if the given state is flagged published.
    #[must_use]
    pub fn is_published(&self, id: &StateId) -> bool {
        self.state(id).is_some_and(|s| s.published)
    }

    /// Returns the edge from `from` to `to`, if one exists.
    #[must_use]
    pub fn find_transition(&self, from: &StateId, to: &StateId) -> Option<&Transition> {
        self.transitions
            .iter()
            .find(|t| &t.from == from && &t.to == to)
    }

    /// Returns all edges leaving the given state.
    pub fn transitions_from<'a>(&'a self, state: &'a StateId) -> impl Iterator<Item = &'a Transition> {
        self.transitions.iter().filter(move |t| &t.from == state)
    }

    /// Validates the structural invariants of the definition.
    ///
    /// # Errors
    ///
    /// Returns the first violation found:
    /// - duplicate state ids
    /// - zero or several initial states
    /// - transitions referencing undeclared states
    /// - duplicate `(from, to)` edges
    /// - edges no role may traverse
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let workflow = &self.name;

        let mut seen = HashSet::new();
        for state in &self.states {
            if !seen.insert(&state.id) {
                return Err(DefinitionError::DuplicateState {
                    workflow: workflow.clone(),
                    state: state.id.clone(),
                });
            }
        }

        let initial: Vec<StateId> = self
            .states
            .iter()
            .filter(|s| s.initial)
            .map(|s| s.id.clone())
            .collect();
        match initial.len() {
            0 => {
                return Err(DefinitionError::NoInitialState {
                    workflow: workflow.clone(),
                });
            }
            1 => {}
            _ => {
                return Err(DefinitionError::MultipleInitialStates {
                    workflow: workflow.clone(),
                    states: initial,
                });
            }
        }

        let mut edges = HashSet::new();
        for transition in &self.transitions {
            for endpoint in [&transition.from, &transition.to] {
                if !seen.contains(endpoint) {
                    return Err(DefinitionError::UnknownState {
                        workflow: workflow.clone(),
                        state: endpoint.clone(),
                    });
                }
            }
            if !edges.insert((&transition.from, &transition.to)) {
                return Err(DefinitionError::DuplicateTransition {
                    workflow: workflow.clone(),
                    from: transition.from.clone(),
                    to: transition.to.clone(),
                });
            }
            if transition.allowed_roles.is_empty() {
                return Err(DefinitionError::EmptyRoles {
                    workflow: workflow.clone(),
                    from: transition.from.clone(),
                    to: transition.to.clone(),
                });
            }
        }

        Ok(())
    }
}
