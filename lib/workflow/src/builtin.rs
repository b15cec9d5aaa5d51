//! The stock publication workflow.

use crate::definition::{State, Transition, WorkflowDefinition};
use folio_access::RoleSet;

/// Name of the stock workflow.
pub const DEFAULT_WORKFLOW: &str = "default";

/// Returns the stock publication workflow.
///
/// ```text
/// draft --editor--> review --reviewer--> approved --reviewer--> published
///                     |                                            |  |
///                     +--reviewer--> rejected --editor--> draft <--+  |
///                                                                     v
///                                          draft <--admin-- archived <-+
/// ```
///
/// `administrator` may traverse every edge.
#[must_use]
pub fn default_workflow() -> WorkflowDefinition {
    let editors = RoleSet::from_codes(["editor", "administrator"]);
    let reviewers = RoleSet::from_codes(["reviewer", "administrator"]);
    let admins = RoleSet::from_codes(["administrator"]);

    WorkflowDefinition::new(DEFAULT_WORKFLOW)
        .with_state(State::new("draft", "Draft", "#9e9e9e").initial())
        .with_state(State::new("review", "In review", "#ffb300"))
        .with_state(State::new("approved", "Approved", "#43a047"))
        .with_state(State::new("published", "Published", "#1e88e5").published())
        .with_state(State::new("rejected", "Rejected", "#e53935"))
        .with_state(State::new("archived", "Archived", "#6d4c41"))
        .with_transition(Transition::new("draft", "review", editors.clone()))
        .with_transition(Transition::new("review", "approved", reviewers.clone()))
        .with_transition(Transition::new("review", "rejected", reviewers.clone()))
        .with_transition(Transition::new("approved", "published", reviewers))
        .with_transition(Transition::new("rejected", "draft", editors.clone()))
        .with_transition(Transition::new("published", "draft", editors))
        .with_transition(Transition::new("published", "archived", admins.clone()))
        .with_transition(Transition::new("archived", "draft", admins))
}
