//! Transition authorization.
//!
//! Pure decisions over a workflow definition and an actor's role set. A
//! transition is permitted iff an edge `from -> to` exists and its allowed
//! roles intersect the actor's roles. A missing edge is a hard deny.

use crate::definition::{Transition, WorkflowDefinition};
use folio_access::RoleSet;
use folio_core::StateId;

/// Outcome of evaluating a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The edge exists and the actor holds one of its roles.
    Allowed,
    /// The edge exists but the actor holds none of its roles.
    Forbidden,
    /// The workflow has no such edge.
    NoSuchEdge,
}

impl Decision {
    /// Returns true for `Decision::Allowed`.
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Evaluates whether `roles` may move content from `from` to `to`.
#[must_use]
pub fn evaluate(
    definition: &WorkflowDefinition,
    from: &StateId,
    to: &StateId,
    roles: &RoleSet,
) -> Decision {
    match definition.find_transition(from, to) {
        None => Decision::NoSuchEdge,
        Some(edge) if edge.permits(roles) => Decision::Allowed,
        Some(_) => Decision::Forbidden,
    }
}

/// Returns true if `roles` may move content from `from` to `to`.
#[must_use]
pub fn can_transition(
    definition: &WorkflowDefinition,
    from: &StateId,
    to: &StateId,
    roles: &RoleSet,
) -> bool {
    evaluate(definition, from, to, roles).is_allowed()
}

/// Returns the edges out of `current` that `roles` may traverse, in
/// definition order.
#[must_use]
pub fn available_transitions<'a>(
    definition: &'a WorkflowDefinition,
    current: &StateId,
    roles: &RoleSet,
) -> Vec<&'a Transition> {
    definition
        .transitions
        .iter()
        .filter(|t| &t.from == current && t.permits(roles))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::default_workflow;

    fn state(id: &str) -> StateId {
        StateId::new(id)
    }

    #[test]
    fn editor_may_submit_for_review() {
        let workflow = default_workflow();
        let editor = RoleSet::from_codes(["editor"]);
        assert_eq!(
            evaluate(&workflow, &state("draft"), &state("review"), &editor),
            Decision::Allowed
        );
    }

    #[test]
    fn editor_may_not_approve() {
        let workflow = default_workflow();
        let editor = RoleSet::from_codes(["editor"]);
        assert_eq!(
            evaluate(&workflow, &state("review"), &state("approved"), &editor),
            Decision::Forbidden
        );
        assert!(!can_transition(
            &workflow,
            &state("review"),
            &state("approved"),
            &editor
        ));
    }

    #[test]
    fn any_held_role_is_considered() {
        let workflow = default_workflow();
        // "reviewer" is not the first role in iteration order.
        let actor = RoleSet::from_codes(["author", "editor", "reviewer"]);
        assert!(can_transition(
            &workflow,
            &state("review"),
            &state("approved"),
            &actor
        ));
    }

    #[test]
    fn absent_edges_denied_for_every_role() {
        let workflow = default_workflow();
        let everyone = RoleSet::from_codes(["editor", "reviewer", "administrator"]);
        let ids: Vec<StateId> = workflow.states.iter().map(|s| s.id.clone()).collect();

        for from in &ids {
            for to in &ids {
                if workflow.find_transition(from, to).is_some() {
                    continue;
                }
                assert_eq!(
                    evaluate(&workflow, from, to, &everyone),
                    Decision::NoSuchEdge,
                    "{from} -> {to} should not exist"
                );
                assert!(!can_transition(&workflow, from, to, &everyone));
            }
        }
    }

    #[test]
    fn self_transition_is_not_an_edge() {
        let workflow = default_workflow();
        let admin = RoleSet::from_codes(["administrator"]);
        assert_eq!(
            evaluate(&workflow, &state("draft"), &state("draft"), &admin),
            Decision::NoSuchEdge
        );
    }

    #[test]
    fn available_transitions_filtered_by_role() {
        let workflow = default_workflow();

        let reviewer = RoleSet::from_codes(["reviewer"]);
        let targets: Vec<&str> = available_transitions(&workflow, &state("review"), &reviewer)
            .iter()
            .map(|t| t.to.as_str())
            .collect();
        assert_eq!(targets, vec!["approved", "rejected"]);

        let editor = RoleSet::from_codes(["editor"]);
        assert!(available_transitions(&workflow, &state("review"), &editor).is_empty());

        let admin = RoleSet::from_codes(["administrator"]);
        let targets: Vec<&str> = available_transitions(&workflow, &state("published"), &admin)
            .iter()
            .map(|t| t.to.as_str())
            .collect();
        assert_eq!(targets, vec!["draft", "archived"]);
    }

    #[test]
    fn no_roles_no_transitions() {
        let workflow = default_workflow();
        assert!(available_transitions(&workflow, &state("draft"), &RoleSet::none()).is_empty());
    }
}
