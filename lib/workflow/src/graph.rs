//! State graph analysis using petgraph.
//!
//! Workflow graphs are cyclic by design, so the only structural checks that
//! make sense are reachability ones: a state nothing can reach is almost
//! certainly a configuration mistake, and a state with no way out means
//! content can get stuck. Both are reported as warnings at load time rather
//! than rejected.

use crate::definition::WorkflowDefinition;
use folio_core::StateId;
use petgraph::Direction;
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use std::collections::{BTreeSet, HashMap};

/// Directed graph view of a workflow definition.
#[derive(Debug, Clone)]
pub struct StateGraph {
    graph: DiGraph<StateId, ()>,
    index: HashMap<StateId, NodeIndex>,
    initial: Option<NodeIndex>,
}

impl StateGraph {
    /// Builds the graph for a definition.
    ///
    /// Transitions referencing undeclared states are ignored; run
    /// `WorkflowDefinition::validate` first to reject them.
    #[must_use]
    pub fn from_definition(definition: &WorkflowDefinition) -> Self {
        let mut graph = DiGraph::new();
        let mut index = HashMap::new();
        let mut initial = None;

        for state in &definition.states {
            let node = graph.add_node(state.id.clone());
            index.insert(state.id.clone(), node);
            if state.initial {
                initial = Some(node);
            }
        }

        for transition in &definition.transitions {
            if let (Some(from), Some(to)) = (index.get(&transition.from), index.get(&transition.to))
            {
                graph.add_edge(*from, *to, ());
            }
        }

        Self {
            graph,
            index,
            initial,
        }
    }

    /// Returns every state reachable from `start`, including `start` itself.
    #[must_use]
    pub fn reachable_from(&self, start: &StateId) -> BTreeSet<StateId> {
        let Some(&node) = self.index.get(start) else {
            return BTreeSet::new();
        };

        let mut reachable = BTreeSet::new();
        let mut bfs = Bfs::new(&self.graph, node);
        while let Some(visited) = bfs.next(&self.graph) {
            reachable.insert(self.graph[visited].clone());
        }
        reachable
    }

    /// Returns states that cannot be reached from the initial state.
    #[must_use]
    pub fn unreachable_states(&self) -> Vec<StateId> {
        let reachable = match self.initial {
            Some(initial) => self.reachable_from(&self.graph[initial]),
            None => BTreeSet::new(),
        };

        self.graph
            .node_indices()
            .map(|n| &self.graph[n])
            .filter(|state| !reachable.contains(*state))
            .cloned()
            .collect()
    }

    /// Returns states with no outgoing transition.
    #[must_use]
    pub fn dead_ends(&self) -> Vec<StateId> {
        self.graph
            .node_indices()
            .filter(|&n| {
                self.graph
                    .neighbors_directed(n, Direction::Outgoing)
                    .next()
                    .is_none()
            })
            .map(|n| self.graph[n].clone())
            .collect()
    }

    /// Returns true if content can return to a state it has left.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Returns the number of states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of transitions.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{State, Transition};
    use folio_access::RoleSet;

    fn roles() -> RoleSet {
        RoleSet::from_codes(["editor"])
    }

    fn workflow() -> WorkflowDefinition {
        WorkflowDefinition::new("test")
            .with_state(State::new("draft", "Draft", "#000").initial())
            .with_state(State::new("review", "Review", "#000"))
            .with_state(State::new("published", "Published", "#000").published())
            .with_state(State::new("orphan", "Orphan", "#000"))
            .with_transition(Transition::new("draft", "review", roles()))
            .with_transition(Transition::new("review", "published", roles()))
            .with_transition(Transition::new("published", "draft", roles()))
    }

    #[test]
    fn counts_states_and_edges() {
        let graph = StateGraph::from_definition(&workflow());
        assert_eq!(graph.state_count(), 4);
        assert_eq!(graph.transition_count(), 3);
    }

    #[test]
    fn reachability_from_initial() {
        let graph = StateGraph::from_definition(&workflow());
        let reachable = graph.reachable_from(&StateId::new("draft"));
        assert!(reachable.contains("review"));
        assert!(reachable.contains("published"));
        assert!(!reachable.contains("orphan"));
    }

    #[test]
    fn reports_unreachable_and_dead_end_states() {
        let graph = StateGraph::from_definition(&workflow());
        assert_eq!(graph.unreachable_states(), vec![StateId::new("orphan")]);
        assert_eq!(graph.dead_ends(), vec![StateId::new("orphan")]);
    }

    #[test]
    fn publication_cycle_detected() {
        let graph = StateGraph::from_definition(&workflow());
        assert!(graph.is_cyclic());
    }

    #[test]
    fn unknown_start_reaches_nothing() {
        let graph = StateGraph::from_definition(&workflow());
        assert!(graph.reachable_from(&StateId::new("nowhere")).is_empty());
    }
}
