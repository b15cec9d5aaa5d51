//! Notification rules: destination state to recipient roles.

use folio_core::{RoleCode, StateId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps a destination state to the roles notified when content enters it.
///
/// Deserializes from a plain map, e.g. `{ review: [reviewer] }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationRules {
    rules: BTreeMap<StateId, Vec<RoleCode>>,
}

impl NotificationRules {
    /// Creates an empty rule set. Nothing is ever notified.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds roles to notify when content enters `state`.
    #[must_use]
    pub fn with_rule<I, R>(mut self, state: impl Into<StateId>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<RoleCode>,
    {
        let entry = self.rules.entry(state.into()).or_default();
        for role in roles {
            let role = role.into();
            if !entry.contains(&role) {
                entry.push(role);
            }
        }
        self
    }

    /// Returns the roles to notify for a destination state.
    #[must_use]
    pub fn roles_for(&self, state: &StateId) -> &[RoleCode] {
        self.rules.get(state).map(Vec::as_slice).unwrap_or_default()
    }

    /// Iterates the states that have a rule.
    pub fn states(&self) -> impl Iterator<Item = &StateId> {
        self.rules.keys()
    }

    /// Returns true if no rule is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
