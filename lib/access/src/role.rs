//! Role sets for transition authorization.
//!
//! An actor may hold several roles at once. Authorization is always decided
//! against the whole set, never against a single "primary" role.

use folio_core::RoleCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of role codes, held by an actor or allowed on a transition.
///
/// Backed by an ordered set so iteration and serialization are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet {
    roles: BTreeSet<RoleCode>,
}

impl RoleSet {
    /// Creates an empty role set.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Creates a role set from string codes.
    #[must_use]
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleCode>,
    {
        codes.into_iter().map(Into::into).collect()
    }

    /// Adds a role. Returns false if it was already present.
    pub fn insert(&mut self, role: RoleCode) -> bool {
        self.roles.insert(role)
    }

    /// Returns true if the set holds the given role.
    #[must_use]
    pub fn contains(&self, role: &RoleCode) -> bool {
        self.roles.contains(role)
    }

    /// Returns true if at least one role is held by both sets.
    #[must_use]
    pub fn intersects(&self, other: &RoleSet) -> bool {
        // Iterate the smaller side.
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.roles.iter().any(|role| large.roles.contains(role))
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Returns the number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Iterates the roles in code order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleCode> {
        self.roles.iter()
    }
}

impl FromIterator<RoleCode> for RoleSet {
    fn from_iter<T: IntoIterator<Item = RoleCode>>(iter: T) -> Self {
        Self {
            roles: iter.into_iter().collect(),
        }
    }
}

impl Extend<RoleCode> for RoleSet {
    fn extend<T: IntoIterator<Item = RoleCode>>(&mut self, iter: T) {
        self.roles.extend(iter);
    }
}

impl<'a> IntoIterator for &'a RoleSet {
    type Item = &'a RoleCode;
    type IntoIter = std::collections::btree_set::Iter<'a, RoleCode>;

    fn into_iter(self) -> Self::IntoIter {
        self.roles.iter()
    }
}
