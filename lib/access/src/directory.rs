//! Identity and role directory collaborators.
//!
//! The engine never stores users. It asks an `IdentityProvider` which roles
//! an actor holds, and a `RoleDirectory` who holds a role (to address
//! notifications). Both are traits so production deployments plug in their
//! own user store and tests use `InMemoryDirectory`.

use crate::error::AccessError;
use crate::role::RoleSet;
use async_trait::async_trait;
use folio_core::{RoleCode, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// A user holding a role, with the address notifications are delivered to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    /// The user's id.
    pub id: UserId,
    /// Delivery address understood by the notification transport.
    pub address: String,
}

impl Member {
    /// Creates a new member.
    #[must_use]
    pub fn new(id: impl Into<UserId>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

/// Resolves an actor to the roles it holds.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Returns every role the actor holds.
    ///
    /// Fails with `AccessError::ActorNotFound` when the actor is unknown.
    async fn resolve_roles(&self, actor: &UserId) -> Result<RoleSet, AccessError>;
}

/// Lists the members of a role.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Returns the users holding the role. Unknown roles have no members.
    async fn members_of_role(&self, role: &RoleCode) -> Result<Vec<Member>, AccessError>;
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<UserId, UserEntry>,
}

#[derive(Debug, Clone)]
struct UserEntry {
    address: String,
    roles: RoleSet,
}

/// In-memory user store implementing both collaborators.
///
/// Suitable for tests and single-process deployments where users are
/// provisioned from configuration.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a user with the given address and roles.
    pub async fn upsert_user(&self, id: impl Into<UserId>, address: impl Into<String>, roles: RoleSet) {
        let mut state = self.state.write().await;
        state.users.insert(
            id.into(),
            UserEntry {
                address: address.into(),
                roles,
            },
        );
    }

    /// Removes a user. Returns true if the user existed.
    pub async fn remove_user(&self, id: &UserId) -> bool {
        self.state.write().await.users.remove(id).is_some()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryDirectory {
    async fn resolve_roles(&self, actor: &UserId) -> Result<RoleSet, AccessError> {
        let state = self.state.read().await;
        state
            .users
            .get(actor)
            .map(|entry| entry.roles.clone())
            .ok_or_else(|| AccessError::ActorNotFound {
                actor: actor.clone(),
            })
    }
}

#[async_trait]
impl RoleDirectory for InMemoryDirectory {
    async fn members_of_role(&self, role: &RoleCode) -> Result<Vec<Member>, AccessError> {
        let state = self.state.read().await;
        let mut members: Vec<Member> = state
            .users
            .iter()
            .filter(|(_, entry)| entry.roles.contains(role))
            .map(|(id, entry)| Member::new(id.clone(), entry.address.clone()))
            .collect();
        members.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(role = %role, members = members.len(), "resolved role members");
        Ok(members)
    }
}
