//! The content repository collaborator.
//!
//! The engine does not own content. It reads an entity's current workflow
//! state and writes a new one only if the stored state still equals the one
//! it read, so two racing transitions can never both commit.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_core::{ContentRef, StateId, UserId};
use std::collections::HashMap;
use std::fmt;
use tokio::sync::RwLock;

/// Who moved the content, and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionMeta {
    /// Commit time.
    pub at: DateTime<Utc>,
    /// Acting user.
    pub by: UserId,
}

impl TransitionMeta {
    /// Stamps the current time for `by`.
    #[must_use]
    pub fn now(by: UserId) -> Self {
        Self { at: Utc::now(), by }
    }
}

/// Errors from a content repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No such content entity.
    NotFound { content: ContentRef },
    /// The stored state no longer equals the expected state.
    Conflict {
        content: ContentRef,
        expected: StateId,
        actual: StateId,
    },
    /// The repository could not be reached.
    Unavailable { reason: String },
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { content } => write!(f, "content not found: {content}"),
            Self::Conflict {
                content,
                expected,
                actual,
            } => write!(
                f,
                "content {content} is in state {actual}, expected {expected}"
            ),
            Self::Unavailable { reason } => write!(f, "content repository unavailable: {reason}"),
        }
    }
}

impl std::error::Error for RepositoryError {}

/// Reads and conditionally writes a content entity's workflow state.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Returns the entity's current state.
    async fn read_state(&self, content: &ContentRef) -> Result<StateId, RepositoryError>;

    /// Sets the state to `next` iff it currently equals `expected`.
    ///
    /// Must be atomic with respect to other writers of the same entity.
    async fn write_state_if_equals(
        &self,
        content: &ContentRef,
        expected: &StateId,
        next: &StateId,
        meta: &TransitionMeta,
    ) -> Result<(), RepositoryError>;
}

/// Stored workflow fields of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Current workflow state.
    pub current_state: StateId,
    /// Time of the last committed transition.
    pub last_transition_at: Option<DateTime<Utc>>,
    /// Actor of the last committed transition.
    pub last_transition_by: Option<UserId>,
}

/// Process-local content repository.
#[derive(Debug, Default)]
pub struct InMemoryContentRepository {
    entries: RwLock<HashMap<ContentRef, ContentEntry>>,
}

impl InMemoryContentRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entity in the given state.
    pub async fn insert(&self, content: ContentRef, state: impl Into<StateId>) {
        self.entries.write().await.insert(
            content,
            ContentEntry {
                current_state: state.into(),
                last_transition_at: None,
                last_transition_by: None,
            },
        );
    }

    /// Returns a copy of an entity's stored fields.
    pub async fn entry(&self, content: &ContentRef) -> Option<ContentEntry> {
        self.entries.read().await.get(content).cloned()
    }
}

#[async_trait]
impl ContentRepository for InMemoryContentRepository {
    async fn read_state(&self, content: &ContentRef) -> Result<StateId, RepositoryError> {
        self.entries
            .read()
            .await
            .get(content)
            .map(|entry| entry.current_state.clone())
            .ok_or_else(|| RepositoryError::NotFound {
                content: content.clone(),
            })
    }

    async fn write_state_if_equals(
        &self,
        content: &ContentRef,
        expected: &StateId,
        next: &StateId,
        meta: &TransitionMeta,
    ) -> Result<(), RepositoryError> {
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(content) else {
            return Err(RepositoryError::NotFound {
                content: content.clone(),
            });
        };
        if &entry.current_state != expected {
            return Err(RepositoryError::Conflict {
                content: content.clone(),
                expected: expected.clone(),
                actual: entry.current_state.clone(),
            });
        }
        entry.current_state = next.clone();
        entry.last_transition_at = Some(meta.at);
        entry.last_transition_by = Some(meta.by.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product() -> ContentRef {
        ContentRef::new("product", "42")
    }

    #[tokio::test]
    async fn conditional_write_updates_meta() {
        let repository = InMemoryContentRepository::new();
        repository.insert(product(), "draft").await;

        let meta = TransitionMeta::now(UserId::new("alice"));
        repository
            .write_state_if_equals(&product(), &StateId::new("draft"), &StateId::new("review"), &meta)
            .await
            .expect("write");

        let entry = repository.entry(&product()).await.expect("entry");
        assert_eq!(entry.current_state, "review");
        assert_eq!(entry.last_transition_at, Some(meta.at));
        assert_eq!(entry.last_transition_by, Some(UserId::new("alice")));
    }

    #[tokio::test]
    async fn stale_expectation_conflicts() {
        let repository = InMemoryContentRepository::new();
        repository.insert(product(), "review").await;

        let err = repository
            .write_state_if_equals(
                &product(),
                &StateId::new("draft"),
                &StateId::new("review"),
                &TransitionMeta::now(UserId::new("alice")),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RepositoryError::Conflict {
                content: product(),
                expected: StateId::new("draft"),
                actual: StateId::new("review"),
            }
        );
        assert_eq!(
            repository.read_state(&product()).await.expect("read"),
            "review"
        );
    }

    #[tokio::test]
    async fn missing_entity_not_found() {
        let repository = InMemoryContentRepository::new();
        assert_eq!(
            repository.read_state(&product()).await.unwrap_err(),
            RepositoryError::NotFound { content: product() }
        );
        let err = repository
            .write_state_if_equals(
                &product(),
                &StateId::new("draft"),
                &StateId::new("review"),
                &TransitionMeta::now(UserId::new("alice")),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
