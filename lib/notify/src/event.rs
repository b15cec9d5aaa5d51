//! The event emitted for every committed transition.

use chrono::{DateTime, Utc};
use folio_core::{ContentRef, StateId, UserId};
use serde::{Deserialize, Serialize};

/// A committed state change, as seen by the notification side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// The content that moved.
    #[serde(flatten)]
    pub content: ContentRef,
    /// State before the transition.
    pub from_state: StateId,
    /// State after the transition.
    pub to_state: StateId,
    /// Who performed it. Never notified about their own action.
    pub actor_id: UserId,
    /// Optional comment supplied by the actor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// When the transition was committed.
    pub occurred_at: DateTime<Utc>,
}

impl TransitionEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn new(content: ContentRef, from_state: StateId, to_state: StateId, actor_id: UserId) -> Self {
        Self {
            content,
            from_state,
            to_state,
            actor_id,
            comment: None,
            occurred_at: Utc::now(),
        }
    }

    /// Attaches a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    /// Overrides the commit time.
    #[must_use]
    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }
}
