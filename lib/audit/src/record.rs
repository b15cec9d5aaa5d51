//! The transition record.

use chrono::{DateTime, Utc};
use folio_core::{ContentRef, StateId, TransitionRecordId, UserId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Immutable audit entry describing one executed transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Unique, time-sortable record id.
    pub id: TransitionRecordId,
    /// The content that moved.
    #[serde(flatten)]
    pub content: ContentRef,
    /// State before the transition.
    pub from_state: StateId,
    /// State after the transition.
    pub to_state: StateId,
    /// Who performed the transition.
    pub actor_id: UserId,
    /// Optional free-text comment supplied by the actor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// When the transition was committed.
    pub timestamp: DateTime<Utc>,
}

impl TransitionRecord {
    /// Creates a record stamped with a fresh id and the current time.
    #[must_use]
    pub fn new(
        content: ContentRef,
        from_state: StateId,
        to_state: StateId,
        actor_id: UserId,
        comment: Option<String>,
    ) -> Self {
        Self {
            id: TransitionRecordId::new(),
            content,
            from_state,
            to_state,
            actor_id,
            comment,
            timestamp: Utc::now(),
        }
    }

    /// Overrides the commit time.
    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// History order: by timestamp, ties broken by id.
    #[must_use]
    pub fn history_order(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.id.cmp(&other.id))
    }
}
