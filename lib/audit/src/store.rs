//! The audit log abstraction and its in-memory implementation.

use crate::error::AuditError;
use crate::record::TransitionRecord;
use async_trait::async_trait;
use folio_core::{ContentRef, TransitionRecordId};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Append-only store of transition records.
///
/// Records are write-once: implementations reject a second append with the
/// same record id and never expose update or delete.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Appends a record.
    async fn append(&self, record: TransitionRecord) -> Result<(), AuditError>;

    /// Returns every record for a content entity, oldest first.
    async fn history(&self, content: &ContentRef) -> Result<Vec<TransitionRecord>, AuditError>;
}

#[derive(Debug, Default)]
struct LogState {
    by_content: HashMap<ContentRef, Vec<TransitionRecord>>,
    ids: HashSet<TransitionRecordId>,
}

/// Process-local audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    state: RwLock<LogState>,
}

impl InMemoryAuditLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of records across all content.
    pub async fn len(&self) -> usize {
        self.state.read().await.ids.len()
    }

    /// Returns true if no record was ever appended.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, record: TransitionRecord) -> Result<(), AuditError> {
        let mut state = self.state.write().await;
        if !state.ids.insert(record.id) {
            return Err(AuditError::DuplicateRecord { id: record.id });
        }

        let entries = state.by_content.entry(record.content.clone()).or_default();
        // Appends are usually already in order; this keeps history sorted when
        // concurrent writers commit out of order.
        let position = entries.partition_point(|existing| existing.history_order(&record).is_le());
        entries.insert(position, record);
        Ok(())
    }

    async fn history(&self, content: &ContentRef) -> Result<Vec<TransitionRecord>, AuditError> {
        let state = self.state.read().await;
        Ok(state.by_content.get(content).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use folio_core::{StateId, UserId};

    fn record(content: &ContentRef, from: &str, to: &str) -> TransitionRecord {
        TransitionRecord::new(
            content.clone(),
            StateId::new(from),
            StateId::new(to),
            UserId::new("alice"),
            None,
        )
    }

    #[tokio::test]
    async fn history_is_per_content_and_ascending() {
        let log = InMemoryAuditLog::new();
        let product = ContentRef::new("product", "42");
        let page = ContentRef::new("page", "42");

        log.append(record(&product, "draft", "review")).await.expect("append");
        log.append(record(&page, "draft", "review")).await.expect("append");
        log.append(record(&product, "review", "approved")).await.expect("append");

        let history = log.history(&product).await.expect("history");
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].to_state, "review");
        assert_eq!(history[1].to_state, "approved");
        assert_eq!(log.len().await, 3);
    }

    #[tokio::test]
    async fn out_of_order_appends_are_sorted() {
        let log = InMemoryAuditLog::new();
        let content = ContentRef::new("product", "7");
        let now = Utc::now();

        let late = record(&content, "review", "approved").at(now);
        let early = record(&content, "draft", "review").at(now - Duration::seconds(5));
        log.append(late).await.expect("append");
        log.append(early).await.expect("append");

        let history = log.history(&content).await.expect("history");
        let states: Vec<&str> = history.iter().map(|r| r.from_state.as_str()).collect();
        assert_eq!(states, vec!["draft", "review"]);
    }

    #[tokio::test]
    async fn duplicate_append_rejected() {
        let log = InMemoryAuditLog::new();
        let content = ContentRef::new("product", "1");
        let entry = record(&content, "draft", "review");

        log.append(entry.clone()).await.expect("first append");
        let err = log.append(entry.clone()).await.unwrap_err();
        assert_eq!(err, AuditError::DuplicateRecord { id: entry.id });
        assert_eq!(log.history(&content).await.expect("history").len(), 1);
    }

    #[tokio::test]
    async fn unknown_content_has_empty_history() {
        let log = InMemoryAuditLog::new();
        assert!(log.is_empty().await);
        let history = log
            .history(&ContentRef::new("product", "none"))
            .await
            .expect("history");
        assert!(history.is_empty());
    }
}
