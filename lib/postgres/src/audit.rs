//! Transition history in PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use folio_audit::{AuditError, AuditLog, TransitionRecord};
use folio_core::{ContentRef, StateId, TransitionRecordId, UserId};
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// Audit log backed by the `transition_records` table.
#[derive(Debug, Clone)]
pub struct PgAuditLog {
    pool: PgPool,
}

impl PgAuditLog {
    /// Creates a new audit log.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Row type for history queries.
#[derive(FromRow)]
struct RecordRow {
    id: String,
    content_type: String,
    content_id: String,
    from_state: String,
    to_state: String,
    actor_id: String,
    comment: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl RecordRow {
    fn try_into_record(self) -> Result<TransitionRecord, AuditError> {
        let id = TransitionRecordId::from_str(&self.id).map_err(|e| AuditError::LoadFailed {
            message: format!("invalid record id '{}': {e}", self.id),
        })?;

        Ok(TransitionRecord {
            id,
            content: ContentRef::new(self.content_type, self.content_id),
            from_state: StateId::new(self.from_state),
            to_state: StateId::new(self.to_state),
            actor_id: UserId::new(self.actor_id),
            comment: self.comment,
            timestamp: self.occurred_at,
        })
    }
}

#[async_trait]
impl AuditLog for PgAuditLog {
    async fn append(&self, record: TransitionRecord) -> Result<(), AuditError> {
        sqlx::query(
            r#"
            INSERT INTO transition_records
                (id, content_type, content_id, from_state, to_state, actor_id, comment, occurred_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.content.content_type.as_str())
        .bind(record.content.content_id.as_str())
        .bind(record.from_state.as_str())
        .bind(record.to_state.as_str())
        .bind(record.actor_id.as_str())
        .bind(&record.comment)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AuditError::DuplicateRecord { id: record.id }
            }
            _ => AuditError::AppendFailed {
                message: e.to_string(),
            },
        })?;

        Ok(())
    }

    async fn history(&self, content: &ContentRef) -> Result<Vec<TransitionRecord>, AuditError> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            r#"
            SELECT id, content_type, content_id, from_state, to_state, actor_id, comment, occurred_at
            FROM transition_records
            WHERE content_type = $1 AND content_id = $2
            ORDER BY occurred_at ASC, id ASC
            "#,
        )
        .bind(content.content_type.as_str())
        .bind(content.content_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AuditError::LoadFailed {
            message: e.to_string(),
        })?;

        rows.into_iter().map(RecordRow::try_into_record).collect()
    }
}
