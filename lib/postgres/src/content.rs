//! Content workflow state in PostgreSQL.

use async_trait::async_trait;
use folio_core::{ContentRef, StateId};
use folio_engine::{ContentRepository, RepositoryError, TransitionMeta};
use sqlx::PgPool;
use tracing::debug;

/// Conditional updates tried before a write that keeps missing is reported
/// as a conflict.
const WRITE_ATTEMPTS: usize = 2;

/// Content repository backed by the `content_workflow_state` table.
#[derive(Debug, Clone)]
pub struct PgContentRepository {
    pool: PgPool,
}

impl PgContentRepository {
    /// Creates a new repository.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers an entity in its initial state. Existing rows are left
    /// untouched. Returns true if a row was inserted.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn register(
        &self,
        content: &ContentRef,
        initial_state: &StateId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO content_workflow_state (content_type, content_id, current_state)
            VALUES ($1, $2, $3)
            ON CONFLICT (content_type, content_id) DO NOTHING
            "#,
        )
        .bind(content.content_type.as_str())
        .bind(content.content_id.as_str())
        .bind(initial_state.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn select_state(&self, content: &ContentRef) -> Result<Option<StateId>, sqlx::Error> {
        let state: Option<String> = sqlx::query_scalar(
            r#"
            SELECT current_state
            FROM content_workflow_state
            WHERE content_type = $1 AND content_id = $2
            "#,
        )
        .bind(content.content_type.as_str())
        .bind(content.content_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(state.map(StateId::new))
    }

    /// Returns true if the row was in `expected` and now holds `next`.
    async fn update_state(
        &self,
        content: &ContentRef,
        expected: &StateId,
        next: &StateId,
        meta: &TransitionMeta,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE content_workflow_state
            SET current_state = $4, last_transition_at = $5, last_transition_by = $6
            WHERE content_type = $1 AND content_id = $2 AND current_state = $3
            "#,
        )
        .bind(content.content_type.as_str())
        .bind(content.content_id.as_str())
        .bind(expected.as_str())
        .bind(next.as_str())
        .bind(meta.at)
        .bind(meta.by.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

fn unavailable(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Unavailable {
        reason: err.to_string(),
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    async fn read_state(&self, content: &ContentRef) -> Result<StateId, RepositoryError> {
        self.select_state(content)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| RepositoryError::NotFound {
                content: content.clone(),
            })
    }

    /// If another writer moves the row away and back to `expected` between
    /// the update and the follow-up read, the update is retried. A row that
    /// keeps doing so is reported as `Conflict` with `actual == expected`.
    async fn write_state_if_equals(
        &self,
        content: &ContentRef,
        expected: &StateId,
        next: &StateId,
        meta: &TransitionMeta,
    ) -> Result<(), RepositoryError> {
        for attempt in 1..=WRITE_ATTEMPTS {
            if self
                .update_state(content, expected, next, meta)
                .await
                .map_err(unavailable)?
            {
                return Ok(());
            }

            let actual = self.select_state(content).await.map_err(unavailable)?;
            debug!(content = %content, ?actual, attempt, "conditional state write matched no row");
            if let Some(err) = write_miss(content, expected, actual) {
                return Err(err);
            }
        }

        Err(RepositoryError::Conflict {
            content: content.clone(),
            expected: expected.clone(),
            actual: expected.clone(),
        })
    }
}

/// Classifies a conditional update that matched no row. Returns `None` when
/// the row is back in `expected`, meaning the update is worth retrying.
fn write_miss(
    content: &ContentRef,
    expected: &StateId,
    actual: Option<StateId>,
) -> Option<RepositoryError> {
    match actual {
        None => Some(RepositoryError::NotFound {
            content: content.clone(),
        }),
        Some(actual) if actual == *expected => None,
        Some(actual) => Some(RepositoryError::Conflict {
            content: content.clone(),
            expected: expected.clone(),
            actual,
        }),
    }
}
