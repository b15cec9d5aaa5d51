//! Bulk transitions.
//!
//! Moves many entities of one content type to the same state. Every item is
//! an independent `execute_transition` call that re-reads its own current
//! state, so one failure never affects another. At most `max_concurrency`
//! items are in flight at once and the report keeps input order.

use crate::error::TransitionError;
use crate::executor::{TransitionExecutor, TransitionRequest};
use folio_core::{ContentId, ContentType, StateId, UserId};
use futures::StreamExt;
use futures::stream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument};

/// Default number of items in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Stops a bulk run from starting further items.
///
/// Items already in flight complete normally.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Creates an untriggered handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once `cancel` was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Moves `content_ids` of one type to `to_state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRequest {
    /// Content type of every item.
    pub content_type: ContentType,
    /// Items, in report order.
    pub content_ids: Vec<ContentId>,
    /// Destination state.
    pub to_state: StateId,
    /// Acting user.
    pub actor_id: UserId,
    /// Comment applied to every item.
    pub comment: Option<String>,
}

impl BulkRequest {
    /// Creates a request without a comment.
    #[must_use]
    pub fn new<I, C>(
        content_type: impl Into<ContentType>,
        content_ids: I,
        to_state: impl Into<StateId>,
        actor_id: impl Into<UserId>,
    ) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ContentId>,
    {
        Self {
            content_type: content_type.into(),
            content_ids: content_ids.into_iter().map(Into::into).collect(),
            to_state: to_state.into(),
            actor_id: actor_id.into(),
            comment: None,
        }
    }

    /// Attaches a comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    fn item(&self, content_id: ContentId) -> TransitionRequest {
        TransitionRequest {
            content_type: self.content_type.clone(),
            content_id,
            to_state: self.to_state.clone(),
            actor_id: self.actor_id.clone(),
            comment: self.comment.clone(),
        }
    }
}

/// Outcome for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    /// The item.
    pub content_id: ContentId,
    /// Whether its transition committed.
    pub success: bool,
    /// Why it did not.
    pub error: Option<TransitionError>,
}

/// Per-item outcomes in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkReport {
    /// One entry per requested id.
    pub items: Vec<BulkItem>,
}

impl BulkReport {
    /// Number of committed items.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.items.iter().filter(|item| item.success).count()
    }

    /// Number of failed items.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.items.len() - self.succeeded()
    }

    /// True if every item committed.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.items.iter().all(|item| item.success)
    }

    /// Iterates the failed items with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&ContentId, &TransitionError)> {
        self.items
            .iter()
            .filter_map(|item| item.error.as_ref().map(|err| (&item.content_id, err)))
    }
}

/// Fans a bulk request out over the executor.
pub struct BulkTransitionCoordinator {
    executor: Arc<TransitionExecutor>,
    max_concurrency: usize,
}

impl BulkTransitionCoordinator {
    /// Creates a coordinator with the default concurrency.
    #[must_use]
    pub fn new(executor: Arc<TransitionExecutor>) -> Self {
        Self {
            executor,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Sets the number of items in flight. Zero is treated as one.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Runs every item and reports each outcome. Never fails as a whole.
    #[instrument(
        skip_all,
        fields(
            content_type = %request.content_type,
            to_state = %request.to_state,
            items = request.content_ids.len(),
        )
    )]
    pub async fn bulk_transition(
        &self,
        request: BulkRequest,
        cancel: Option<CancelHandle>,
    ) -> BulkReport {
        let request = &request;
        let cancel = cancel.as_ref();

        // `buffered` creates each future only when a slot frees up, so the
        // cancel check runs at launch time, not at submission.
        let items: Vec<BulkItem> = stream::iter(request.content_ids.iter().cloned())
            .map(|content_id| async move {
                if cancel.is_some_and(CancelHandle::is_cancelled) {
                    return BulkItem {
                        content_id,
                        success: false,
                        error: Some(TransitionError::Cancelled),
                    };
                }
                let result = self
                    .executor
                    .execute_transition(request.item(content_id.clone()))
                    .await;
                match result {
                    Ok(_) => BulkItem {
                        content_id,
                        success: true,
                        error: None,
                    },
                    Err(err) => BulkItem {
                        content_id,
                        success: false,
                        error: Some(err),
                    },
                }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let report = BulkReport { items };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "bulk transition finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::repository::{
        ContentRepository, InMemoryContentRepository, RepositoryError, TransitionMeta,
    };
    use async_trait::async_trait;
    use folio_access::{InMemoryDirectory, RoleSet};
    use folio_audit::{AuditLog, InMemoryAuditLog};
    use folio_core::ContentRef;
    use folio_workflow::{WorkflowRegistry, default_workflow};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn registry() -> Arc<WorkflowRegistry> {
        Arc::new(
            WorkflowRegistry::builder()
                .workflow(default_workflow())
                .content_type("product", "default")
                .build()
                .expect("valid registry"),
        )
    }

    async fn directory() -> Arc<InMemoryDirectory> {
        let directory = InMemoryDirectory::new();
        directory
            .upsert_user("alice", "alice@example.com", RoleSet::from_codes(["editor"]))
            .await;
        Arc::new(directory)
    }

    /// Delays every write and tracks how many run at once.
    struct GaugedRepository {
        inner: InMemoryContentRepository,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl ContentRepository for GaugedRepository {
        async fn read_state(&self, content: &ContentRef) -> Result<StateId, RepositoryError> {
            self.inner.read_state(content).await
        }

        async fn write_state_if_equals(
            &self,
            content: &ContentRef,
            expected: &StateId,
            next: &StateId,
            meta: &TransitionMeta,
        ) -> Result<(), RepositoryError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.inner
                .write_state_if_equals(content, expected, next, meta)
                .await
        }
    }

    #[tokio::test]
    async fn missing_items_fail_independently() {
        let repository = Arc::new(InMemoryContentRepository::new());
        for id in ["1", "2", "4"] {
            repository.insert(ContentRef::new("product", id), "draft").await;
        }
        let audit = Arc::new(InMemoryAuditLog::new());
        let executor = Arc::new(TransitionExecutor::new(
            registry(),
            directory().await,
            repository.clone(),
            audit.clone(),
        ));
        let coordinator = BulkTransitionCoordinator::new(executor);

        let report = coordinator
            .bulk_transition(
                BulkRequest::new("product", ["1", "2", "3", "4", "5"], "review", "alice"),
                None,
            )
            .await;

        assert_eq!(report.items.len(), 5);
        assert_eq!(report.succeeded(), 3);
        assert_eq!(report.failed(), 2);
        assert!(!report.is_complete_success());

        let ids: Vec<&str> = report.items.iter().map(|i| i.content_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);

        let failed: Vec<&str> = report.failures().map(|(id, _)| id.as_str()).collect();
        assert_eq!(failed, vec!["3", "5"]);
        assert!(
            report
                .failures()
                .all(|(_, err)| err.kind() == ErrorKind::NotFound)
        );

        for id in ["1", "2", "4"] {
            let content = ContentRef::new("product", id);
            assert_eq!(repository.read_state(&content).await.expect("read"), "review");
            assert_eq!(audit.history(&content).await.expect("history").len(), 1);
        }
    }

    #[tokio::test]
    async fn each_item_uses_its_own_current_state() {
        let repository = Arc::new(InMemoryContentRepository::new());
        repository.insert(ContentRef::new("product", "1"), "draft").await;
        repository.insert(ContentRef::new("product", "2"), "published").await;
        let executor = Arc::new(TransitionExecutor::new(
            registry(),
            directory().await,
            repository.clone(),
            Arc::new(InMemoryAuditLog::new()),
        ));

        let report = BulkTransitionCoordinator::new(executor)
            .bulk_transition(BulkRequest::new("product", ["1", "2"], "review", "alice"), None)
            .await;

        assert!(report.items[0].success);
        assert_eq!(
            report.items[1].error.as_ref().map(TransitionError::kind),
            Some(ErrorKind::InvalidTransition)
        );
    }

    #[tokio::test]
    async fn concurrency_is_bounded() {
        let inner = InMemoryContentRepository::new();
        let ids: Vec<String> = (0..12).map(|i| i.to_string()).collect();
        for id in &ids {
            inner.insert(ContentRef::new("product", id.as_str()), "draft").await;
        }
        let repository = Arc::new(GaugedRepository {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let executor = Arc::new(TransitionExecutor::new(
            registry(),
            directory().await,
            repository.clone(),
            Arc::new(InMemoryAuditLog::new()),
        ));

        let report = BulkTransitionCoordinator::new(executor)
            .with_max_concurrency(3)
            .bulk_transition(BulkRequest::new("product", ids, "review", "alice"), None)
            .await;

        assert!(report.is_complete_success());
        let peak = repository.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak {peak}");
        assert!(peak > 1, "items should overlap");
    }

    #[tokio::test]
    async fn cancelled_before_start_runs_nothing() {
        let repository = Arc::new(InMemoryContentRepository::new());
        repository.insert(ContentRef::new("product", "1"), "draft").await;
        let executor = Arc::new(TransitionExecutor::new(
            registry(),
            directory().await,
            repository.clone(),
            Arc::new(InMemoryAuditLog::new()),
        ));
        let cancel = CancelHandle::new();
        cancel.cancel();

        let report = BulkTransitionCoordinator::new(executor)
            .bulk_transition(
                BulkRequest::new("product", ["1", "2"], "review", "alice"),
                Some(cancel),
            )
            .await;

        assert_eq!(report.failed(), 2);
        assert!(
            report
                .items
                .iter()
                .all(|item| item.error == Some(TransitionError::Cancelled))
        );
        assert_eq!(
            repository
                .read_state(&ContentRef::new("product", "1"))
                .await
                .expect("read"),
            "draft"
        );
    }

    #[tokio::test]
    async fn cancel_mid_run_lets_in_flight_finish() {
        let inner = InMemoryContentRepository::new();
        let ids: Vec<String> = (0..6).map(|i| i.to_string()).collect();
        for id in &ids {
            inner.insert(ContentRef::new("product", id.as_str()), "draft").await;
        }
        let repository = Arc::new(GaugedRepository {
            inner,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let executor = Arc::new(TransitionExecutor::new(
            registry(),
            directory().await,
            repository.clone(),
            Arc::new(InMemoryAuditLog::new()),
        ));
        let coordinator = BulkTransitionCoordinator::new(executor).with_max_concurrency(2);
        let cancel = CancelHandle::new();

        let canceller = {
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                cancel.cancel();
            }
        };
        let (report, ()) = tokio::join!(
            coordinator.bulk_transition(
                BulkRequest::new("product", ids, "review", "alice"),
                Some(cancel),
            ),
            canceller
        );

        // The first two were in flight when cancel fired.
        assert!(report.items[0].success);
        assert!(report.items[1].success);
        assert!(report.failed() >= 1);
        assert!(
            report
                .failures()
                .all(|(_, err)| *err == TransitionError::Cancelled)
        );
        assert_eq!(report.items.len(), 6);
    }
}
