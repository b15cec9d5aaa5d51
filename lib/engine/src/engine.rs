//! The publication engine facade.
//!
//! Bundles the executor, the bulk coordinator and the read side (available
//! transitions, current state, history) behind one type that callers hold
//! as the engine's public surface.

use crate::bulk::{BulkReport, BulkRequest, BulkTransitionCoordinator, CancelHandle};
use crate::config::EngineConfig;
use crate::error::TransitionError;
use crate::executor::{ExecutorStats, TransitionExecutor, TransitionOutcome, TransitionRequest};
use crate::repository::ContentRepository;
use crate::upstream::{Collaborator, bounded};
use folio_access::{IdentityProvider, RoleDirectory};
use folio_audit::{AuditLog, TransitionRecord};
use folio_core::{ContentId, ContentRef, ContentType, StateId, UserId};
use folio_notify::{
    DispatchStats, NotificationDispatcher, NotificationQueue, NotificationTransport,
    NotificationWorker, StatsSnapshot,
};
use folio_workflow::{DefinitionError, Transition, WorkflowRegistry, available_transitions};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// External systems the engine is wired to.
pub struct Collaborators {
    /// Resolves actor roles.
    pub identity: Arc<dyn IdentityProvider>,
    /// Lists role members for notifications.
    pub directory: Arc<dyn RoleDirectory>,
    /// Stores content state.
    pub repository: Arc<dyn ContentRepository>,
    /// Stores transition history.
    pub audit: Arc<dyn AuditLog>,
    /// Delivers notifications.
    pub transport: Arc<dyn NotificationTransport>,
}

/// Combined counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Transition counters.
    pub executor: ExecutorStats,
    /// Notification counters, if notifications are enabled.
    pub notifications: Option<StatsSnapshot>,
}

/// Content publication workflow engine.
pub struct PublicationEngine {
    executor: Arc<TransitionExecutor>,
    bulk: BulkTransitionCoordinator,
    audit: Arc<dyn AuditLog>,
    audit_timeout: Duration,
    notification_stats: Option<Arc<DispatchStats>>,
}

impl PublicationEngine {
    /// Wraps a configured executor.
    ///
    /// `audit` must be the log the executor appends to.
    #[must_use]
    pub fn new(executor: TransitionExecutor, audit: Arc<dyn AuditLog>) -> Self {
        let executor = Arc::new(executor);
        Self {
            bulk: BulkTransitionCoordinator::new(Arc::clone(&executor)),
            executor,
            audit,
            audit_timeout: Duration::from_secs(2),
            notification_stats: None,
        }
    }

    /// Builds the whole engine from configuration and starts the
    /// notification worker. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the workflow configuration is invalid.
    pub fn from_config(
        config: &EngineConfig,
        collaborators: Collaborators,
    ) -> folio_core::Result<(Self, NotificationWorker), DefinitionError> {
        let registry = Arc::new(config.registry()?);

        let dispatcher = NotificationDispatcher::new(
            collaborators.directory,
            collaborators.transport,
            config.notifications.rules.clone(),
        )
        .with_templates(config.notifications.templates.clone())
        .with_timeouts(config.timeouts.dispatcher());
        let (sender, worker) = NotificationQueue::spawn(
            Arc::new(dispatcher),
            config.notifications.queue_capacity,
        );
        let notification_stats = sender.stats();

        let timeouts = config.timeouts.executor();
        let executor = TransitionExecutor::new(
            registry,
            collaborators.identity,
            collaborators.repository,
            Arc::clone(&collaborators.audit),
        )
        .with_timeouts(timeouts)
        .with_notifications(sender);

        let mut engine = Self::new(executor, collaborators.audit);
        engine.bulk = engine.bulk.with_max_concurrency(config.bulk.max_concurrency);
        engine.audit_timeout = timeouts.audit;
        engine.notification_stats = Some(notification_stats);

        info!(
            workflows = engine.registry().workflows().count(),
            content_types = engine.registry().content_types().len(),
            "publication engine ready"
        );
        Ok((engine, worker))
    }

    /// Sets the bulk concurrency.
    #[must_use]
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.bulk = self.bulk.with_max_concurrency(max_concurrency);
        self
    }

    /// Returns the workflow registry.
    #[must_use]
    pub fn registry(&self) -> &WorkflowRegistry {
        self.executor.registry()
    }

    /// Moves one entity to a new state.
    ///
    /// # Errors
    ///
    /// See `TransitionExecutor::execute_transition`.
    pub async fn execute_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError> {
        self.executor.execute_transition(request).await
    }

    /// Moves many entities of one type to a new state.
    pub async fn bulk_transition(
        &self,
        request: BulkRequest,
        cancel: Option<CancelHandle>,
    ) -> BulkReport {
        self.bulk.bulk_transition(request, cancel).await
    }

    /// Returns the edges the actor may take from the entity's current state.
    ///
    /// # Errors
    ///
    /// Not-found and upstream errors as for a transition.
    pub async fn available_transitions(
        &self,
        content_type: &ContentType,
        content_id: &ContentId,
        actor: &UserId,
    ) -> Result<Vec<Transition>, TransitionError> {
        let roles = self.executor.resolve_roles(actor).await?;
        let content = ContentRef::new(content_type.clone(), content_id.clone());
        let (workflow, state) = self.executor.current_state(&content).await?;
        Ok(available_transitions(&workflow, &state, &roles)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Returns the entity's current state.
    ///
    /// # Errors
    ///
    /// Not-found and upstream errors as for a transition.
    pub async fn current_state(
        &self,
        content_type: &ContentType,
        content_id: &ContentId,
    ) -> Result<StateId, TransitionError> {
        let content = ContentRef::new(content_type.clone(), content_id.clone());
        let (_, state) = self.executor.current_state(&content).await?;
        Ok(state)
    }

    /// Returns the entity's transition history, oldest first.
    ///
    /// # Errors
    ///
    /// `Upstream` if the audit log fails or times out.
    pub async fn history(
        &self,
        content_type: &ContentType,
        content_id: &ContentId,
    ) -> Result<Vec<TransitionRecord>, TransitionError> {
        let content = ContentRef::new(content_type.clone(), content_id.clone());
        bounded(
            Collaborator::Audit,
            self.audit_timeout,
            self.audit.history(&content),
        )
        .await?
        .map_err(|e| TransitionError::Upstream {
            collaborator: Collaborator::Audit,
            reason: e.to_string(),
        })
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            executor: self.executor.stats(),
            notifications: self.notification_stats.as_ref().map(|s| s.snapshot()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::executor::{AuditStatus, NotificationStatus};
    use crate::repository::InMemoryContentRepository;
    use async_trait::async_trait;
    use folio_access::{InMemoryDirectory, RoleSet};
    use folio_audit::InMemoryAuditLog;
    use folio_notify::{NotificationRules, TransportError};
    use folio_workflow::default_workflow;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationTransport for RecordingTransport {
        async fn send(&self, address: &str, subject: &str, _: &str) -> Result<(), TransportError> {
            self.sent
                .lock()
                .expect("lock")
                .push((address.to_string(), subject.to_string()));
            Ok(())
        }
    }

    struct Harness {
        engine: PublicationEngine,
        worker: NotificationWorker,
        repository: Arc<InMemoryContentRepository>,
        transport: Arc<RecordingTransport>,
    }

    fn config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.workflows.push(default_workflow());
        config
            .content_types
            .insert(ContentType::new("product"), "default".to_string());
        config.notifications.rules = NotificationRules::new()
            .with_rule("review", ["reviewer"])
            .with_rule("published", ["editor"]);
        config
    }

    async fn harness() -> Harness {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .upsert_user("alice", "alice@example.com", RoleSet::from_codes(["editor"]))
            .await;
        directory
            .upsert_user("bob", "bob@example.com", RoleSet::from_codes(["reviewer"]))
            .await;
        let repository = Arc::new(InMemoryContentRepository::new());
        repository.insert(ContentRef::new("product", "42"), "draft").await;
        let transport = Arc::new(RecordingTransport::default());

        let (engine, worker) = PublicationEngine::from_config(
            &config(),
            Collaborators {
                identity: directory.clone(),
                directory,
                repository: repository.clone(),
                audit: Arc::new(InMemoryAuditLog::new()),
                transport: transport.clone(),
            },
        )
        .expect("valid config");

        Harness {
            engine,
            worker,
            repository,
            transport,
        }
    }

    fn product() -> (ContentType, ContentId) {
        (ContentType::new("product"), ContentId::new("42"))
    }

    #[tokio::test]
    async fn editor_submits_then_cannot_approve() {
        let h = harness().await;
        let (content_type, content_id) = product();

        let outcome = h
            .engine
            .execute_transition(TransitionRequest::new("product", "42", "review", "alice"))
            .await
            .expect("committed");
        assert_eq!(outcome.audit, AuditStatus::Recorded);
        assert_eq!(outcome.notification, NotificationStatus::Queued);

        let err = h
            .engine
            .execute_transition(TransitionRequest::new("product", "42", "approved", "alice"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        assert_eq!(
            h.engine
                .current_state(&content_type, &content_id)
                .await
                .expect("state"),
            "review"
        );
        let history = h
            .engine
            .history(&content_type, &content_id)
            .await
            .expect("history");
        assert_eq!(history.len(), 1);

        h.worker.shutdown().await;
        let sent = h.transport.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "bob@example.com");
        assert_eq!(sent[0].1, "Review requested: product 42");

        let stats = h.engine.stats();
        assert_eq!(stats.executor.committed, 1);
        assert_eq!(stats.executor.rejected, 1);
        assert_eq!(stats.notifications.map(|n| n.delivered), Some(1));
    }

    #[tokio::test]
    async fn available_transitions_follow_roles() {
        let h = harness().await;
        let (content_type, content_id) = product();

        let editor: Vec<StateId> = h
            .engine
            .available_transitions(&content_type, &content_id, &UserId::new("alice"))
            .await
            .expect("transitions")
            .into_iter()
            .map(|t| t.to)
            .collect();
        assert_eq!(editor, vec![StateId::new("review")]);

        let reviewer = h
            .engine
            .available_transitions(&content_type, &content_id, &UserId::new("bob"))
            .await
            .expect("transitions");
        assert!(reviewer.is_empty());

        let err = h
            .engine
            .available_transitions(&content_type, &content_id, &UserId::new("nobody"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn bulk_through_facade() {
        let h = harness().await;
        h.repository.insert(ContentRef::new("product", "43"), "draft").await;

        let report = h
            .engine
            .bulk_transition(
                BulkRequest::new("product", ["42", "43", "44"], "review", "alice"),
                None,
            )
            .await;
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);
        assert_eq!(h.engine.stats().executor.committed, 2);
    }

    #[tokio::test]
    async fn unknown_content_type_not_found() {
        let h = harness().await;
        let err = h
            .engine
            .current_state(&ContentType::new("widget"), &ContentId::new("1"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransitionError::UnknownContentType {
                content_type: ContentType::new("widget")
            }
        );
    }

    #[tokio::test]
    async fn manual_wiring_without_notifications() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .upsert_user("alice", "alice@example.com", RoleSet::from_codes(["editor"]))
            .await;
        let repository = Arc::new(InMemoryContentRepository::new());
        repository.insert(ContentRef::new("product", "1"), "draft").await;
        let audit = Arc::new(InMemoryAuditLog::new());
        let registry = Arc::new(config().registry().expect("valid registry"));

        let executor = TransitionExecutor::new(registry, directory, repository, audit.clone());
        let engine = PublicationEngine::new(executor, audit).with_max_concurrency(1);

        let outcome = engine
            .execute_transition(TransitionRequest::new("product", "1", "review", "alice"))
            .await
            .expect("committed");
        assert_eq!(outcome.notification, NotificationStatus::Disabled);
        assert_eq!(engine.stats().notifications, None);
        assert_eq!(engine.registry().workflows().count(), 1);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = config();
        config
            .content_types
            .insert(ContentType::new("page"), "editorial".to_string());
        let directory = Arc::new(InMemoryDirectory::new());

        let result = PublicationEngine::from_config(
            &config,
            Collaborators {
                identity: directory.clone(),
                directory,
                repository: Arc::new(InMemoryContentRepository::new()),
                audit: Arc::new(InMemoryAuditLog::new()),
                transport: Arc::new(RecordingTransport::default()),
            },
        );
        let Err(err) = result else {
            panic!("config should be rejected");
        };
        assert!(err.to_string().contains("editorial"));
    }
}
