//! The state transition executor.
//!
//! One call moves one content entity along one edge:
//!
//! 1. resolve the actor's roles
//! 2. resolve the workflow and read the current state
//! 3. authorize the edge (no mutation before this passes)
//! 4. compare-and-swap the stored state
//! 5. append the audit record
//! 6. emit the notification event
//!
//! Steps 1-4 decide the result. Steps 5 and 6 run only after a commit and
//! can degrade, but never turn a committed transition into an error.

use crate::error::TransitionError;
use crate::repository::{ContentRepository, TransitionMeta};
use crate::upstream::{Collaborator, ExecutorTimeouts, bounded};
use folio_access::{IdentityProvider, RoleSet};
use folio_audit::{AuditLog, TransitionRecord};
use folio_core::{ContentId, ContentRef, ContentType, StateId, TransitionRecordId, UserId};
use folio_notify::{NotificationSender, TransitionEvent};
use folio_workflow::{Decision, WorkflowDefinition, WorkflowRegistry, evaluate};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, instrument, warn};

/// A request to move one entity to a new state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    /// Content type, selecting the workflow.
    pub content_type: ContentType,
    /// Entity id within the content type.
    pub content_id: ContentId,
    /// Requested destination state.
    pub to_state: StateId,
    /// Acting user.
    pub actor_id: UserId,
    /// Optional comment, stored in the audit record and sent in notifications.
    pub comment: Option<String>,
}

impl TransitionRequest {
    /// Creates a request without a comment.
    #[must_use]
    pub fn new(
        content_type: impl Into<ContentType>,
        content_id: impl Into<ContentId>,
        to_state: impl Into<StateId>,
        actor_id: impl Into<UserId>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            content_id: content_id.into(),
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

    /// The entity this request targets.
    #[must_use]
    pub fn content(&self) -> ContentRef {
        ContentRef {
            content_type: self.content_type.clone(),
            content_id: self.content_id.clone(),
        }
    }
}

/// Whether the audit record was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    /// The record is in the audit log.
    Recorded,
    /// The append failed or timed out. The transition still committed.
    Degraded,
}

/// What happened to the notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStatus {
    /// The event is on the queue.
    Queued,
    /// The queue was full or closed.
    Dropped,
    /// The executor has no notification queue.
    Disabled,
}

/// A committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The entity that moved.
    pub content: ContentRef,
    /// State before.
    pub from_state: StateId,
    /// State after.
    pub to_state: StateId,
    /// Id of the audit record, if it was written.
    pub record_id: Option<TransitionRecordId>,
    /// Audit side effect.
    pub audit: AuditStatus,
    /// Notification side effect.
    pub notification: NotificationStatus,
}

impl TransitionOutcome {
    /// Returns true if either side effect degraded.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.audit == AuditStatus::Degraded || self.notification == NotificationStatus::Dropped
    }
}

#[derive(Debug, Default)]
struct Counters {
    committed: AtomicU64,
    rejected: AtomicU64,
    audit_degraded: AtomicU64,
    notifications_dropped: AtomicU64,
}

/// Point-in-time executor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Transitions that committed.
    pub committed: u64,
    /// Requests that failed before or at the write.
    pub rejected: u64,
    /// Commits whose audit append failed.
    pub audit_degraded: u64,
    /// Commits whose notification event was dropped.
    pub notifications_dropped: u64,
}

/// Executes single transitions against the injected collaborators.
pub struct TransitionExecutor {
    registry: Arc<WorkflowRegistry>,
    identity: Arc<dyn IdentityProvider>,
    repository: Arc<dyn ContentRepository>,
    audit: Arc<dyn AuditLog>,
    notifications: Option<NotificationSender>,
    timeouts: ExecutorTimeouts,
    counters: Counters,
}

impl TransitionExecutor {
    /// Creates an executor without notifications and with default timeouts.
    #[must_use]
    pub fn new(
        registry: Arc<WorkflowRegistry>,
        identity: Arc<dyn IdentityProvider>,
        repository: Arc<dyn ContentRepository>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            registry,
            identity,
            repository,
            audit,
            notifications: None,
            timeouts: ExecutorTimeouts::default(),
            counters: Counters::default(),
        }
    }

    /// Emits an event for every committed transition onto `sender`.
    #[must_use]
    pub fn with_notifications(mut self, sender: NotificationSender) -> Self {
        self.notifications = Some(sender);
        self
    }

    /// Replaces the collaborator timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: ExecutorTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Returns the workflow registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<WorkflowRegistry> {
        &self.registry
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            committed: self.counters.committed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            audit_degraded: self.counters.audit_degraded.load(Ordering::Relaxed),
            notifications_dropped: self.counters.notifications_dropped.load(Ordering::Relaxed),
        }
    }

    /// Moves one entity to `request.to_state`.
    ///
    /// The audit append is awaited before returning, so a committed call can
    /// take up to the configured audit timeout longer than the write itself.
    /// An audit failure or timeout still returns the committed outcome with
    /// `AuditStatus::Degraded`. Notification delivery never adds latency;
    /// the event is only queued.
    ///
    /// # Errors
    ///
    /// Returns a `TransitionError` when the transition did not commit. No
    /// state was changed in that case.
    #[instrument(
        skip_all,
        fields(
            content_type = %request.content_type,
            content_id = %request.content_id,
            to_state = %request.to_state,
            actor = %request.actor_id,
        )
    )]
    pub async fn execute_transition(
        &self,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TransitionError> {
        let result = self.commit(&request).await;
        match result {
            Ok((content, from_state, meta)) => {
                self.counters.committed.fetch_add(1, Ordering::Relaxed);
                info!(from_state = %from_state, "transition committed");
                Ok(self.after_commit(request, content, from_state, meta).await)
            }
            Err(err) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                debug!(error = %err, kind = %err.kind(), "transition rejected");
                Err(err)
            }
        }
    }

    /// Resolves an actor's roles.
    ///
    /// # Errors
    ///
    /// `ActorNotFound`, or `Upstream` on identity failure or timeout.
    pub async fn resolve_roles(&self, actor: &UserId) -> Result<RoleSet, TransitionError> {
        let roles = bounded(
            Collaborator::Identity,
            self.timeouts.identity,
            self.identity.resolve_roles(actor),
        )
        .await??;
        Ok(roles)
    }

    /// Reads an entity's stored state and checks it against its workflow.
    ///
    /// # Errors
    ///
    /// `UnknownContentType`, `ContentNotFound`, `UnknownCurrentState`, or
    /// `Upstream` on repository failure or timeout.
    pub async fn current_state(
        &self,
        content: &ContentRef,
    ) -> Result<(Arc<WorkflowDefinition>, StateId), TransitionError> {
        let workflow = self.registry.get(&content.content_type)?;
        let state = bounded(
            Collaborator::Repository,
            self.timeouts.repository,
            self.repository.read_state(content),
        )
        .await??;

        if !workflow.has_state(&state) {
            warn!(state = %state, workflow = %workflow.name, "stored state unknown to workflow");
            return Err(TransitionError::UnknownCurrentState {
                workflow: workflow.name.clone(),
                state,
            });
        }
        Ok((workflow, state))
    }

    /// Steps 1-4. Returns what `after_commit` needs.
    async fn commit(
        &self,
        request: &TransitionRequest,
    ) -> Result<(ContentRef, StateId, TransitionMeta), TransitionError> {
        let roles = self.resolve_roles(&request.actor_id).await?;
        let content = request.content();
        let (workflow, from_state) = self.current_state(&content).await?;

        let decision = evaluate(&workflow, &from_state, &request.to_state, &roles);
        debug!(from_state = %from_state, ?decision, "authorization decision");
        match decision {
            Decision::Allowed => {}
            Decision::NoSuchEdge => {
                return Err(TransitionError::InvalidTransition {
                    workflow: workflow.name.clone(),
                    from: from_state,
                    to: request.to_state.clone(),
                });
            }
            Decision::Forbidden => {
                return Err(TransitionError::Unauthorized {
                    actor: request.actor_id.clone(),
                    from: from_state,
                    to: request.to_state.clone(),
                });
            }
        }

        let meta = TransitionMeta::now(request.actor_id.clone());
        bounded(
            Collaborator::Repository,
            self.timeouts.repository,
            self.repository
                .write_state_if_equals(&content, &from_state, &request.to_state, &meta),
        )
        .await??;

        Ok((content, from_state, meta))
    }

    /// Steps 5-6.
    async fn after_commit(
        &self,
        request: TransitionRequest,
        content: ContentRef,
        from_state: StateId,
        meta: TransitionMeta,
    ) -> TransitionOutcome {
        let record = TransitionRecord::new(
            content.clone(),
            from_state.clone(),
            request.to_state.clone(),
            request.actor_id.clone(),
            request.comment.clone(),
        )
        .at(meta.at);
        let record_id = record.id;

        let audit = match bounded(
            Collaborator::Audit,
            self.timeouts.audit,
            self.audit.append(record),
        )
        .await
        {
            Ok(Ok(())) => AuditStatus::Recorded,
            Ok(Err(e)) => self.audit_degraded(&e.to_string()),
            Err(e) => self.audit_degraded(&e.to_string()),
        };

        let notification = match &self.notifications {
            None => NotificationStatus::Disabled,
            Some(sender) => {
                let event = TransitionEvent::new(
                    content.clone(),
                    from_state.clone(),
                    request.to_state.clone(),
                    request.actor_id,
                )
                .with_comment(request.comment)
                .at(meta.at);
                match sender.emit(event) {
                    Ok(()) => NotificationStatus::Queued,
                    Err(_) => {
                        // The sender already logged the drop.
                        self.counters
                            .notifications_dropped
                            .fetch_add(1, Ordering::Relaxed);
                        NotificationStatus::Dropped
                    }
                }
            }
        };

        TransitionOutcome {
            content,
            from_state,
            to_state: request.to_state,
            record_id: (audit == AuditStatus::Recorded).then_some(record_id),
            audit,
            notification,
        }
    }

    fn audit_degraded(&self, reason: &str) -> AuditStatus {
        self.counters.audit_degraded.fetch_add(1, Ordering::Relaxed);
        warn!(
            reason,
            outcome = "degraded",
            side_effect = "audit",
            "transition committed without audit record"
        );
        AuditStatus::Degraded
    }
}
