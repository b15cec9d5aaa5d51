//! The notification dispatcher.
//!
//! Dispatch never fails as a whole. Each role lookup and each delivery is
//! its own failure domain: a failing role is skipped, a failing recipient is
//! counted, and the rest proceed.

use crate::event::TransitionEvent;
use crate::rule::NotificationRules;
use crate::template::{RenderedMessage, TemplateSet};
use crate::transport::NotificationTransport;
use folio_access::{Member, RoleDirectory};
use folio_core::{RoleCode, UserId};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Upper bounds on collaborator calls made while dispatching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherTimeouts {
    /// Per role lookup.
    pub directory: Duration,
    /// Per delivery.
    pub transport: Duration,
}

impl Default for DispatcherTimeouts {
    fn default() -> Self {
        Self {
            directory: Duration::from_secs(2),
            transport: Duration::from_secs(5),
        }
    }
}

/// Running totals across every dispatch and emit.
#[derive(Debug, Default)]
pub struct DispatchStats {
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    lookup_failures: AtomicU64,
}

/// Point-in-time copy of `DispatchStats`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Messages accepted by the transport.
    pub delivered: u64,
    /// Messages the transport rejected or timed out on.
    pub failed: u64,
    /// Events that never reached the dispatcher (queue full or closed).
    pub dropped: u64,
    /// Role lookups that failed or timed out.
    pub lookup_failures: u64,
}

impl DispatchStats {
    /// Returns the current totals.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            lookup_failures: self.lookup_failures.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// A recipient whose delivery failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Who was not reached.
    pub recipient: UserId,
    /// Transport error or timeout description.
    pub reason: String,
}

/// What a single dispatch did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Recipients the transport accepted.
    pub delivered: Vec<UserId>,
    /// Recipients that could not be reached.
    pub failed: Vec<DeliveryFailure>,
    /// Roles whose members could not be listed.
    pub lookup_failures: Vec<RoleCode>,
}

impl DispatchReport {
    /// Number of recipients a delivery was attempted for.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

/// Resolves recipients for a transition and delivers rendered messages.
pub struct NotificationDispatcher {
    directory: Arc<dyn RoleDirectory>,
    transport: Arc<dyn NotificationTransport>,
    rules: NotificationRules,
    templates: TemplateSet,
    timeouts: DispatcherTimeouts,
    stats: Arc<DispatchStats>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher with built-in templates and default timeouts.
    #[must_use]
    pub fn new(
        directory: Arc<dyn RoleDirectory>,
        transport: Arc<dyn NotificationTransport>,
        rules: NotificationRules,
    ) -> Self {
        Self {
            directory,
            transport,
            rules,
            templates: TemplateSet::default(),
            timeouts: DispatcherTimeouts::default(),
            stats: Arc::new(DispatchStats::default()),
        }
    }

    /// Replaces the template set.
    #[must_use]
    pub fn with_templates(mut self, templates: TemplateSet) -> Self {
        self.templates = templates;
        self
    }

    /// Replaces the collaborator timeouts.
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: DispatcherTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Returns the shared counters.
    #[must_use]
    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }

    /// Returns the configured rules.
    #[must_use]
    pub fn rules(&self) -> &NotificationRules {
        &self.rules
    }

    /// Notifies everyone the rules name for the event's destination state.
    #[instrument(
        skip_all,
        fields(
            content_type = %event.content.content_type,
            content_id = %event.content.content_id,
            to_state = %event.to_state,
        )
    )]
    pub async fn dispatch(&self, event: &TransitionEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        let roles = self.rules.roles_for(&event.to_state);
        if roles.is_empty() {
            debug!("no notification rule for state");
            return report;
        }

        let recipients = self.resolve_recipients(roles, &event.actor_id, &mut report).await;
        if recipients.is_empty() {
            debug!("no recipients");
            return report;
        }

        let message = self.templates.render(event);
        let results = join_all(recipients.iter().map(|member| self.deliver(member, &message))).await;

        for (member, result) in recipients.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    report.delivered.push(member.id);
                }
                Err(reason) => {
                    warn!(
                        recipient = %member.id,
                        reason = %reason,
                        outcome = "degraded",
                        side_effect = "notification",
                        "notification delivery failed"
                    );
                    self.stats.failed.fetch_add(1, Ordering::Relaxed);
                    report.failed.push(DeliveryFailure {
                        recipient: member.id,
                        reason,
                    });
                }
            }
        }

        debug!(
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "dispatch complete"
        );
        report
    }

    /// Members of every role, minus the actor, each listed once.
    async fn resolve_recipients(
        &self,
        roles: &[RoleCode],
        actor: &UserId,
        report: &mut DispatchReport,
    ) -> Vec<Member> {
        let mut seen = HashSet::new();
        let mut recipients = Vec::new();

        for role in roles {
            let members = match timeout(self.timeouts.directory, self.directory.members_of_role(role)).await {
                Ok(Ok(members)) => members,
                Ok(Err(e)) => {
                    warn!(role = %role, error = %e, "role lookup failed, skipping role");
                    self.record_lookup_failure(role, report);
                    continue;
                }
                Err(_) => {
                    warn!(
                        role = %role,
                        timeout_ms = self.timeouts.directory.as_millis(),
                        "role lookup timed out, skipping role"
                    );
                    self.record_lookup_failure(role, report);
                    continue;
                }
            };

            for member in members {
                if &member.id == actor {
                    continue;
                }
                if seen.insert(member.id.clone()) {
                    recipients.push(member);
                }
            }
        }
        recipients
    }

    fn record_lookup_failure(&self, role: &RoleCode, report: &mut DispatchReport) {
        self.stats.lookup_failures.fetch_add(1, Ordering::Relaxed);
        report.lookup_failures.push(role.clone());
    }

    async fn deliver(&self, member: &Member, message: &RenderedMessage) -> Result<(), String> {
        let send = self
            .transport
            .send(&member.address, &message.subject, &message.body);
        match timeout(self.timeouts.transport, send).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "timed out after {}ms",
                self.timeouts.transport.as_millis()
            )),
        }
    }
}
