//! Timeout bounds for external collaborators.

use crate::error::TransitionError;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// An external system the engine calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collaborator {
    /// Actor role resolution.
    Identity,
    /// Content state storage.
    Repository,
    /// Transition history.
    Audit,
    /// Role membership lookup.
    Directory,
    /// Notification delivery.
    Transport,
}

impl Collaborator {
    /// Stable lowercase name, used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Repository => "repository",
            Self::Audit => "audit",
            Self::Directory => "directory",
            Self::Transport => "transport",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-collaborator time limits for the transition path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorTimeouts {
    /// Role resolution.
    pub identity: Duration,
    /// State read and conditional write, each.
    pub repository: Duration,
    /// Audit append and history reads.
    pub audit: Duration,
}

impl Default for ExecutorTimeouts {
    fn default() -> Self {
        Self {
            identity: Duration::from_secs(2),
            repository: Duration::from_secs(2),
            audit: Duration::from_secs(2),
        }
    }
}

/// Runs `call` with a deadline, mapping expiry to an upstream failure.
pub(crate) async fn bounded<F>(
    collaborator: Collaborator,
    limit: Duration,
    call: F,
) -> Result<F::Output, TransitionError>
where
    F: Future,
{
    timeout(limit, call)
        .await
        .map_err(|_| TransitionError::Upstream {
            collaborator,
            reason: format!("timed out after {}ms", limit.as_millis()),
        })
}
