//! Error types for the engine crate.

use crate::repository::RepositoryError;
use crate::upstream::Collaborator;
use folio_access::AccessError;
use folio_core::{ContentRef, ContentType, StateId, UserId};
use folio_workflow::RegistryError;
use std::fmt;

/// Coarse classification of a `TransitionError`, for callers that branch on
/// the kind of failure rather than its details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The actor holds none of the edge's roles.
    Unauthorized,
    /// No such edge from the current state.
    InvalidTransition,
    /// Actor, content type or content entity does not exist.
    NotFound,
    /// The entity changed state between read and write.
    Conflict,
    /// A collaborator failed or timed out.
    UpstreamFailure,
    /// A bulk item was never started.
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidTransition => "invalid_transition",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::UpstreamFailure => "upstream_failure",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Why a transition did not commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The identity provider does not know the actor.
    ActorNotFound { actor: UserId },
    /// No workflow is mapped to the content type.
    UnknownContentType { content_type: ContentType },
    /// The repository has no such entity.
    ContentNotFound { content: ContentRef },
    /// The workflow has no edge between the two states.
    InvalidTransition {
        workflow: String,
        from: StateId,
        to: StateId,
    },
    /// The stored state is not a state of the entity's workflow.
    UnknownCurrentState { workflow: String, state: StateId },
    /// The edge exists but the actor's roles do not permit it.
    Unauthorized {
        actor: UserId,
        from: StateId,
        to: StateId,
    },
    /// Another writer moved the entity first.
    Conflict {
        content: ContentRef,
        expected: StateId,
        actual: StateId,
    },
    /// A collaborator failed or timed out.
    Upstream {
        collaborator: Collaborator,
        reason: String,
    },
    /// The bulk run was cancelled before this item started.
    Cancelled,
}

impl TransitionError {
    /// Returns the error's classification.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ActorNotFound { .. }
            | Self::UnknownContentType { .. }
            | Self::ContentNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidTransition { .. } | Self::UnknownCurrentState { .. } => {
                ErrorKind::InvalidTransition
            }
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Upstream { .. } => ErrorKind::UpstreamFailure,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActorNotFound { actor } => write!(f, "actor not found: {actor}"),
            Self::UnknownContentType { content_type } => {
                write!(f, "no workflow for content type: {content_type}")
            }
            Self::ContentNotFound { content } => write!(f, "content not found: {content}"),
            Self::InvalidTransition { workflow, from, to } => {
                write!(f, "workflow {workflow} has no transition {from} -> {to}")
            }
            Self::UnknownCurrentState { workflow, state } => {
                write!(f, "stored state {state} is not part of workflow {workflow}")
            }
            Self::Unauthorized { actor, from, to } => {
                write!(f, "{actor} may not move content {from} -> {to}")
            }
            Self::Conflict {
                content,
                expected,
                actual,
            } => write!(
                f,
                "content {content} moved to {actual} while expecting {expected}"
            ),
            Self::Upstream {
                collaborator,
                reason,
            } => write!(f, "{collaborator} failed: {reason}"),
            Self::Cancelled => write!(f, "cancelled before start"),
        }
    }
}

impl std::error::Error for TransitionError {}

impl From<AccessError> for TransitionError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::ActorNotFound { actor } => Self::ActorNotFound { actor },
            AccessError::Unavailable { reason } => Self::Upstream {
                collaborator: Collaborator::Identity,
                reason,
            },
        }
    }
}

impl From<RegistryError> for TransitionError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::ContentTypeNotFound { content_type } => {
                Self::UnknownContentType { content_type }
            }
        }
    }
}

impl From<RepositoryError> for TransitionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { content } => Self::ContentNotFound { content },
            RepositoryError::Conflict {
                content,
                expected,
                actual,
            } => Self::Conflict {
                content,
                expected,
                actual,
            },
            RepositoryError::Unavailable { reason } => Self::Upstream {
                collaborator: Collaborator::Repository,
                reason,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_kinds() {
        let errors = [
            TransitionError::ActorNotFound {
                actor: UserId::new("ghost"),
            },
            TransitionError::UnknownContentType {
                content_type: ContentType::new("widget"),
            },
            TransitionError::ContentNotFound {
                content: ContentRef::new("product", "404"),
            },
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::NotFound, "{err}");
        }
    }

    #[test]
    fn unknown_current_state_is_invalid_transition() {
        let err = TransitionError::UnknownCurrentState {
            workflow: "default".to_string(),
            state: StateId::new("limbo"),
        };
        assert_eq!(err.kind(), ErrorKind::InvalidTransition);
        assert!(err.to_string().contains("limbo"));
    }

    #[test]
    fn access_errors_convert() {
        let err: TransitionError = AccessError::Unavailable {
            reason: "down".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::UpstreamFailure);
        assert_eq!(err.to_string(), "identity failed: down");
    }

    #[test]
    fn repository_conflict_converts() {
        let err: TransitionError = RepositoryError::Conflict {
            content: ContentRef::new("product", "42"),
            expected: StateId::new("draft"),
            actual: StateId::new("review"),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(
            err.to_string(),
            "content product:42 moved to review while expecting draft"
        );
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(ErrorKind::UpstreamFailure.to_string(), "upstream_failure");
    }
}
