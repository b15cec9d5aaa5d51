//! Error types for the access crate.

use folio_core::UserId;
use std::fmt;

/// Errors from the identity provider and role directory collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The actor is unknown to the identity provider.
    ActorNotFound { actor: UserId },
    /// The collaborator could not answer.
    Unavailable { reason: String },
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ActorNotFound { actor } => {
                write!(f, "actor not found: {actor}")
            }
            Self::Unavailable { reason } => {
                write!(f, "identity service unavailable: {reason}")
            }
        }
    }
}

impl std::error::Error for AccessError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_not_found_display() {
        let err = AccessError::ActorNotFound {
            actor: UserId::new("alice"),
        };
        assert!(err.to_string().contains("actor not found"));
        assert!(err.to_string().contains("alice"));
    }

    #[test]
    fn unavailable_display() {
        let err = AccessError::Unavailable {
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("connection refused"));
    }
}
