//! Strongly-typed identifiers.
//!
//! Most keys in the engine are assigned by something outside of it: content
//! types and content ids by the content repository, state ids and role codes
//! by the workflow configuration, user ids by the identity provider. Those are
//! opaque string newtypes. Transition records are the only entity the engine
//! creates itself; they get ULIDs so that ids sort by creation time.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Error returned when parsing an ID from a string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse.
    pub id_type: &'static str,
    /// The reason for the parse failure.
    pub reason: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {}: {}", self.id_type, self.reason)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to generate an opaque string key assigned outside the engine.
macro_rules! define_key {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a string as this key type.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the key as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the key, returning the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        reason: "value is empty".to_string(),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_key!(
    /// Name of a content type (e.g. `product`, `page`).
    ContentType
);

define_key!(
    /// Identifier of a piece of content within its content type.
    ContentId
);

define_key!(
    /// Identifier of a state within a workflow definition (e.g. `draft`).
    StateId
);

define_key!(
    /// Code of a role that may be granted transitions (e.g. `editor`).
    RoleCode
);

define_key!(
    /// Identifier of a user, as known to the identity provider.
    UserId
);

/// Unique identifier for a transition record.
///
/// Rendered as `trec_<ulid>`; parsing accepts the prefixed or raw form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionRecordId(Ulid);

impl TransitionRecordId {
    const PREFIX: &'static str = "trec";

    /// Creates a new ID with a randomly generated ULID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates an ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for TransitionRecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransitionRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl FromStr for TransitionRecordId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ulid_str = s
            .strip_prefix(Self::PREFIX)
            .and_then(|rest| rest.strip_prefix('_'))
            .unwrap_or(s);

        Ulid::from_str(ulid_str)
            .map(Self)
            .map_err(|e| ParseIdError {
                id_type: "TransitionRecordId",
                reason: e.to_string(),
            })
    }
}

impl From<Ulid> for TransitionRecordId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn key_display_is_raw_value() {
        let state = StateId::new("draft");
        assert_eq!(state.to_string(), "draft");
        assert_eq!(state, "draft");
    }

    #[test]
    fn key_parse_rejects_empty() {
        let err = "   ".parse::<ContentType>().unwrap_err();
        assert_eq!(err.id_type, "ContentType");
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn key_parse_trims_whitespace() {
        let role: RoleCode = " editor ".parse().expect("should parse");
        assert_eq!(role.as_str(), "editor");
    }

    #[test]
    fn key_lookup_by_str() {
        let mut labels = HashMap::new();
        labels.insert(StateId::new("review"), "In review");
        assert_eq!(labels.get("review"), Some(&"In review"));
    }

    #[test]
    fn key_serializes_transparently() {
        let json = serde_json::to_string(&UserId::new("alice")).expect("serialize");
        assert_eq!(json, "\"alice\"");
    }

    #[test]
    fn record_id_display_format() {
        let id = TransitionRecordId::new();
        assert!(id.to_string().starts_with("trec_"));
    }

    #[test]
    fn record_id_parse_with_and_without_prefix() {
        let id = TransitionRecordId::new();
        let parsed: TransitionRecordId = id.to_string().parse().expect("prefixed");
        assert_eq!(id, parsed);

        let raw: TransitionRecordId = id.as_ulid().to_string().parse().expect("raw");
        assert_eq!(id, raw);
    }

    #[test]
    fn record_id_parse_invalid() {
        let err = "trec_nope".parse::<TransitionRecordId>().unwrap_err();
        assert_eq!(err.id_type, "TransitionRecordId");
    }
}
