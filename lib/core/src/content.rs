//! Reference to a piece of content owned by the content repository.

use crate::id::{ContentId, ContentType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque `(content type, content id)` pair identifying one piece of content.
///
/// The engine never owns the content itself; it only reads and conditionally
/// writes the workflow fields the repository keeps for it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    /// The content type, which selects the workflow.
    pub content_type: ContentType,
    /// The id of the content within its type.
    pub content_id: ContentId,
}

impl ContentRef {
    /// Creates a new content reference.
    #[must_use]
    pub fn new(content_type: impl Into<ContentType>, content_id: impl Into<ContentId>) -> Self {
        Self {
            content_type: content_type.into(),
            content_id: content_id.into(),
        }
    }
}

impl fmt::Display for ContentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.content_id)
    }
}
