//! Declarative workflow catalog, as read from configuration.

use crate::definition::WorkflowDefinition;
use folio_core::ContentType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Workflows plus the content type mapping, before validation.
///
/// Deserialized from the `workflows` and `content_types` configuration
/// sections and turned into a registry with `WorkflowRegistry::from_catalog`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowCatalog {
    /// Workflow definitions.
    #[serde(default)]
    pub workflows: Vec<WorkflowDefinition>,
    /// Content type to workflow name.
    #[serde(default)]
    pub content_types: HashMap<ContentType, String>,
}
