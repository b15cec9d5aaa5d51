//! The workflow definition registry.
//!
//! Built once at startup from a `WorkflowCatalog` (or directly through a
//! `RegistryBuilder`), then shared read-only as `Arc<WorkflowRegistry>`.
//! There is no mutation API: changing workflows means building a new
//! registry.

use crate::catalog::WorkflowCatalog;
use crate::definition::WorkflowDefinition;
use crate::error::{DefinitionError, RegistryError};
use crate::graph::StateGraph;
use folio_core::ContentType;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

/// Immutable catalog of validated workflows keyed by content type.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRegistry {
    workflows: BTreeMap<String, Arc<WorkflowDefinition>>,
    content_types: HashMap<ContentType, Arc<WorkflowDefinition>>,
}

impl WorkflowRegistry {
    /// Returns a builder for assembling a registry in code.
    #[must_use]
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Validates a declarative catalog and builds the registry.
    ///
    /// # Errors
    ///
    /// Returns a report wrapping the first `DefinitionError` found.
    pub fn from_catalog(catalog: WorkflowCatalog) -> folio_core::Result<Self, DefinitionError> {
        let mut builder = Self::builder();
        for workflow in catalog.workflows {
            builder = builder.workflow(workflow);
        }
        for (content_type, workflow) in catalog.content_types {
            builder = builder.content_type(content_type, workflow);
        }
        builder.build()
    }

    /// Returns the workflow governing a content type.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::ContentTypeNotFound` for unmapped types.
    pub fn get(&self, content_type: &ContentType) -> Result<Arc<WorkflowDefinition>, RegistryError> {
        self.content_types
            .get(content_type)
            .cloned()
            .ok_or_else(|| RegistryError::ContentTypeNotFound {
                content_type: content_type.clone(),
            })
    }

    /// Returns a workflow by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.get(name).cloned()
    }

    /// Iterates all workflows in name order.
    pub fn workflows(&self) -> impl Iterator<Item = &WorkflowDefinition> {
        self.workflows.values().map(AsRef::as_ref)
    }

    /// Returns `(content type, workflow name)` pairs sorted by content type.
    #[must_use]
    pub fn content_types(&self) -> Vec<(&ContentType, &str)> {
        let mut pairs: Vec<(&ContentType, &str)> = self
            .content_types
            .iter()
            .map(|(content_type, workflow)| (content_type, workflow.name.as_str()))
            .collect();
        pairs.sort();
        pairs
    }
}

/// Assembles and validates a `WorkflowRegistry`.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    workflows: Vec<WorkflowDefinition>,
    content_types: Vec<(ContentType, String)>,
}

impl RegistryBuilder {
    /// Adds a workflow definition.
    #[must_use]
    pub fn workflow(mut self, workflow: WorkflowDefinition) -> Self {
        self.workflows.push(workflow);
        self
    }

    /// Maps a content type to a workflow by name.
    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<ContentType>, workflow: impl Into<String>) -> Self {
        self.content_types.push((content_type.into(), workflow.into()));
        self
    }

    /// Validates everything and builds the registry.
    ///
    /// # Errors
    ///
    /// Returns a report wrapping the first `DefinitionError` found.
    pub fn build(self) -> folio_core::Result<WorkflowRegistry, DefinitionError> {
        let mut workflows = BTreeMap::new();
        for workflow in self.workflows {
            workflow.validate()?;

            let graph = StateGraph::from_definition(&workflow);
            for state in graph.unreachable_states() {
                warn!(workflow = %workflow.name, state = %state, "state is unreachable from the initial state");
            }
            for state in graph.dead_ends() {
                warn!(workflow = %workflow.name, state = %state, "state has no outgoing transition");
            }

            if workflows.contains_key(&workflow.name) {
                return Err(DefinitionError::DuplicateWorkflow {
                    workflow: workflow.name,
                }
                .into());
            }
            debug!(
                workflow = %workflow.name,
                states = graph.state_count(),
                transitions = graph.transition_count(),
                "loaded workflow"
            );
            workflows.insert(workflow.name.clone(), Arc::new(workflow));
        }

        let mut content_types = HashMap::new();
        for (content_type, name) in self.content_types {
            let Some(workflow) = workflows.get(&name) else {
                return Err(DefinitionError::UnknownWorkflow {
                    content_type,
                    workflow: name,
                }
                .into());
            };
            content_types.insert(content_type, Arc::clone(workflow));
        }

        Ok(WorkflowRegistry {
            workflows,
            content_types,
        })
    }
}
