//! Engine configuration.
//!
//! Loaded via the `config` crate from an optional file (format chosen by
//! extension) overlaid with `FOLIO__`-prefixed environment variables, using
//! `__` as the nesting separator:
//!
//! ```text
//! FOLIO__BULK__MAX_CONCURRENCY=4
//! FOLIO__TIMEOUTS__AUDIT_MS=500
//! ```

use crate::bulk::DEFAULT_MAX_CONCURRENCY;
use crate::upstream::ExecutorTimeouts;
use folio_core::ContentType;
use folio_notify::{DispatcherTimeouts, NotificationRules, TemplateSet};
use folio_workflow::{DefinitionError, WorkflowCatalog, WorkflowDefinition, WorkflowRegistry};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FOLIO";

/// Full engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Workflow definitions.
    #[serde(default)]
    pub workflows: Vec<WorkflowDefinition>,

    /// Content type to workflow name.
    #[serde(default)]
    pub content_types: HashMap<ContentType, String>,

    /// Notification rules, templates and queue sizing.
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Collaborator timeouts.
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Bulk transition settings.
    #[serde(default)]
    pub bulk: BulkConfig,
}

/// Notification settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    /// Destination state to recipient roles.
    #[serde(default)]
    pub rules: NotificationRules,

    /// Per-state template overrides.
    #[serde(default)]
    pub templates: TemplateSet,

    /// Events buffered between executor and dispatcher.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            rules: NotificationRules::default(),
            templates: TemplateSet::default(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Collaborator timeouts in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TimeoutConfig {
    /// Identity provider.
    #[serde(default = "default_call_ms")]
    pub identity_ms: u64,
    /// Content repository.
    #[serde(default = "default_call_ms")]
    pub repository_ms: u64,
    /// Audit log.
    #[serde(default = "default_call_ms")]
    pub audit_ms: u64,
    /// Role directory.
    #[serde(default = "default_call_ms")]
    pub directory_ms: u64,
    /// Notification transport.
    #[serde(default = "default_transport_ms")]
    pub transport_ms: u64,
}

fn default_call_ms() -> u64 {
    2_000
}

fn default_transport_ms() -> u64 {
    5_000
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            identity_ms: default_call_ms(),
            repository_ms: default_call_ms(),
            audit_ms: default_call_ms(),
            directory_ms: default_call_ms(),
            transport_ms: default_transport_ms(),
        }
    }
}

impl TimeoutConfig {
    /// Timeouts for the transition path.
    #[must_use]
    pub fn executor(&self) -> ExecutorTimeouts {
        ExecutorTimeouts {
            identity: Duration::from_millis(self.identity_ms),
            repository: Duration::from_millis(self.repository_ms),
            audit: Duration::from_millis(self.audit_ms),
        }
    }

    /// Timeouts for notification dispatch.
    #[must_use]
    pub fn dispatcher(&self) -> DispatcherTimeouts {
        DispatcherTimeouts {
            directory: Duration::from_millis(self.directory_ms),
            transport: Duration::from_millis(self.transport_ms),
        }
    }
}

/// Bulk transition settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct BulkConfig {
    /// Items in flight at once.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from an optional file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or unreadable, or a value has
    /// the wrong shape.
    pub fn load(path: Option<&Path>) -> folio_core::Result<Self, config::ConfigError> {
        Self::load_from(path, None)
    }

    /// Like `load`, reading environment variables from `env` instead of the
    /// process when given.
    fn load_from(
        path: Option<&Path>,
        env: Option<config::Map<String, String>>,
    ) -> folio_core::Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// The workflow part of the configuration.
    #[must_use]
    pub fn catalog(&self) -> WorkflowCatalog {
        WorkflowCatalog {
            workflows: self.workflows.clone(),
            content_types: self.content_types.clone(),
        }
    }

    /// Validates the workflows and builds the registry.
    ///
    /// # Errors
    ///
    /// Returns the first invalid definition or mapping.
    pub fn registry(&self) -> folio_core::Result<WorkflowRegistry, DefinitionError> {
        WorkflowRegistry::from_catalog(self.catalog())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r##"
workflows:
  - name: default
    states:
      - { id: draft, label: Draft, color: "#999999", initial: true }
      - { id: review, label: In review, color: "#f0ad4e" }
      - { id: published, label: Published, color: "#5cb85c", published: true }
    transitions:
      - { from: draft, to: review, roles: [editor] }
      - { from: review, to: published, roles: [reviewer] }
      - { from: published, to: draft, roles: [editor] }
content_types:
  product: default
notifications:
  rules:
    review: [reviewer]
  templates:
    review: { subject: "Please review {content_id}", body: "{actor} asks for review" }
  queue_capacity: 16
timeouts:
  audit_ms: 250
bulk:
  max_concurrency: 3
"##;

    fn write_yaml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn defaults_without_sources() {
        let config = EngineConfig::default();
        assert_eq!(config.bulk.max_concurrency, 8);
        assert_eq!(config.notifications.queue_capacity, 1024);
        assert_eq!(config.timeouts.transport_ms, 5_000);
        assert!(config.workflows.is_empty());
    }

    #[test]
    fn loads_yaml_file() {
        let file = write_yaml(SAMPLE);
        let config = EngineConfig::load(Some(file.path())).expect("valid config");

        assert_eq!(config.workflows.len(), 1);
        assert_eq!(config.bulk.max_concurrency, 3);
        assert_eq!(config.notifications.queue_capacity, 16);
        assert_eq!(config.timeouts.audit_ms, 250);
        assert_eq!(config.timeouts.identity_ms, 2_000);
        assert_eq!(
            config.timeouts.executor().audit,
            Duration::from_millis(250)
        );
        assert_eq!(config.notifications.rules.roles_for(&"review".into()).len(), 1);

        let registry = config.registry().expect("valid registry");
        let workflow = registry.get(&ContentType::new("product")).expect("mapped");
        assert_eq!(workflow.states.len(), 3);
        assert!(workflow.is_published(&"published".into()));
    }

    #[test]
    fn environment_overrides_file() {
        let file = write_yaml(SAMPLE);
        let env = [
            ("FOLIO__BULK__MAX_CONCURRENCY", "4"),
            ("FOLIO__TIMEOUTS__AUDIT_MS", "500"),
            ("OTHER__BULK__MAX_CONCURRENCY", "99"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = EngineConfig::load_from(Some(file.path()), Some(env)).expect("valid config");

        assert_eq!(config.bulk.max_concurrency, 4);
        assert_eq!(config.timeouts.audit_ms, 500);
        assert_eq!(config.notifications.queue_capacity, 16);
        assert_eq!(config.workflows.len(), 1);
    }

    #[test]
    fn environment_alone_configures_defaults() {
        let env = [("FOLIO__NOTIFICATIONS__QUEUE_CAPACITY", "32")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let config = EngineConfig::load_from(None, Some(env)).expect("valid config");

        assert_eq!(config.notifications.queue_capacity, 32);
        assert_eq!(config.bulk.max_concurrency, 8);
        assert!(config.workflows.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = EngineConfig::load(Some(Path::new("/nonexistent/folio.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn invalid_workflow_fails_registry() {
        let file = write_yaml(
            r##"
workflows:
  - name: broken
    states:
      - { id: draft, label: Draft, color: "#999999" }
content_types:
  product: broken
"##,
        );
        let config = EngineConfig::load(Some(file.path())).expect("parses");
        let err = config.registry().unwrap_err();
        assert!(err.to_string().contains("no initial state"));
    }
}
