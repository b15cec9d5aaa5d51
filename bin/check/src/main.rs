//! Validates a folio engine configuration.
//!
//! Usage: `folio-check [CONFIG_PATH]`
//!
//! Loads the configuration (file plus `FOLIO__*` environment overrides),
//! builds the workflow registry and logs what it found. Exits non-zero if
//! the configuration cannot be loaded or a workflow is invalid.

use folio_core::StateId;
use folio_engine::EngineConfig;
use folio_workflow::{StateGraph, WorkflowRegistry};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = match EngineConfig::load(path.as_deref()) {
        Ok(config) => config,
        Err(report) => {
            error!(error = %report, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let registry = match config.registry() {
        Ok(registry) => registry,
        Err(report) => {
            error!(error = %report, "invalid workflow configuration");
            return ExitCode::FAILURE;
        }
    };

    describe(&config, &registry);
    ExitCode::SUCCESS
}

fn describe(config: &EngineConfig, registry: &WorkflowRegistry) {
    for workflow in registry.workflows() {
        let graph = StateGraph::from_definition(workflow);
        let content_types: Vec<&str> = registry
            .content_types()
            .into_iter()
            .filter(|(_, name)| *name == workflow.name)
            .map(|(content_type, _)| content_type.as_str())
            .collect();
        info!(
            workflow = %workflow.name,
            states = graph.state_count(),
            transitions = graph.transition_count(),
            content_types = ?content_types,
            "workflow"
        );
        for state in graph.unreachable_states() {
            warn!(workflow = %workflow.name, state = %state, "unreachable state");
        }
        if content_types.is_empty() {
            warn!(workflow = %workflow.name, "workflow is not mapped to any content type");
        }
    }

    for state in unknown_states(config.notifications.rules.states(), registry) {
        warn!(state = %state, "notification rule for a state no workflow declares");
    }
    for state in unknown_states(config.notifications.templates.overridden_states(), registry) {
        warn!(state = %state, "template for a state no workflow declares");
    }

    info!(
        queue_capacity = config.notifications.queue_capacity,
        max_concurrency = config.bulk.max_concurrency,
        "configuration is valid"
    );
}

/// States from `states` that no workflow in the registry declares.
fn unknown_states<'a>(
    states: impl Iterator<Item = &'a StateId>,
    registry: &WorkflowRegistry,
) -> BTreeSet<&'a StateId> {
    states
        .filter(|state| !registry.workflows().any(|w| w.has_state(state)))
        .collect()
}
