//! Workflow definitions for the folio publication engine.
//!
//! This crate provides:
//!
//! - **Definitions**: states, role-gated transitions, structural validation
//! - **Graph analysis**: petgraph view for reachability warnings
//! - **Registry**: immutable content type -> workflow lookup, built at startup
//! - **Authorizer**: pure allow/deny decisions over an actor's full role set
//! - **Built-in workflow**: the stock draft/review/published lifecycle

pub mod authorizer;
pub mod builtin;
pub mod catalog;
pub mod definition;
pub mod error;
pub mod graph;
pub mod registry;

pub use authorizer::{Decision, available_transitions, can_transition, evaluate};
pub use builtin::{DEFAULT_WORKFLOW, default_workflow};
pub use catalog::WorkflowCatalog;
pub use definition::{State, Transition, WorkflowDefinition};
pub use error::{DefinitionError, RegistryError};
pub use graph::StateGraph;
pub use registry::{RegistryBuilder, WorkflowRegistry};
