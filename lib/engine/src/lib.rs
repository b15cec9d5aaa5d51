//! State transition execution for the folio publication engine.
//!
//! `TransitionExecutor` moves one content entity along one workflow edge:
//! it authorizes the actor, compare-and-swaps the stored state, appends the
//! audit record and queues a notification. `BulkTransitionCoordinator` runs
//! many such transitions with bounded parallelism, and `PublicationEngine`
//! bundles both with the read side.
//!
//! Every collaborator call is bounded by a timeout. On the transition path
//! an expired call is an `UpstreamFailure`; after the commit (audit,
//! notification) it only degrades the outcome.

pub mod bulk;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod repository;
pub mod upstream;

pub use bulk::{BulkItem, BulkReport, BulkRequest, BulkTransitionCoordinator, CancelHandle};
pub use config::EngineConfig;
pub use engine::{Collaborators, EngineStats, PublicationEngine};
pub use error::{ErrorKind, TransitionError};
pub use executor::{
    AuditStatus, ExecutorStats, NotificationStatus, TransitionExecutor, TransitionOutcome,
    TransitionRequest,
};
pub use repository::{
    ContentEntry, ContentRepository, InMemoryContentRepository, RepositoryError, TransitionMeta,
};
pub use upstream::{Collaborator, ExecutorTimeouts};
