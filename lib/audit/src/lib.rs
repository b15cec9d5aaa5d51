//! Transition history for the folio publication engine.
//!
//! Every committed state change produces exactly one immutable
//! `TransitionRecord`. Records are appended to an `AuditLog` and read back
//! per content entity in ascending time order, for history views and tests.
//!
//! Implementations:
//! - `InMemoryAuditLog`: process-local, for tests and single-node setups
//! - `JetStreamAuditLog`: one NATS JetStream subject per content entity

pub mod error;
pub mod nats;
pub mod record;
pub mod store;

pub use error::AuditError;
pub use nats::{JetStreamAuditLog, NatsAuditConfig};
pub use record::TransitionRecord;
pub use store::{AuditLog, InMemoryAuditLog};
