//! Error types for the audit crate.

use folio_core::TransitionRecordId;
use std::fmt;

/// Errors from audit log operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// A record with this id was already appended.
    DuplicateRecord { id: TransitionRecordId },
    /// Failed to connect to the backing store.
    ConnectionFailed { message: String },
    /// Failed to append a record.
    AppendFailed { message: String },
    /// Failed to load history.
    LoadFailed { message: String },
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateRecord { id } => write!(f, "transition record already exists: {id}"),
            Self::ConnectionFailed { message } => {
                write!(f, "audit store connection failed: {message}")
            }
            Self::AppendFailed { message } => write!(f, "audit append failed: {message}"),
            Self::LoadFailed { message } => write!(f, "audit history load failed: {message}"),
        }
    }
}

impl std::error::Error for AuditError {}
