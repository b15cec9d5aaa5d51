//! Error types for the notify crate.

use std::fmt;

/// Errors from a notification transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport refused the address or message.
    Rejected { address: String, reason: String },
    /// The transport could not be reached.
    Unavailable { reason: String },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { address, reason } => {
                write!(f, "delivery to {address} rejected: {reason}")
            }
            Self::Unavailable { reason } => write!(f, "transport unavailable: {reason}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Why an event could not be put on the notification queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitError {
    /// The queue is at capacity.
    Full,
    /// The worker has stopped.
    Closed,
}

impl fmt::Display for EmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "notification queue is full"),
            Self::Closed => write!(f, "notification queue is closed"),
        }
    }
}

impl std::error::Error for EmitError {}
