//! Message delivery.

use crate::error::TransportError;
use async_trait::async_trait;
use tracing::info;

/// Delivers a rendered message to one address.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    /// Sends a message.
    ///
    /// # Errors
    ///
    /// Returns a `TransportError` if the message was not accepted.
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

/// Transport that writes each message to the log instead of delivering it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn send(&self, address: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        info!(address, subject, body_len = body.len(), "notification");
        Ok(())
    }
}
