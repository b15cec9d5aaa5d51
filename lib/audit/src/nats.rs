//! JetStream-backed audit log.
//!
//! Each content entity gets its own subject,
//! `<prefix>.<content_type>.<content_id>`, so history for one item is a
//! filtered replay of the stream. Records are published with their id as
//! the `Nats-Msg-Id` header, letting the server reject duplicates inside
//! its deduplication window.

use crate::error::AuditError;
use crate::record::TransitionRecord;
use crate::store::AuditLog;
use async_nats::HeaderMap;
use async_nats::jetstream;
use async_trait::async_trait;
use folio_core::ContentRef;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default stream holding transition records.
const HISTORY_STREAM_NAME: &str = "CONTENT_HISTORY";

/// Default subject prefix for transition records.
const HISTORY_SUBJECT_PREFIX: &str = "content.history";

/// Envelope version written by this build.
const RECORD_VERSION: u32 = 1;

/// How long replay waits for the next expected message before failing.
const REPLAY_STALL: Duration = Duration::from_secs(5);

/// Configuration for the JetStream audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatsAuditConfig {
    /// NATS server URL.
    pub url: String,
    /// Stream name (defaults to CONTENT_HISTORY).
    #[serde(default)]
    pub stream_name: Option<String>,
    /// Subject prefix (defaults to content.history).
    #[serde(default)]
    pub subject_prefix: Option<String>,
}

impl NatsAuditConfig {
    /// Creates a config with the given NATS URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream_name: None,
            subject_prefix: None,
        }
    }

    fn stream(&self) -> &str {
        self.stream_name.as_deref().unwrap_or(HISTORY_STREAM_NAME)
    }

    fn prefix(&self) -> &str {
        self.subject_prefix
            .as_deref()
            .unwrap_or(HISTORY_SUBJECT_PREFIX)
    }

    fn content_subject(&self, content: &ContentRef) -> String {
        format!(
            "{}.{}.{}",
            self.prefix(),
            escape_token(content.content_type.as_str()),
            escape_token(content.content_id.as_str())
        )
    }
}

/// Versioned wire form of a record.
#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    version: u32,
    record: TransitionRecord,
}

impl StoredRecord {
    fn encode(record: &TransitionRecord) -> Result<Vec<u8>, AuditError> {
        serde_json::to_vec(&StoredRecordRef {
            version: RECORD_VERSION,
            record,
        })
        .map_err(|e| AuditError::AppendFailed {
            message: format!("failed to serialize record: {e}"),
        })
    }

    fn decode(bytes: &[u8]) -> Result<TransitionRecord, AuditError> {
        let stored: Self = serde_json::from_slice(bytes).map_err(|e| AuditError::LoadFailed {
            message: format!("failed to deserialize record: {e}"),
        })?;
        if stored.version != RECORD_VERSION {
            return Err(AuditError::LoadFailed {
                message: format!("unsupported record version {}", stored.version),
            });
        }
        Ok(stored.record)
    }
}

#[derive(Serialize)]
struct StoredRecordRef<'a> {
    version: u32,
    record: &'a TransitionRecord,
}

/// Makes a value safe to use as a single NATS subject token.
///
/// Dots, wildcards, whitespace and `%` itself are percent-encoded so that
/// distinct ids never collapse onto the same subject.
fn escape_token(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '.' | '*' | '>' | '%' => escaped.push_str(&format!("%{:02X}", c as u32)),
            c if c.is_whitespace() || c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    escaped.push_str(&format!("%{byte:02X}"));
                }
            }
            c => escaped.push(c),
        }
    }
    escaped
}

/// Decodes exactly `pending` records from a payload stream.
///
/// Ending early or going quiet for longer than `stall` is an error, so a
/// slow server never yields a silently truncated history.
async fn replay<S, B, E>(
    mut payloads: S,
    pending: u64,
    stall: Duration,
) -> Result<Vec<TransitionRecord>, AuditError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let mut records = Vec::new();
    while (records.len() as u64) < pending {
        let payload = match tokio::time::timeout(stall, payloads.next()).await {
            Ok(Some(Ok(payload))) => payload,
            Ok(Some(Err(e))) => {
                return Err(AuditError::LoadFailed {
                    message: e.to_string(),
                });
            }
            Ok(None) => {
                return Err(AuditError::LoadFailed {
                    message: format!(
                        "replay ended after {} of {pending} records",
                        records.len()
                    ),
                });
            }
            Err(_) => {
                return Err(AuditError::LoadFailed {
                    message: format!(
                        "replay stalled after {} of {pending} records",
                        records.len()
                    ),
                });
            }
        };
        records.push(StoredRecord::decode(payload.as_ref())?);
    }
    Ok(records)
}

/// NATS JetStream audit log.
pub struct JetStreamAuditLog {
    jetstream: Arc<jetstream::Context>,
    config: NatsAuditConfig,
}

impl JetStreamAuditLog {
    /// Connects to NATS and ensures the history stream exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or stream setup fails.
    pub async fn connect(config: NatsAuditConfig) -> Result<Self, AuditError> {
        let client = async_nats::connect(&config.url).await.map_err(|e| {
            AuditError::ConnectionFailed {
                message: e.to_string(),
            }
        })?;

        let jetstream = async_nats::jetstream::new(client);
        Self::ensure_stream(&jetstream, &config).await?;

        Ok(Self {
            jetstream: Arc::new(jetstream),
            config,
        })
    }

    async fn ensure_stream(
        jetstream: &jetstream::Context,
        config: &NatsAuditConfig,
    ) -> Result<(), AuditError> {
        let stream_config = jetstream::stream::Config {
            name: config.stream().to_string(),
            subjects: vec![format!("{}.>", config.prefix())],
            storage: jetstream::stream::StorageType::File,
            retention: jetstream::stream::RetentionPolicy::Limits,
            ..Default::default()
        };

        jetstream
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| AuditError::ConnectionFailed {
                message: format!("failed to create history stream: {e}"),
            })?;

        Ok(())
    }
}

#[async_trait]
impl AuditLog for JetStreamAuditLog {
    async fn append(&self, record: TransitionRecord) -> Result<(), AuditError> {
        let subject = self.config.content_subject(&record.content);
        let bytes = StoredRecord::encode(&record)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            async_nats::header::NATS_MESSAGE_ID,
            record.id.to_string().as_str(),
        );

        let ack = self
            .jetstream
            .publish_with_headers(subject, headers, bytes.into())
            .await
            .map_err(|e| AuditError::AppendFailed {
                message: e.to_string(),
            })?
            .await
            .map_err(|e| AuditError::AppendFailed {
                message: e.to_string(),
            })?;

        if ack.duplicate {
            return Err(AuditError::DuplicateRecord { id: record.id });
        }
        debug!(record_id = %record.id, sequence = ack.sequence, "appended transition record");
        Ok(())
    }

    async fn history(&self, content: &ContentRef) -> Result<Vec<TransitionRecord>, AuditError> {
        let stream = self
            .jetstream
            .get_stream(self.config.stream())
            .await
            .map_err(|e| AuditError::LoadFailed {
                message: format!("failed to get stream: {e}"),
            })?;

        let consumer_config = jetstream::consumer::pull::Config {
            filter_subject: self.config.content_subject(content),
            deliver_policy: jetstream::consumer::DeliverPolicy::All,
            ack_policy: jetstream::consumer::AckPolicy::None,
            ..Default::default()
        };

        let consumer = stream.create_consumer(consumer_config).await.map_err(|e| {
            AuditError::LoadFailed {
                message: format!("failed to create consumer: {e}"),
            }
        })?;

        // Snapshot taken when the consumer was created.
        let pending = consumer.cached_info().num_pending;
        if pending == 0 {
            return Ok(Vec::new());
        }

        let messages = consumer
            .messages()
            .await
            .map_err(|e| AuditError::LoadFailed {
                message: format!("failed to get messages: {e}"),
            })?;
        let payloads = messages.map(|message| message.map(|message| message.payload.clone()));

        let mut records = replay(Box::pin(payloads), pending, REPLAY_STALL).await?;
        records.sort_by(TransitionRecord::history_order);
        Ok(records)
    }
}
