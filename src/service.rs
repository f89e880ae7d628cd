//! Operations exposed to the transport layer.
//!
//! [`StreamService`] binds a [`StreamDirectory`] and a [`DeliveryConfig`]
//! into the flat operation surface an HTTP (or any other) transport mounts:
//! status, stream create/delete, client publish, server send, and subscribe.
//! The transport itself is out of scope; every operation here returns a
//! definite outcome synchronously, and response payloads serialize with
//! their fixed wire names.
//!
//! Client-originated publishes always have their `source` forced to
//! `client`, so a remote peer cannot spoof server-sourced traffic into
//! other consumers' long-poll connections.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::bus::{MessageStream, StreamDirectory, StreamError};
use crate::delivery::{DeliveryAdapter, DeliveryConfig};
use crate::message::{MessageError, MessageSource, StreamMessage};

/// Errors surfaced to the transport.
#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    /// No stream is registered under the given id; the operation had no
    /// side effects.
    #[error("no stream registered under id {stream_id}")]
    #[diagnostic(code(streambus::service::stream_not_found))]
    StreamNotFound { stream_id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Message(#[from] MessageError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Stream(#[from] StreamError),
}

/// Read-only snapshot of the directory.
#[derive(Clone, Debug, Serialize)]
pub struct BusStatus {
    pub stream_count: usize,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCreated {
    pub stream_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDeleted {
    /// Whether a stream was actually removed; the transport maps `false` to
    /// its not-found response.
    pub found: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageAccepted {
    pub message_id: String,
}

/// Outcome of a subscribe operation.
pub enum Subscription {
    /// Long-poll requested: drive this adapter for the life of the
    /// connection.
    LongPoll(DeliveryAdapter),
    /// Plain poll: the recent-message list, which this bus does not retain.
    Backlog(Vec<StreamMessage>),
}

/// The operation surface the transport mounts.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use streambus::bus::StreamDirectory;
/// use streambus::service::StreamService;
/// use serde_json::json;
///
/// let service = StreamService::new(Arc::new(StreamDirectory::new()));
/// let created = service.create_stream(Some("s1".into()));
/// let accepted = service
///     .publish(&created.stream_id, &json!({"channel": "chat", "data": "hi"}))
///     .unwrap();
/// assert!(!accepted.message_id.is_empty());
/// ```
pub struct StreamService {
    directory: Arc<StreamDirectory>,
    delivery: DeliveryConfig,
}

impl StreamService {
    pub fn new(directory: Arc<StreamDirectory>) -> Self {
        Self::with_delivery_config(directory, DeliveryConfig::default())
    }

    pub fn with_delivery_config(directory: Arc<StreamDirectory>, delivery: DeliveryConfig) -> Self {
        Self {
            directory,
            delivery,
        }
    }

    pub fn directory(&self) -> &Arc<StreamDirectory> {
        &self.directory
    }

    /// Snapshot the directory size.
    pub fn status(&self) -> BusStatus {
        BusStatus {
            stream_count: self.directory.len(),
            timestamp: Utc::now(),
        }
    }

    /// Create (or re-reference) a stream, generating an id when none is
    /// supplied. Idempotent for a given id.
    pub fn create_stream(&self, stream_id: Option<String>) -> StreamCreated {
        let stream_id = stream_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.directory.get_or_create(stream_id.as_str());
        StreamCreated { stream_id }
    }

    /// Delete a stream. Never errors; a missing id reports `found: false`.
    pub fn delete_stream(&self, stream_id: &str) -> StreamDeleted {
        StreamDeleted {
            found: self.directory.delete(stream_id),
        }
    }

    /// Publish a client-originated wire record onto a stream.
    ///
    /// The decoded message's source is forced to [`MessageSource::Client`]
    /// regardless of what the record claims.
    pub fn publish(&self, stream_id: &str, wire: &Value) -> Result<MessageAccepted, ServiceError> {
        let stream = self.lookup(stream_id)?;
        let message = StreamMessage::from_wire(wire)?.with_source(MessageSource::Client);
        let message_id = message.id().to_string();
        stream.publish(message)?;
        Ok(MessageAccepted { message_id })
    }

    /// Publish a server-originated message built from parts.
    pub fn send(
        &self,
        stream_id: &str,
        channel: &str,
        data: Value,
        extra: FxHashMap<String, Value>,
    ) -> Result<MessageAccepted, ServiceError> {
        let stream = self.lookup(stream_id)?;
        let message = StreamMessage::server(channel, data).with_extra(extra);
        let message_id = message.id().to_string();
        stream.publish(message)?;
        Ok(MessageAccepted { message_id })
    }

    /// Open a subscription on a stream.
    ///
    /// With `long_poll` the returned [`DeliveryAdapter`] yields frames until
    /// the connection ends; without it the (unretained) backlog is returned,
    /// which is always empty.
    pub fn subscribe(&self, stream_id: &str, long_poll: bool) -> Result<Subscription, ServiceError> {
        let stream = self.lookup(stream_id)?;
        if long_poll {
            Ok(Subscription::LongPoll(DeliveryAdapter::attach(
                stream,
                self.delivery.clone(),
            )))
        } else {
            Ok(Subscription::Backlog(Vec::new()))
        }
    }

    fn lookup(&self, stream_id: &str) -> Result<Arc<MessageStream>, ServiceError> {
        self.directory
            .get(stream_id)
            .ok_or_else(|| ServiceError::StreamNotFound {
                stream_id: stream_id.to_string(),
            })
    }
}
