//! Message types and the fixed wire codec for the stream bus.
//!
//! A [`StreamMessage`] is one immutable unit of communication: a unique id,
//! the channel it is routed on, which side produced it, an opaque JSON body,
//! and open-ended side-channel metadata. Messages are constructed once and
//! never mutated; transformations such as [`StreamMessage::with_source`]
//! consume the value and return a new one.
//!
//! # Wire format
//!
//! The wire record is a single JSON object with fixed field names:
//!
//! ```json
//! {
//!   "id": "9f9f1c6e-...",
//!   "channel": "chat",
//!   "source": "client",
//!   "data": {"text": "hi"},
//!   "extra": {}
//! }
//! ```
//!
//! Decoding is lenient: a missing `id` gets a fresh UUID, a missing `channel`
//! defaults to the empty string, a missing `source` defaults to `"server"`,
//! and missing `data`/`extra` default to empty objects. Only an unrecognized
//! `source` tag is rejected.
//!
//! # Examples
//!
//! ```
//! use streambus::message::{MessageSource, StreamMessage};
//! use serde_json::json;
//!
//! let msg = StreamMessage::client("chat", json!({"text": "hi"}));
//! assert_eq!(msg.channel(), "chat");
//! assert!(msg.source().is_client());
//!
//! let round_tripped = StreamMessage::from_wire(&msg.to_wire()).unwrap();
//! assert_eq!(msg, round_tripped);
//! ```

use std::fmt;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;
use uuid::Uuid;

/// Errors produced while decoding a wire record into a [`StreamMessage`].
#[derive(Debug, Error, Diagnostic)]
pub enum MessageError {
    /// The `source` field carried a tag other than `"client"` or `"server"`.
    #[error("unrecognized message source tag: {tag}")]
    #[diagnostic(code(streambus::message::unknown_source))]
    UnknownSource { tag: String },

    /// The wire record was not a JSON object.
    #[error("malformed wire record: expected a JSON object")]
    #[diagnostic(code(streambus::message::not_an_object))]
    NotAnObject,
}

/// Which side of the connection produced a message.
///
/// Serializes to the string tags `"client"` and `"server"`. The default is
/// [`MessageSource::Server`], matching the lenient wire decode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    /// Produced by a remote client.
    Client,
    /// Produced by server-side logic.
    #[default]
    Server,
}

impl MessageSource {
    /// Wire tag for client-sourced messages.
    pub const CLIENT: &'static str = "client";
    /// Wire tag for server-sourced messages.
    pub const SERVER: &'static str = "server";

    /// Parse a wire tag into a source.
    ///
    /// # Examples
    /// ```
    /// use streambus::message::MessageSource;
    ///
    /// assert_eq!(MessageSource::parse("client").unwrap(), MessageSource::Client);
    /// assert!(MessageSource::parse("gateway").is_err());
    /// ```
    pub fn parse(tag: &str) -> Result<Self, MessageError> {
        match tag {
            Self::CLIENT => Ok(Self::Client),
            Self::SERVER => Ok(Self::Server),
            other => Err(MessageError::UnknownSource {
                tag: other.to_string(),
            }),
        }
    }

    /// The string tag used on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => Self::CLIENT,
            Self::Server => Self::SERVER,
        }
    }

    /// Returns `true` for [`MessageSource::Client`].
    #[must_use]
    pub fn is_client(&self) -> bool {
        matches!(self, Self::Client)
    }

    /// Returns `true` for [`MessageSource::Server`].
    #[must_use]
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server)
    }
}

impl fmt::Display for MessageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn fresh_message_id() -> String {
    Uuid::new_v4().to_string()
}

fn empty_body() -> Value {
    Value::Object(Map::new())
}

/// One immutable unit of communication on a stream.
///
/// Fields are private; once a message is constructed it cannot be changed.
/// The `with_*` builders consume the message and return a new value, which is
/// how server-side code overrides a client-declared source without mutation.
///
/// # Examples
///
/// ```
/// use streambus::message::{MessageSource, StreamMessage};
/// use serde_json::json;
///
/// let claimed = StreamMessage::server("chat", json!("hi"));
/// let forced = claimed.clone().with_source(MessageSource::Client);
/// assert!(claimed.source().is_server());
/// assert!(forced.source().is_client());
/// assert_eq!(claimed.id(), forced.id());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(default = "fresh_message_id")]
    id: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    source: MessageSource,
    #[serde(default = "empty_body")]
    data: Value,
    #[serde(default)]
    extra: FxHashMap<String, Value>,
}

impl StreamMessage {
    /// Create a message with a fresh unique id and no extra metadata.
    #[must_use]
    pub fn new(channel: impl Into<String>, source: MessageSource, data: Value) -> Self {
        Self {
            id: fresh_message_id(),
            channel: channel.into(),
            source,
            data,
            extra: FxHashMap::default(),
        }
    }

    /// Create a client-sourced message.
    ///
    /// # Examples
    /// ```
    /// use streambus::message::StreamMessage;
    /// use serde_json::json;
    ///
    /// let msg = StreamMessage::client("chat", json!("hi"));
    /// assert!(msg.source().is_client());
    /// ```
    #[must_use]
    pub fn client(channel: impl Into<String>, data: Value) -> Self {
        Self::new(channel, MessageSource::Client, data)
    }

    /// Create a server-sourced message.
    #[must_use]
    pub fn server(channel: impl Into<String>, data: Value) -> Self {
        Self::new(channel, MessageSource::Server, data)
    }

    /// Return a copy of this message carrying the given id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Return a copy of this message attributed to the given source.
    #[must_use]
    pub fn with_source(mut self, source: MessageSource) -> Self {
        self.source = source;
        self
    }

    /// Return a copy of this message carrying the given extra metadata.
    #[must_use]
    pub fn with_extra(mut self, extra: FxHashMap<String, Value>) -> Self {
        self.extra = extra;
        self
    }

    /// Unique identifier assigned at construction.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Channel this message is routed on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Which side produced this message.
    #[must_use]
    pub fn source(&self) -> MessageSource {
        self.source
    }

    /// Opaque message body.
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Open-ended side-channel metadata.
    #[must_use]
    pub fn extra(&self) -> &FxHashMap<String, Value> {
        &self.extra
    }

    /// Render the fixed wire record.
    ///
    /// Field names (`id`, `channel`, `source`, `data`, `extra`) are part of
    /// the wire contract and never change.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        json!({
            "id": self.id,
            "channel": self.channel,
            "source": self.source.as_str(),
            "data": self.data,
            "extra": self.extra,
        })
    }

    /// Render the wire record as a compact JSON string.
    pub fn to_wire_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_wire())
    }

    /// Decode a wire record.
    ///
    /// Decoding is total over well-formed objects: absent fields take the
    /// documented defaults. The only rejections are a non-object record and
    /// an unrecognized `source` tag.
    ///
    /// # Examples
    /// ```
    /// use streambus::message::{MessageSource, StreamMessage};
    /// use serde_json::json;
    ///
    /// let msg = StreamMessage::from_wire(&json!({"data": "hi"})).unwrap();
    /// assert_eq!(msg.channel(), "");
    /// assert_eq!(msg.source(), MessageSource::Server);
    /// assert!(!msg.id().is_empty());
    /// ```
    pub fn from_wire(value: &Value) -> Result<Self, MessageError> {
        let record = value.as_object().ok_or(MessageError::NotAnObject)?;

        let source = match record.get("source") {
            None | Some(Value::Null) => MessageSource::Server,
            Some(Value::String(tag)) => MessageSource::parse(tag)?,
            Some(other) => {
                return Err(MessageError::UnknownSource {
                    tag: other.to_string(),
                });
            }
        };

        Ok(Self {
            id: record
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(fresh_message_id),
            channel: record
                .get("channel")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            source,
            data: record.get("data").cloned().unwrap_or_else(empty_body),
            extra: record
                .get("extra")
                .and_then(Value::as_object)
                .map(|map| map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_assigns_fresh_ids() {
        let a = StreamMessage::client("chat", json!("one"));
        let b = StreamMessage::client("chat", json!("two"));
        assert!(!a.id().is_empty());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn with_source_leaves_original_untouched() {
        let original = StreamMessage::server("chat", json!("hi"));
        let forced = original.clone().with_source(MessageSource::Client);
        assert!(original.source().is_server());
        assert!(forced.source().is_client());
    }

    #[test]
    fn source_tags_round_trip() {
        assert_eq!(MessageSource::parse("client").unwrap().as_str(), "client");
        assert_eq!(MessageSource::parse("server").unwrap().as_str(), "server");
        assert!(MessageSource::parse("proxy").is_err());
    }

    #[test]
    fn source_display_matches_wire_tag() {
        assert_eq!(MessageSource::Client.to_string(), "client");
        assert_eq!(MessageSource::Server.to_string(), "server");
    }

    #[test]
    fn serde_round_trip() {
        let original = StreamMessage::client("chat", json!({"text": "hi"}));
        let encoded = serde_json::to_string(&original).expect("serialize");
        let decoded: StreamMessage = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(original, decoded);
    }
}
