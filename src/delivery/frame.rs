use serde_json::{Value, json};

use crate::message::StreamMessage;

/// One framed event on a delivery connection.
///
/// A heartbeat frame carries a `type` tag so consumers can keep the
/// connection alive without mistaking it for payload.
#[derive(Clone, Debug, PartialEq)]
pub enum DeliveryFrame {
    /// A real message, rendered as the wire record.
    Message(StreamMessage),
    /// Synthetic keep-alive emitted after an idle heartbeat interval.
    Heartbeat,
}

impl DeliveryFrame {
    #[must_use]
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, Self::Heartbeat)
    }

    /// The carried message, if this is a message frame.
    #[must_use]
    pub fn message(&self) -> Option<&StreamMessage> {
        match self {
            Self::Message(message) => Some(message),
            Self::Heartbeat => None,
        }
    }

    /// Render the frame for a JSON-framed transport.
    ///
    /// # Examples
    /// ```
    /// use streambus::delivery::DeliveryFrame;
    /// use serde_json::json;
    ///
    /// assert_eq!(DeliveryFrame::Heartbeat.to_json_value(), json!({"type": "heartbeat"}));
    /// ```
    #[must_use]
    pub fn to_json_value(&self) -> Value {
        match self {
            Self::Message(message) => message.to_wire(),
            Self::Heartbeat => json!({"type": "heartbeat"}),
        }
    }

    /// Render the frame as a compact JSON string.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.to_json_value())
    }
}
