//! Messages exchanged between agents on the bus.
//!
//! A [`Message`] is built once per send and never mutated afterwards. The bus
//! derives an enriched copy (with `message_id` attached to the metadata) before
//! delivery, so the receiver can correlate its processing span with the
//! `message_sent` event recorded for the send.
//!
//! # Examples
//!
//! ```
//! use agent_observatory::message::{Message, MessageType};
//! use serde_json::json;
//!
//! let message = Message::new("Planner", "Coder", "Write the parser")
//!     .with_type(MessageType::Command)
//!     .with_metadata("priority", json!("high"));
//!
//! assert_eq!(message.sender(), "Planner");
//! assert_eq!(message.receiver(), "Coder");
//! assert_eq!(message.metadata()["priority"], "high");
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Metadata key under which the bus attaches the correlation id.
pub const MESSAGE_ID_KEY: &str = "message_id";

/// Kind of payload a message carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    #[default]
    Text,
    Command,
    Data,
    Other(String),
}

impl MessageType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Command => "command",
            Self::Data => "data",
            Self::Other(kind) => kind,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A standard message passed between agents via the [`MessageBus`](crate::bus::MessageBus).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    sender: String,
    receiver: String,
    content: String,
    #[serde(rename = "type", default)]
    message_type: MessageType,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

impl Message {
    /// Create a text message with a fresh id and the current UTC timestamp.
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender: sender.into(),
            receiver: receiver.into(),
            content: content.into(),
            message_type: MessageType::default(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn receiver(&self) -> &str {
        &self.receiver
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn message_type(&self) -> &MessageType {
        &self.message_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// The correlation id attached by the bus, if this message went through one.
    pub fn message_id(&self) -> Option<&str> {
        self.metadata.get(MESSAGE_ID_KEY).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_message_defaults() {
        let message = Message::new("A", "B", "hello");

        assert_eq!(message.sender(), "A");
        assert_eq!(message.receiver(), "B");
        assert_eq!(message.content(), "hello");
        assert_eq!(message.message_type(), &MessageType::Text);
        assert!(message.metadata().is_empty());
        assert!(message.message_id().is_none());
        assert!(Uuid::parse_str(message.id()).is_ok());
    }

    #[test]
    fn test_each_message_gets_unique_id() {
        let first = Message::new("A", "B", "one");
        let second = Message::new("A", "B", "one");

        assert_ne!(first.id(), second.id());
    }

    #[test]
    fn test_message_id_read_from_metadata() {
        let message = Message::new("A", "B", "hi").with_metadata(MESSAGE_ID_KEY, json!("msg-1"));

        assert_eq!(message.message_id(), Some("msg-1"));
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(MessageType::Command.to_string(), "command");
        assert_eq!(MessageType::Other("ping".to_string()).to_string(), "ping");
    }

    #[test]
    fn test_serializes_type_field() {
        let message = Message::new("A", "B", "x").with_type(MessageType::Data);
        let value = serde_json::to_value(&message).unwrap();

        assert_eq!(value["type"], "data");
        assert_eq!(value["sender"], "A");
    }
}
