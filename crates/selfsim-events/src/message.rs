//! The immutable message record.

use selfsim_types::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HandlerError;

/// Heterogeneous key/value message body.
pub type Payload = serde_json::Map<String, Value>;

/// Topics with a fixed meaning in the kernel.
pub mod topics {
    /// Subscribing to this topic receives every message.
    pub const WILDCARD: &str = "*";
    /// Posted by the scheduler when an entity is added.
    pub const JOIN: &str = "join";
    /// Posted by the scheduler when an entity is dropped.
    pub const LEAVE: &str = "leave";
    /// Posted by the post office when a handler fails.
    pub const ERROR: &str = "ERROR";
}

/// An immutable message on the bus.
///
/// The serial is 0 until the message is posted; the owning post office
/// then stamps it with its next serial number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Post-order serial number, strictly increasing per post office.
    pub serial: u64,
    /// Routing topic.
    pub topic: String,
    /// Id of the poster, [`EntityId::KERNEL`] for kernel messages.
    pub sender: EntityId,
    /// Logical time at which the message was posted.
    pub time: u64,
    /// Message body.
    pub payload: Payload,
}

impl Message {
    /// Create an unposted message with an empty payload.
    pub fn new(topic: impl Into<String>, sender: EntityId, time: u64) -> Self {
        Self {
            serial: 0,
            topic: topic.into(),
            sender,
            time,
            payload: Payload::new(),
        }
    }

    /// Add a payload entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Replace the whole payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Whether the message is routed on `topic`.
    pub fn is(&self, topic: &str) -> bool {
        self.topic == topic
    }

    /// Raw payload value for `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Payload value for `key` as an unsigned integer.
    pub fn get_u64(&self, key: &str) -> Result<u64, HandlerError> {
        self.get(key)
            .and_then(Value::as_u64)
            .ok_or_else(|| HandlerError::payload(key))
    }

    /// Payload value for `key` as a signed integer.
    pub fn get_i64(&self, key: &str) -> Result<i64, HandlerError> {
        self.get(key)
            .and_then(Value::as_i64)
            .ok_or_else(|| HandlerError::payload(key))
    }

    /// Payload value for `key` as a string.
    pub fn get_str(&self, key: &str) -> Result<&str, HandlerError> {
        self.get(key)
            .and_then(Value::as_str)
            .ok_or_else(|| HandlerError::payload(key))
    }
}
