use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Default content type for JSON-encoded payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// The wire-level unit of data exchanged with the broker.
///
/// Serialized shape: `{"id", "topic", "contentType", "timestamp", "payload"}`.
/// The `topic` names the event/task type and must match exactly one registered
/// handler at consume time, otherwise the delivery is unroutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub id: String,
    pub topic: String,
    pub content_type: String,
    pub timestamp: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Create an envelope with a fresh message id and the current timestamp.
    pub fn new(topic: impl Into<String>, content_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            content_type: content_type.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Create a JSON envelope from any serializable payload.
    pub fn json<T: Serialize>(topic: impl Into<String>, payload: &T) -> Result<Self> {
        Ok(Self::new(topic, CONTENT_TYPE_JSON, serde_json::to_value(payload)?))
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope(id={}, topic={}, contentType={})", self.id, self.topic, self.content_type)
    }
}

/// The consumer-side decode target: only the fields dispatch needs.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedEnvelope {
    pub topic: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ReceivedEnvelope {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Re-serialize the payload for a typed handler.
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_with_camel_case_keys() {
        let envelope = Envelope::json("UserCreated", &serde_json::json!({"email": "ada@example.com"})).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&envelope.to_bytes().unwrap()).unwrap();

        assert!(value.get("id").is_some());
        assert_eq!(value["topic"], "UserCreated");
        assert_eq!(value["contentType"], CONTENT_TYPE_JSON);
        assert!(value.get("timestamp").is_some());
        assert_eq!(value["payload"]["email"], "ada@example.com");
    }

    #[test]
    fn envelope_ids_are_unique() {
        let a = Envelope::new("T", CONTENT_TYPE_JSON, serde_json::Value::Null);
        let b = Envelope::new("T", CONTENT_TYPE_JSON, serde_json::Value::Null);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn received_envelope_round_trips_from_published_bytes() {
        let envelope = Envelope::json("StoreUserImage", &serde_json::json!({"bucket": "avatars"})).unwrap();
        let received = ReceivedEnvelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();

        assert_eq!(received.topic, "StoreUserImage");
        assert_eq!(received.payload["bucket"], "avatars");
    }
}
