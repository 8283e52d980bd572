//! Envelope Module
//!
//! The `{timestamp, data}` record persisted per key in the durable store.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

// == Envelope ==
/// A persisted cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Write time (Unix milliseconds)
    pub timestamp: i64,
    /// The decoded value
    pub data: T,
}

/// Wire shape with every field optional, so partial records can be rejected
/// as a miss instead of failing deserialization with an error.
#[derive(Deserialize)]
struct RawEnvelope {
    timestamp: Option<i64>,
    data: Option<Value>,
}

impl<T> Envelope<T> {
    // == Constructor ==
    /// Wraps `data` stamped with the current time.
    pub fn new(data: T) -> Self {
        Self {
            timestamp: current_timestamp_ms(),
            data,
        }
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serializes to the durable wire format.
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    // == Decode ==
    /// Parses a stored string. Anything malformed (bad JSON, a missing field,
    /// `null` data, or data of the wrong shape) yields `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        let raw: RawEnvelope = serde_json::from_str(raw).ok()?;
        let timestamp = raw.timestamp?;
        let data = match raw.data? {
            Value::Null => return None,
            data => serde_json::from_value(data).ok()?,
        };
        Some(Self { timestamp, data })
    }
}

/// Returns the current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
