//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

/// Maximum accepted resource id length
pub const MAX_ID_LENGTH: usize = 256;

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `id`: Resource id, prefixed by the cache before storage
/// - `value`: Any JSON value to store in both tiers
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The resource id
    pub id: String,
    /// The value to store
    pub value: Value,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_id(&self.id)
    }
}

/// Checks a resource id from a path or body.
pub fn validate_id(id: &str) -> Option<String> {
    if id.is_empty() {
        return Some("Id cannot be empty".to_string());
    }
    if id.len() > MAX_ID_LENGTH {
        return Some(format!(
            "Id exceeds maximum length of {} characters",
            MAX_ID_LENGTH
        ));
    }
    None
}
