//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheStats, Source};

/// Response body for the GET operation (GET /get/:id)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested id
    pub id: String,
    /// The cached or fetched value
    pub value: Value,
    /// Tier that answered
    pub source: Source,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(id: impl Into<String>, value: Value, source: Source) -> Self {
        Self {
            id: id.into(),
            value,
            source,
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The id that was saved
    pub id: String,
}

impl SetResponse {
    /// Creates a new SetResponse
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Id '{}' saved successfully", id),
            id,
        }
    }
}

/// Response body for GET /timestamp/:id
#[derive(Debug, Clone, Serialize)]
pub struct TimestampResponse {
    pub id: String,
    /// Durable write time in Unix milliseconds, 0 when not stored
    pub timestamp: i64,
}

/// Response body for DELETE /clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    /// Success message
    pub message: String,
    /// Number of durable entries removed
    pub removed: usize,
}

impl ClearResponse {
    pub fn new(removed: usize) -> Self {
        Self {
            message: format!("Cleared {} durable entries", removed),
            removed,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate across both tiers
    pub hit_rate: f64,
    /// Whether a durable backend is attached
    pub durable: bool,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: CacheStats, durable: bool) -> Self {
        let hit_rate = stats.hit_rate();
        Self {
            stats,
            hit_rate,
            durable,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
    /// Stable error name, e.g. DATA_INVALID_ERR
    pub name: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("post-1", json!({"title": "t"}), Source::Durable);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["id"], "post-1");
        assert_eq!(json["value"]["title"], "t");
        assert_eq!(json["source"], "durable");
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("post-1");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("post-1"));
        assert!(json.contains("successfully"));
    }

    #[test]
    fn test_clear_response_serialize() {
        let resp = ClearResponse::new(3);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["removed"], 3);
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let mut stats = CacheStats::new();
        stats.record_memory_hit();
        stats.record_durable_hit();
        stats.record_durable_hit();
        stats.record_miss();

        let resp = StatsResponse::new(stats, true);
        assert!((resp.hit_rate - 0.75).abs() < 0.001);

        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["memory_hits"], 1);
        assert_eq!(json["durable_hits"], 2);
        assert_eq!(json["durable"], true);
    }

    #[test]
    fn test_stats_response_zero_requests() {
        let resp = StatsResponse::new(CacheStats::new(), false);
        assert_eq!(resp.hit_rate, 0.0);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("fetched data failed validation", "DATA_INVALID_ERR");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["name"], "DATA_INVALID_ERR");
        assert_eq!(json["error"], "fetched data failed validation");
    }
}
