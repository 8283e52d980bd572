//! Error types for the tiered cache
//!
//! Provides unified error handling using thiserror.

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Failures surfaced by `get` and `fetch`.
///
/// Storage-layer failures never appear here: they are recovered or swallowed
/// inside `save`. The enum is `Clone` so a single fetch outcome can be handed
/// to every caller attached to it.
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    /// The validate predicate rejected the parsed data
    #[error("DATA_INVALID_ERR: fetched data for {0} failed validation")]
    DataInvalid(String),

    /// The parse step rejected the raw fetched data
    #[error("parse failed for {key}: {cause}")]
    Parse {
        key: String,
        cause: Arc<anyhow::Error>,
    },

    /// The strategy's fetch reported an error, passed through unmodified
    #[error("fetch failed for {key}: {cause}")]
    Fetch {
        key: String,
        cause: Arc<anyhow::Error>,
    },

    /// The fetch task ended without producing a result
    #[error("fetch abandoned for {0}")]
    FetchAbandoned(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// Stable error name, as reported to HTTP clients.
    pub fn name(&self) -> &'static str {
        match self {
            CacheError::DataInvalid(_) => "DATA_INVALID_ERR",
            CacheError::Parse { .. } => "PARSE_ERR",
            CacheError::Fetch { .. } => "FETCH_ERR",
            CacheError::FetchAbandoned(_) => "FETCH_ABANDONED_ERR",
            CacheError::InvalidRequest(_) => "INVALID_REQUEST_ERR",
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::DataInvalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::Parse { .. } | CacheError::Fetch { .. } => StatusCode::BAD_GATEWAY,
            CacheError::FetchAbandoned(_) => StatusCode::BAD_GATEWAY,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorResponse::new(self.to_string(), self.name()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the tiered cache.
pub type Result<T> = std::result::Result<T, CacheError>;
