//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `GET /get/:id` - Read-through lookup, fetching from the origin on a miss
//! - `PUT /set` - Save a value into both tiers
//! - `GET /timestamp/:id` - Durable write time of an entry
//! - `DELETE /clear` - Remove every durable entry under the prefix
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
