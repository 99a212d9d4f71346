//! API route handlers
//!
//! - `health`: liveness, readiness, model status and metrics
//! - `search`: semantic search
//! - `documents`: index, list, fetch and delete stored documents

pub mod documents;
pub mod health;
pub mod search;

use crate::error::{ServerError, ServerResult};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

/// API version and base info
///
/// Returns server information including version and available endpoints.
pub async fn api_info() -> ServerResult<impl IntoResponse> {
    Ok(Json(json!({
        "name": "semsearch server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            "POST /api/search",
            "GET /api/status",
            "POST /api/documents",
            "GET /api/documents",
            "GET /api/documents/{id}",
            "DELETE /api/documents/{id}",
            "/health",
            "/ready",
            "/metrics"
        ]
    })))
}

/// 404 Not Found handler
pub async fn not_found() -> ServerError {
    ServerError::NotFound
}
