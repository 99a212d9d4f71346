use crate::error::{ServerError, ServerResult};
use crate::telemetry::record_model_status;
use crate::state::ServerState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use semantic::ModelStatus;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Health check endpoint (liveness)
/// Returns 200 if server is running
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "semsearch-server",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
    }))
}

/// Readiness check endpoint
///
/// 200 once the embedding model is loaded, 503 otherwise. Does not trigger a
/// load.
pub async fn readiness_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let status = state.service().status();
    record_model_status(&status);

    let (code, label) = if status.is_ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        code,
        Json(json!({
            "status": label,
            "service": "semsearch-server",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "uptime_seconds": state.uptime_seconds(),
            "model": status,
        })),
    )
}

/// `GET /api/status` body
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub model: ModelStatus,
    pub timestamp: String,
}

/// Model status snapshot. Always 200; readiness lives in `model.isReady`.
pub async fn api_status(State(state): State<Arc<ServerState>>) -> Json<StatusResponse> {
    let model = state.service().status();
    record_model_status(&model);

    Json(StatusResponse {
        status: "ok",
        model,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Prometheus metrics endpoint
pub async fn metrics(State(state): State<Arc<ServerState>>) -> ServerResult<impl IntoResponse> {
    let handle = state.prometheus.as_ref().ok_or(ServerError::NotFound)?;
    record_model_status(&state.service().status());

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}
