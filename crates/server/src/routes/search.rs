use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::State;
use axum::Json;
use matcher::SearchResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `POST /api/search` body
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

/// Rank stored documents against `query`.
///
/// A missing or empty `query` is a 400. A whitespace-only query is a valid
/// search with no results.
pub async fn search(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<SearchRequest>,
) -> ServerResult<Json<SearchResponse>> {
    let query = request
        .query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ServerError::BadRequest("query is required".into()))?;

    let results = state.service().search(&query).await?;
    Ok(Json(SearchResponse { results }))
}
