use crate::error::{ServerError, ServerResult};
use crate::state::ServerState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use index::{Document, DocumentStore};
use matcher::NewDocument;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request to index a document
#[derive(Debug, Deserialize)]
pub struct IndexDocumentRequest {
    pub id: String,
    pub title: String,
    pub content: String,
}

/// A stored document without its embedding
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    pub content: String,
    pub embedding_dim: usize,
}

impl From<Document> for DocumentSummary {
    fn from(doc: Document) -> Self {
        Self {
            embedding_dim: doc.embedding.len(),
            id: doc.id,
            title: doc.title,
            content: doc.content,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentListResponse {
    pub total: usize,
    pub documents: Vec<DocumentSummary>,
}

/// Embed and insert (or replace) one document.
pub async fn index_document(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<IndexDocumentRequest>,
) -> ServerResult<(StatusCode, Json<DocumentSummary>)> {
    let stored = state
        .service()
        .index_document(NewDocument::new(request.id, request.title, request.content))
        .await?;
    Ok((StatusCode::CREATED, Json(stored.into())))
}

/// List stored documents in insertion order.
pub async fn list_documents(
    State(state): State<Arc<ServerState>>,
) -> ServerResult<Json<DocumentListResponse>> {
    let documents: Vec<DocumentSummary> = state
        .service()
        .store()
        .get_all()?
        .into_iter()
        .map(DocumentSummary::from)
        .collect();

    Ok(Json(DocumentListResponse {
        total: documents.len(),
        documents,
    }))
}

pub async fn get_document(
    State(state): State<Arc<ServerState>>,
    Path(doc_id): Path<String>,
) -> ServerResult<Json<DocumentSummary>> {
    let doc = state
        .service()
        .store()
        .get(&doc_id)?
        .ok_or(ServerError::NotFound)?;
    Ok(Json(doc.into()))
}

pub async fn delete_document(
    State(state): State<Arc<ServerState>>,
    Path(doc_id): Path<String>,
) -> ServerResult<StatusCode> {
    if state.service().store().delete(&doc_id)? {
        tracing::info!(doc_id = %doc_id, "document deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ServerError::NotFound)
    }
}
