use index::StoreError;
use semantic::SemanticError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ranked hit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub content: String,
    /// Cosine similarity in `[-1.0, 1.0]`.
    pub similarity: f32,
}

/// A document to embed and store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewDocument {
    pub id: String,
    pub title: String,
    pub content: String,
}

impl NewDocument {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Text that gets embedded for this document.
    pub fn embedding_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }
}

/// Tuning for [`SearchService`](crate::SearchService).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of results returned per query.
    pub top_k: usize,
    /// Corpus size from which scoring fans out over rayon.
    pub parallel_threshold: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            parallel_threshold: 2048,
        }
    }
}

#[derive(Debug, Error)]
pub enum MatchError {
    /// The model could not be made ready; the search cannot run right now.
    #[error("search unavailable: {0}")]
    SearchUnavailable(#[source] SemanticError),
    /// The model was ready but failed to embed the text.
    #[error("embedding failed: {0}")]
    Embedding(#[source] SemanticError),
    /// A stored embedding does not match the query's dimension.
    #[error("document {doc_id} has embedding dimension {found}, query has {expected}")]
    DimensionMismatch {
        doc_id: String,
        expected: usize,
        found: usize,
    },
    #[error("document store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// A blocking task panicked or was cancelled.
    #[error("internal error: {0}")]
    Internal(String),
}
