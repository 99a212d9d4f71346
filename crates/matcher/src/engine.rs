use std::sync::Arc;
use std::time::Instant;

use index::{Document, DocumentStore};
use semantic::{ModelLifecycle, ModelStatus, SemanticError};

use crate::metrics::{SearchMetrics, SearchOutcome};
use crate::ranker::rank_with_threshold;
use crate::types::{MatchError, NewDocument, SearchConfig, SearchResult};


/// Query-time orchestration: ensure the model is ready, embed the query, load
/// the corpus and rank it.
///
/// Cheap to clone; every clone shares the lifecycle, store and metrics.
#[derive(Clone)]
pub struct SearchService {
    lifecycle: Arc<ModelLifecycle>,
    store: Arc<dyn DocumentStore>,
    config: SearchConfig,
    metrics: Option<Arc<dyn SearchMetrics>>,
}

impl SearchService {
    pub fn new(
        lifecycle: Arc<ModelLifecycle>,
        store: Arc<dyn DocumentStore>,
        config: SearchConfig,
    ) -> Self {
        Self {
            lifecycle,
            store,
            config,
            metrics: None,
        }
    }

    /// Attach a metrics observer to this service.
    pub fn with_metrics(mut self, metrics: Arc<dyn SearchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn lifecycle(&self) -> &Arc<ModelLifecycle> {
        &self.lifecycle
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn status(&self) -> ModelStatus {
        self.lifecycle.status()
    }

    /// Top-k documents for `query`, best first.
    ///
    /// A blank query returns no results without touching the model.
    pub async fn search(&self, query: &str) -> Result<Vec<SearchResult>, MatchError> {
        let start = Instant::now();

        if query.trim().is_empty() {
            tracing::debug!("blank query, returning no results");
            self.record_search(start, 0, SearchOutcome::EmptyQuery);
            return Ok(Vec::new());
        }

        let result = self.run_search(query).await;
        match &result {
            Ok(hits) => {
                tracing::info!(
                    query_len = query.len(),
                    results = hits.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "search complete"
                );
                self.record_search(start, hits.len(), SearchOutcome::Ok);
            }
            Err(err) => {
                tracing::warn!(
                    query_len = query.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %err,
                    "search failed"
                );
                self.record_search(start, 0, SearchOutcome::from_error(err));
            }
        }
        result
    }

    async fn run_search(&self, query: &str) -> Result<Vec<SearchResult>, MatchError> {
        let query_vector = self.embed(query.to_owned()).await?;

        let store = Arc::clone(&self.store);
        let top_k = self.config.top_k;
        let threshold = self.config.parallel_threshold;
        tokio::task::spawn_blocking(move || -> Result<Vec<SearchResult>, MatchError> {
            let documents = store.get_all()?;
            if documents.is_empty() {
                return Ok(Vec::new());
            }
            rank_with_threshold(&query_vector, &documents, top_k, threshold)
        })
        .await
        .map_err(|e| MatchError::Internal(format!("ranking task failed: {e}")))?
    }

    /// Embeds `"{title}\n{content}"` and inserts or replaces the document.
    pub async fn index_document(&self, document: NewDocument) -> Result<Document, MatchError> {
        let start = Instant::now();
        let result = self.run_index(document).await;
        let outcome = match &result {
            Ok(doc) => {
                tracing::info!(
                    doc_id = %doc.id,
                    dim = doc.embedding.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "document indexed"
                );
                SearchOutcome::Ok
            }
            Err(err) => {
                tracing::warn!(error = %err, "document indexing failed");
                SearchOutcome::from_error(err)
            }
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_index(start.elapsed(), outcome);
        }
        result
    }

    async fn run_index(&self, document: NewDocument) -> Result<Document, MatchError> {
        if document.id.trim().is_empty() {
            return Err(MatchError::InvalidRequest("document id must not be empty".into()));
        }
        let embedding = self.embed(document.embedding_text()).await?;
        let stored = Document {
            id: document.id,
            title: document.title,
            content: document.content,
            embedding,
        };

        let store = Arc::clone(&self.store);
        let record = stored.clone();
        tokio::task::spawn_blocking(move || store.upsert(record))
            .await
            .map_err(|e| MatchError::Internal(format!("store task failed: {e}")))??;
        Ok(stored)
    }

    /// Indexes documents in order, stopping at the first failure.
    pub async fn index_documents<I>(&self, documents: I) -> Result<usize, MatchError>
    where
        I: IntoIterator<Item = NewDocument>,
    {
        let mut count = 0;
        for document in documents {
            self.index_document(document).await?;
            count += 1;
        }
        Ok(count)
    }

    /// Embeds on the blocking pool once the model is ready.
    ///
    /// `ModelNotLoaded` from the lifecycle triggers one more readiness check
    /// and a single re-embed.
    async fn embed(&self, text: String) -> Result<Vec<f32>, MatchError> {
        self.lifecycle
            .ensure_ready()
            .await
            .map_err(MatchError::SearchUnavailable)?;

        match self.embed_blocking(text.clone()).await {
            Err(SemanticError::ModelNotLoaded) => {
                tracing::warn!("model not loaded at embed time, re-checking readiness");
                self.lifecycle
                    .ensure_ready()
                    .await
                    .map_err(MatchError::SearchUnavailable)?;
                self.embed_blocking(text).await.map_err(MatchError::Embedding)
            }
            other => other.map_err(MatchError::Embedding),
        }
    }

    async fn embed_blocking(&self, text: String) -> Result<Vec<f32>, SemanticError> {
        let lifecycle = Arc::clone(&self.lifecycle);
        tokio::task::spawn_blocking(move || lifecycle.embed(&text))
            .await
            .map_err(|e| SemanticError::Embedding(format!("embedding task failed: {e}")))?
    }

    fn record_search(&self, start: Instant, hits: usize, outcome: SearchOutcome) {
        if let Some(metrics) = &self.metrics {
            metrics.record_search(start.elapsed(), hits, outcome);
        }
    }
}
