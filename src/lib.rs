//! Workspace umbrella crate for semsearch.
//!
//! Wires the embedding layer (`semantic`), the document store (`index`) and
//! the ranking service (`matcher`) into one [`SearchStack`] built from a
//! [`SemsearchConfig`], and re-exports their public API so callers need a
//! single dependency.
//!
//! ```
//! use semsearch::{EmbeddingBackend, SearchStack, SemsearchConfig, StoreBackend};
//!
//! # #[tokio::main(flavor = "multi_thread")]
//! # async fn main() {
//! let mut config = SemsearchConfig::default();
//! config.model.backend = EmbeddingBackend::Stub;
//! config.model.required_files.clear();
//! config.store.backend = StoreBackend::InMemory;
//!
//! let stack = SearchStack::build(&config).unwrap();
//! semsearch::seed_sample_documents(stack.service()).await.unwrap();
//!
//! let hits = stack.service().search("export spreadsheets").await.unwrap();
//! assert_eq!(hits.len(), 2);
//! # }
//! ```

pub mod config;

pub use config::{
    ConfigLoadError, ENV_DB_PATH, ENV_MODELS_ROOT, SemsearchConfig, StoreBackend, StoreYamlConfig,
};
pub use index::{BackendConfig, Document, DocumentIndex, DocumentStore, StoreError};
pub use matcher::{
    MatchError, NewDocument, SearchConfig, SearchMetrics, SearchOutcome, SearchResult,
    SearchService, cosine_similarity, rank,
};
pub use semantic::{
    EmbeddingBackend, EmbeddingModel, LifecycleConfig, LifecycleState, ModelConfig,
    ModelLifecycle, ModelLoader, ModelStatus, RetryConfig, SemanticError,
};

use std::sync::Arc;

use thiserror::Error;

/// Errors raised while assembling a [`SearchStack`].
#[derive(Debug, Error)]
pub enum StackError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigLoadError),
    #[error("failed to open document store: {0}")]
    Store(#[from] StoreError),
}

/// Lifecycle, store and search service built from one configuration.
///
/// The model is not loaded here; call [`ModelLifecycle::spawn_warmup`] or let
/// the first search load it.
#[derive(Clone)]
pub struct SearchStack {
    lifecycle: Arc<ModelLifecycle>,
    store: Arc<DocumentIndex>,
    service: SearchService,
}

impl SearchStack {
    pub fn build(config: &SemsearchConfig) -> Result<Self, StackError> {
        Self::with_loader(config, semantic::loader_for(&config.model))
    }

    /// Like [`build`](Self::build) with an explicit model loader in place of
    /// the one `config.model.backend` selects.
    pub fn with_loader(
        config: &SemsearchConfig,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<Self, StackError> {
        config.validate()?;

        let store = Arc::new(DocumentIndex::open(&config.store.backend_config())?);
        let lifecycle = Arc::new(ModelLifecycle::with_loader(
            config.model.clone(),
            config.lifecycle.clone(),
            loader,
        ));
        let service = SearchService::new(
            Arc::clone(&lifecycle),
            store.clone(),
            config.search.clone(),
        );

        tracing::info!(
            model = %config.model.model_name,
            backend = ?config.model.backend,
            store = ?config.store.backend,
            top_k = config.search.top_k,
            "search stack ready"
        );

        Ok(Self {
            lifecycle,
            store,
            service,
        })
    }

    /// Attach a metrics observer to the service.
    pub fn with_metrics(mut self, metrics: Arc<dyn SearchMetrics>) -> Self {
        self.service = self.service.with_metrics(metrics);
        self
    }

    pub fn lifecycle(&self) -> &Arc<ModelLifecycle> {
        &self.lifecycle
    }

    pub fn store(&self) -> &Arc<DocumentIndex> {
        &self.store
    }

    pub fn service(&self) -> &SearchService {
        &self.service
    }
}

/// The bundled demo corpus.
pub fn sample_documents() -> Vec<NewDocument> {
    vec![
        NewDocument::new(
            "1",
            "User login",
            "Implements user login, including username and password validation \
             and remembering the login state",
        ),
        NewDocument::new(
            "2",
            "Data export",
            "Supports exporting data to Excel and CSV formats",
        ),
    ]
}

/// Embeds and stores [`sample_documents`], replacing earlier copies.
pub async fn seed_sample_documents(service: &SearchService) -> Result<usize, MatchError> {
    let count = service.index_documents(sample_documents()).await?;
    tracing::info!(count, "sample documents indexed");
    Ok(count)
}
