//! # semsearch matcher (`matcher`)
//!
//! ## Purpose
//!
//! `matcher` sits on top of the embedding layer (`semantic`) and the document
//! store (`index`). It turns a free-text query into a vector, compares it to
//! every stored embedding by cosine similarity and returns the best matches.
//!
//! ## Core Types
//!
//! - [`cosine_similarity`] / [`rank`]: pure scoring and stable top-k.
//! - [`SearchService`]: readiness check, query embedding, store read, ranking.
//! - [`SearchConfig`]: `top_k` (default 5) and the parallel-scoring threshold.
//! - [`SearchResult`]: id, title, content and similarity of one hit.
//! - [`SearchMetrics`]: optional observer for latency, hits and outcome.
//!
//! ## Example Usage
//!
//! ```
//! use std::sync::Arc;
//! use index::{BackendConfig, DocumentIndex};
//! use matcher::{NewDocument, SearchConfig, SearchService};
//! use semantic::{EmbeddingBackend, LifecycleConfig, ModelConfig, ModelLifecycle};
//!
//! # #[tokio::main(flavor = "multi_thread")]
//! # async fn main() {
//! let model = ModelConfig {
//!     backend: EmbeddingBackend::Stub,
//!     required_files: Vec::new(),
//!     ..Default::default()
//! };
//! let lifecycle = Arc::new(ModelLifecycle::new(model, LifecycleConfig::default()));
//! let store = Arc::new(DocumentIndex::open(&BackendConfig::in_memory()).unwrap());
//! let service = SearchService::new(lifecycle, store, SearchConfig::default());
//!
//! service
//!     .index_document(NewDocument::new("1", "User login", "Password validation"))
//!     .await
//!     .unwrap();
//! let hits = service.search("User login\nPassword validation").await.unwrap();
//! assert_eq!(hits[0].id, "1");
//! # }
//! ```

pub mod engine;
pub mod metrics;
pub mod ranker;
pub mod types;

pub use engine::SearchService;
pub use metrics::{SearchMetrics, SearchOutcome};
pub use ranker::{cosine_similarity, rank, rank_with_threshold, DimensionMismatch};
pub use types::{MatchError, NewDocument, SearchConfig, SearchResult};
