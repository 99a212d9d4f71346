//! semsearch embedding layer
//!
//! Turns text into fixed-length, unit-normalized vectors and owns the model
//! that does it. Two backends are available:
//!
//! - **ONNX** - a local sentence-transformer (`Xenova/all-MiniLM-L6-v2` by
//!   default) run through ONNX Runtime, mean-pooled over the attention mask.
//! - **Stub** - hash-derived vectors for development and tests.
//!
//! Models are never downloaded. The artifacts must already sit under
//! `<models_root>/<model_name>/`; a missing file is reported as
//! [`SemanticError::ModelFilesMissing`] and is not retried.
//!
//! ## Lifecycle
//!
//! [`ModelLifecycle`] loads the model on demand (or eagerly via
//! [`ModelLifecycle::spawn_warmup`]), bounds every attempt with a timeout,
//! retries transient failures and publishes a [`ModelStatus`] snapshot.
//!
//! ## Threading notes
//!
//! ONNX sessions are not `Send`. Each loaded ONNX model owns one session on a
//! dedicated thread and embeds from any thread are sent to it, so a model is
//! built once per load and never again after the lifecycle reports ready.
//!
//! ## Quick example
//!
//! ```
//! use semantic::{EmbeddingBackend, LifecycleConfig, ModelConfig, ModelLifecycle};
//!
//! # #[tokio::main(flavor = "multi_thread")]
//! # async fn main() {
//! let model = ModelConfig {
//!     backend: EmbeddingBackend::Stub,
//!     stub_dimension: 8,
//!     required_files: Vec::new(),
//!     ..Default::default()
//! };
//! let lifecycle = ModelLifecycle::new(model, LifecycleConfig::default());
//!
//! let embedder = lifecycle.ensure_ready().await.unwrap();
//! assert_eq!(embedder.embed("hello").unwrap().len(), 8);
//! assert!(lifecycle.status().is_ready);
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod retry;
pub mod status;

mod assets;
mod session;
mod normalize;
mod onnx;
mod serde_millis;
mod stub;

pub use assets::{verify_model_assets, ModelAssets};
pub use config::{EmbeddingBackend, LifecycleConfig, ModelConfig};
pub use error::SemanticError;
pub use lifecycle::ModelLifecycle;
pub use model::{loader_for, EmbeddingModel, ModelLoader, OnnxLoader, StubLoader};
pub use onnx::OnnxEmbedder;
pub use retry::RetryConfig;
pub use status::{LifecycleState, ModelStatus};
pub use stub::StubEmbedder;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    /// Runs against real model files when `SEMSEARCH_TEST_MODELS_ROOT` points at them.
    #[tokio::test(flavor = "multi_thread")]
    async fn real_model_inference() {
        let Ok(root) = std::env::var("SEMSEARCH_TEST_MODELS_ROOT") else {
            eprintln!("SEMSEARCH_TEST_MODELS_ROOT not set; skipping onnx inference test");
            return;
        };
        let cfg = ModelConfig {
            models_root: PathBuf::from(root),
            ..Default::default()
        };
        let lifecycle = ModelLifecycle::new(cfg, LifecycleConfig::default());
        let model = lifecycle.ensure_ready().await.unwrap();

        let login = model.embed("username and password validation").unwrap();
        let again = model.embed("username and password validation").unwrap();
        assert_eq!(login, again);
        assert_eq!(Some(login.len()), lifecycle.status().embedding_dim);

        let norm: f32 = login.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn onnx_backend_without_files_reports_missing() {
        let root = tempfile::tempdir().unwrap();
        let cfg = ModelConfig {
            models_root: root.path().to_path_buf(),
            ..Default::default()
        };
        let lifecycle = ModelLifecycle::new(cfg, LifecycleConfig::default());

        let err = lifecycle.ensure_ready().await.err().unwrap();
        assert!(matches!(err, SemanticError::ModelFilesMissing { ref missing, .. } if missing.len() == 5));
        let status = lifecycle.status();
        assert!(!status.is_ready);
        assert!(status.last_error.unwrap().contains("model files missing"));
    }
}
