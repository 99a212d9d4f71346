use std::sync::Arc;

use crate::assets::ModelAssets;
use crate::config::{EmbeddingBackend, ModelConfig};
use crate::onnx::OnnxEmbedder;
use crate::stub::StubEmbedder;
use crate::SemanticError;

/// A loaded text-embedding model.
///
/// `embed` is deterministic for a fixed model and input, returns vectors of
/// one fixed dimension, and may block: callers on an async runtime should go
/// through `spawn_blocking`.
pub trait EmbeddingModel: Send + Sync {
    fn name(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError>;
}

/// Instantiates a model from verified assets. Runs on the blocking pool.
pub trait ModelLoader: Send + Sync {
    fn load(&self, assets: &ModelAssets) -> Result<Arc<dyn EmbeddingModel>, SemanticError>;
}

/// Loads [`OnnxEmbedder`]s.
#[derive(Debug, Clone)]
pub struct OnnxLoader {
    pub max_sequence_length: usize,
}

impl ModelLoader for OnnxLoader {
    fn load(&self, assets: &ModelAssets) -> Result<Arc<dyn EmbeddingModel>, SemanticError> {
        let model = OnnxEmbedder::load(assets.clone(), self.max_sequence_length)?;
        Ok(Arc::new(model))
    }
}

/// Loads [`StubEmbedder`]s.
#[derive(Debug, Clone)]
pub struct StubLoader {
    pub dimension: usize,
}

impl ModelLoader for StubLoader {
    fn load(&self, assets: &ModelAssets) -> Result<Arc<dyn EmbeddingModel>, SemanticError> {
        let model = StubEmbedder::new(assets.model_name.clone(), self.dimension)?;
        Ok(Arc::new(model))
    }
}

/// Picks the loader matching `cfg.backend`.
pub fn loader_for(cfg: &ModelConfig) -> Arc<dyn ModelLoader> {
    match cfg.backend {
        EmbeddingBackend::Onnx => Arc::new(OnnxLoader {
            max_sequence_length: cfg.max_sequence_length,
        }),
        EmbeddingBackend::Stub => Arc::new(StubLoader {
            dimension: cfg.stub_dimension,
        }),
    }
}
