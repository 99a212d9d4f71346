use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::SemanticError;
use crate::retry::RetryConfig;

/// Which embedding implementation the loader instantiates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// ONNX Runtime session + HuggingFace tokenizer.
    #[default]
    Onnx,
    /// Deterministic hash-derived vectors. Development and tests only.
    Stub,
}

/// Describes where a model lives on disk and how to run it.
///
/// The model directory is `<models_root>/<model_name>/`; every entry of
/// [`required_files`](Self::required_files) must exist there before a load
/// attempt is made, regardless of backend.
///
/// # Example
/// ```
/// use semantic::{EmbeddingBackend, ModelConfig};
///
/// let cfg = ModelConfig {
///     backend: EmbeddingBackend::Stub,
///     stub_dimension: 8,
///     required_files: Vec::new(),
///     ..Default::default()
/// };
/// assert!(cfg.validate().is_ok());
/// assert!(cfg.model_dir().ends_with("Xenova/all-MiniLM-L6-v2"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    pub backend: EmbeddingBackend,
    /// Model identifier, also the sub-directory under [`models_root`](Self::models_root).
    pub model_name: String,
    /// Local artifact store. Remote downloads are never attempted.
    pub models_root: PathBuf,
    /// Paths relative to the model directory that must exist before loading.
    pub required_files: Vec<String>,
    /// ONNX graph, relative to the model directory.
    pub onnx_file: String,
    /// `tokenizer.json`, relative to the model directory.
    pub tokenizer_file: String,
    /// Inputs longer than this many tokens are truncated.
    pub max_sequence_length: usize,
    /// Output dimension of the stub backend.
    pub stub_dimension: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::Onnx,
            model_name: "Xenova/all-MiniLM-L6-v2".into(),
            models_root: PathBuf::from("./models"),
            required_files: default_required_files(),
            onnx_file: "onnx/model.onnx".into(),
            tokenizer_file: "tokenizer.json".into(),
            max_sequence_length: 256,
            stub_dimension: 384,
        }
    }
}

fn default_required_files() -> Vec<String> {
    [
        "config.json",
        "tokenizer.json",
        "tokenizer_config.json",
        "special_tokens_map.json",
        "onnx/model.onnx",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl ModelConfig {
    /// Directory holding this model's artifacts.
    pub fn model_dir(&self) -> PathBuf {
        self.models_root.join(&self.model_name)
    }

    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.model_name.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        if self.max_sequence_length == 0 {
            return Err(SemanticError::InvalidConfig(
                "max_sequence_length must be greater than zero".into(),
            ));
        }
        if self.backend == EmbeddingBackend::Stub && self.stub_dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "stub_dimension must be greater than zero".into(),
            ));
        }
        if self.backend == EmbeddingBackend::Onnx
            && (self.onnx_file.is_empty() || self.tokenizer_file.is_empty())
        {
            return Err(SemanticError::InvalidConfig(
                "onnx backend needs onnx_file and tokenizer_file".into(),
            ));
        }
        Ok(())
    }
}

/// Timing and retry policy of the model lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Wall-clock budget for a single instantiation attempt.
    #[serde(with = "crate::serde_millis")]
    pub load_timeout: Duration,
    pub retry: RetryConfig,
    /// Text embedded once after every successful instantiation.
    pub self_test_text: String,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            load_timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            self_test_text: "test text".into(),
        }
    }
}

impl LifecycleConfig {
    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.load_timeout.is_zero() {
            return Err(SemanticError::InvalidConfig(
                "load_timeout must be greater than zero".into(),
            ));
        }
        if self.retry.base_delay > self.retry.max_delay {
            return Err(SemanticError::InvalidConfig(format!(
                "retry.base_delay ({:?}) exceeds retry.max_delay ({:?})",
                self.retry.base_delay, self.retry.max_delay
            )));
        }
        if self.self_test_text.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "self_test_text must not be empty".into(),
            ));
        }
        Ok(())
    }
}
