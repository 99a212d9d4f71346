//! YAML configuration file support for semsearch.
//!
//! One file describes the whole search stack: where the model lives and how
//! it is loaded, which document store backs the corpus, and how many results
//! a query returns.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//!
//! model:
//!   backend: onnx
//!   model_name: Xenova/all-MiniLM-L6-v2
//!   models_root: ./models
//!   max_sequence_length: 256
//!
//! lifecycle:
//!   load_timeout: 30000   # ms
//!   retry:
//!     max_retries: 2
//!     base_delay: 5000    # ms
//!     max_delay: 5000     # ms
//!   self_test_text: "test text"
//!
//! store:
//!   backend: redb
//!   path: ./data/search.redb
//!
//! search:
//!   top_k: 5
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use index::BackendConfig;
use matcher::SearchConfig;
use semantic::{LifecycleConfig, ModelConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Overrides `model.models_root`.
pub const ENV_MODELS_ROOT: &str = "SEMSEARCH_MODELS_ROOT";
/// Overrides `store.path`.
pub const ENV_DB_PATH: &str = "SEMSEARCH_DB_PATH";

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

impl From<semantic::SemanticError> for ConfigLoadError {
    fn from(err: semantic::SemanticError) -> Self {
        ConfigLoadError::Validation(err.to_string())
    }
}

/// Top-level YAML configuration for the search stack
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SemsearchConfig {
    /// Configuration format version
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    /// Model location and backend
    #[serde(default)]
    pub model: ModelConfig,

    /// Load timeout, retry policy and self-test
    #[serde(default)]
    pub lifecycle: LifecycleConfig,

    /// Document store
    #[serde(default)]
    pub store: StoreYamlConfig,

    /// Ranking
    #[serde(default)]
    pub search: SearchConfig,

    /// Fallback values for the `SEMSEARCH_*` environment variables.
    /// A variable set in the process environment wins over this map.
    #[serde(default)]
    pub env_overrides: HashMap<String, String>,
}

impl SemsearchConfig {
    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: SemsearchConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.model.validate()?;
        self.lifecycle.validate()?;
        self.store.validate()?;

        if self.search.top_k == 0 {
            return Err(ConfigLoadError::Validation(
                "search.top_k must be >= 1".into(),
            ));
        }
        Ok(())
    }

    /// Apply `SEMSEARCH_MODELS_ROOT` / `SEMSEARCH_DB_PATH` from the process
    /// environment, falling back to [`env_overrides`](Self::env_overrides).
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Same as [`apply_env`](Self::apply_env) with an explicit lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let resolve = |key: &str| lookup(key).or_else(|| self.env_overrides.get(key).cloned());

        let models_root = resolve(ENV_MODELS_ROOT);
        let db_path = resolve(ENV_DB_PATH);

        if let Some(root) = models_root {
            tracing::debug!(key = ENV_MODELS_ROOT, value = %root, "config override");
            self.model.models_root = PathBuf::from(root);
        }
        if let Some(path) = db_path {
            tracing::debug!(key = ENV_DB_PATH, value = %path, "config override");
            self.store.path = PathBuf::from(path);
        }
    }
}

impl Default for SemsearchConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            model: ModelConfig::default(),
            lifecycle: LifecycleConfig::default(),
            store: StoreYamlConfig::default(),
            search: SearchConfig::default(),
            env_overrides: HashMap::new(),
        }
    }
}

/// Which storage backend holds the documents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Redb,
    InMemory,
}

/// Store YAML configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreYamlConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Database file; ignored by `in_memory`.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl StoreYamlConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.backend == StoreBackend::Redb && self.path.as_os_str().is_empty() {
            return Err(ConfigLoadError::Validation(
                "store.path is required for the redb backend".into(),
            ));
        }
        Ok(())
    }

    /// Backend description understood by [`index::DocumentIndex::open`].
    pub fn backend_config(&self) -> BackendConfig {
        match self.backend {
            StoreBackend::Redb => BackendConfig::redb(self.path.to_string_lossy().into_owned()),
            StoreBackend::InMemory => BackendConfig::in_memory(),
        }
    }
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./data/search.redb")
}
