use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by embedding models and the model lifecycle.
#[derive(Debug, Error)]
pub enum SemanticError {
    /// One or more required model artifacts are absent. Deployment error, never retried.
    #[error("model files missing in {}: {}", .dir.display(), .missing.join(", "))]
    ModelFilesMissing { dir: PathBuf, missing: Vec<String> },
    /// Instantiation did not finish within the configured load timeout.
    #[error("model load timed out after {}ms", .0.as_millis())]
    ModelLoadTimeout(Duration),
    /// Instantiation (or the post-load self-test) failed.
    #[error("model load failed: {0}")]
    ModelLoadFailure(String),
    /// An embedding was requested before any model finished loading.
    #[error("embedding model is not loaded")]
    ModelNotLoaded,
    /// Tokenizer, ONNX Runtime, or pooling failure during a single embed call.
    #[error("embedding failure: {0}")]
    Embedding(String),
    /// Configuration is inconsistent (e.g. zero stub dimension).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Low-level IO failures while touching the filesystem.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl SemanticError {
    /// Whether the lifecycle should spend another attempt on this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SemanticError::ModelLoadTimeout(_) | SemanticError::ModelLoadFailure(_)
        )
    }
}

impl Clone for SemanticError {
    fn clone(&self) -> Self {
        match self {
            SemanticError::ModelFilesMissing { dir, missing } => SemanticError::ModelFilesMissing {
                dir: dir.clone(),
                missing: missing.clone(),
            },
            SemanticError::ModelLoadTimeout(d) => SemanticError::ModelLoadTimeout(*d),
            SemanticError::ModelLoadFailure(s) => SemanticError::ModelLoadFailure(s.clone()),
            SemanticError::ModelNotLoaded => SemanticError::ModelNotLoaded,
            SemanticError::Embedding(s) => SemanticError::Embedding(s.clone()),
            SemanticError::InvalidConfig(s) => SemanticError::InvalidConfig(s.clone()),
            SemanticError::Io(err) => SemanticError::Io(io::Error::new(err.kind(), err.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_missing_lists_every_file() {
        let err = SemanticError::ModelFilesMissing {
            dir: PathBuf::from("/models/minilm"),
            missing: vec!["config.json".into(), "tokenizer.json".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("/models/minilm"));
        assert!(msg.contains("config.json, tokenizer.json"));
    }

    #[test]
    fn timeout_reports_millis() {
        let err = SemanticError::ModelLoadTimeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "model load timed out after 30000ms");
    }

    #[test]
    fn only_load_errors_are_retryable() {
        assert!(SemanticError::ModelLoadTimeout(Duration::from_secs(1)).is_retryable());
        assert!(SemanticError::ModelLoadFailure("boom".into()).is_retryable());

        assert!(!SemanticError::ModelFilesMissing {
            dir: PathBuf::from("x"),
            missing: vec![],
        }
        .is_retryable());
        assert!(!SemanticError::ModelNotLoaded.is_retryable());
        assert!(!SemanticError::Embedding("bad".into()).is_retryable());
        assert!(!SemanticError::InvalidConfig("bad".into()).is_retryable());
    }

    #[test]
    fn error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: SemanticError = io_err.into();
        assert!(err.to_string().contains("io error"));
    }

    #[test]
    fn clone_preserves_message() {
        let variants = vec![
            SemanticError::ModelFilesMissing {
                dir: PathBuf::from("d"),
                missing: vec!["a".into()],
            },
            SemanticError::ModelLoadTimeout(Duration::from_millis(5)),
            SemanticError::ModelLoadFailure("b".into()),
            SemanticError::ModelNotLoaded,
            SemanticError::Embedding("c".into()),
            SemanticError::InvalidConfig("d".into()),
            SemanticError::Io(io::Error::other("e")),
        ];

        for err in variants {
            assert_eq!(err.to_string(), err.clone().to_string());
        }
    }
}
