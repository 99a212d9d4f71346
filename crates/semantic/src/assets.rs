use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{ModelConfig, SemanticError};

/// Resolved on-disk locations of a verified model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAssets {
    pub model_name: String,
    pub dir: PathBuf,
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

/// Checks that every required artifact exists under the model directory.
///
/// Nothing is ever fetched remotely: a missing file is a deployment error and
/// is reported with the complete list of absent paths.
pub fn verify_model_assets(cfg: &ModelConfig) -> Result<ModelAssets, SemanticError> {
    let dir = cfg.model_dir();

    let missing: Vec<String> = cfg
        .required_files
        .iter()
        .filter(|file| !dir.join(file.as_str()).is_file())
        .cloned()
        .collect();

    if !missing.is_empty() {
        tracing::error!(
            model = %cfg.model_name,
            dir = %dir.display(),
            missing = ?missing,
            present = ?list_dir(&dir),
            "required model files are missing"
        );
        return Err(SemanticError::ModelFilesMissing { dir, missing });
    }

    tracing::debug!(model = %cfg.model_name, dir = %dir.display(), "model files verified");

    Ok(ModelAssets {
        model_name: cfg.model_name.clone(),
        model_path: dir.join(&cfg.onnx_file),
        tokenizer_path: dir.join(&cfg.tokenizer_file),
        dir,
    })
}

/// Directory contents for diagnostics. Unreadable directories yield an empty list.
fn list_dir(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn config_for(root: &Path) -> ModelConfig {
        ModelConfig {
            models_root: root.to_path_buf(),
            model_name: "acme/mini".into(),
            ..Default::default()
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"{}").unwrap();
    }

    #[test]
    fn reports_every_missing_file() {
        let root = tempdir().unwrap();
        let cfg = config_for(root.path());
        touch(&cfg.model_dir().join("config.json"));

        let err = verify_model_assets(&cfg).unwrap_err();
        match err {
            SemanticError::ModelFilesMissing { dir, missing } => {
                assert_eq!(dir, cfg.model_dir());
                assert_eq!(
                    missing,
                    vec![
                        "tokenizer.json",
                        "tokenizer_config.json",
                        "special_tokens_map.json",
                        "onnx/model.onnx"
                    ]
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_directory_reports_all_files() {
        let root = tempdir().unwrap();
        let cfg = config_for(root.path());
        let err = verify_model_assets(&cfg).unwrap_err();
        assert!(matches!(
            err,
            SemanticError::ModelFilesMissing { ref missing, .. } if missing.len() == 5
        ));
    }

    #[test]
    fn resolves_paths_when_complete() {
        let root = tempdir().unwrap();
        let cfg = config_for(root.path());
        for file in &cfg.required_files {
            touch(&cfg.model_dir().join(file));
        }

        let assets = verify_model_assets(&cfg).unwrap();
        assert_eq!(assets.model_name, "acme/mini");
        assert_eq!(assets.model_path, cfg.model_dir().join("onnx/model.onnx"));
        assert_eq!(assets.tokenizer_path, cfg.model_dir().join("tokenizer.json"));
    }

    #[test]
    fn directory_is_not_a_file() {
        let root = tempdir().unwrap();
        let cfg = ModelConfig {
            required_files: vec!["onnx".into()],
            ..config_for(root.path())
        };
        fs::create_dir_all(cfg.model_dir().join("onnx")).unwrap();
        assert!(verify_model_assets(&cfg).is_err());
    }

    #[test]
    fn no_required_files_always_passes() {
        let root = tempdir().unwrap();
        let cfg = ModelConfig {
            required_files: Vec::new(),
            ..config_for(root.path())
        };
        assert!(verify_model_assets(&cfg).is_ok());
    }
}
