use std::{env, path::PathBuf};

use semantic::{EmbeddingBackend, LifecycleConfig, ModelConfig, ModelLifecycle};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let text = env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello world from semsearch.".into());

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let models_root = manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .map(|root| root.join("models"))
        .unwrap_or_else(|| PathBuf::from("./models"));

    let mut cfg = ModelConfig {
        models_root,
        ..ModelConfig::default()
    };
    if semantic::verify_model_assets(&cfg).is_err() {
        println!("ONNX assets not found under {}, using the stub backend", cfg.model_dir().display());
        cfg.backend = EmbeddingBackend::Stub;
        cfg.required_files.clear();
    }

    let lifecycle = ModelLifecycle::new(cfg, LifecycleConfig::default());
    let model = lifecycle.ensure_ready().await?;
    let vector = tokio::task::spawn_blocking(move || model.embed(&text)).await??;

    let status = lifecycle.status();
    println!("model: {}", status.model_name);
    println!("dim: {}", vector.len());
    println!("load time: {:?}ms", status.initialization_time_ms);
    println!("first values: {:?}", &vector[..vector.len().min(8)]);

    Ok(())
}
