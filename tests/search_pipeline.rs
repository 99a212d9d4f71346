//! End-to-end checks of the search stack: lifecycle, store and ranking
//! wired together the way the binaries wire them.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use semantic::{ModelAssets, ModelLoader};
use semsearch::{
    BackendConfig, Document, DocumentIndex, DocumentStore, EmbeddingBackend, EmbeddingModel,
    LifecycleConfig, MatchError, ModelConfig, ModelLifecycle, RetryConfig, SearchConfig,
    SearchService, SearchStack, SemanticError, SemsearchConfig, StoreBackend,
};

struct FixedModel {
    table: HashMap<String, Vec<f32>>,
}

impl EmbeddingModel for FixedModel {
    fn name(&self) -> &str {
        "fixed"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        Ok(self.table.get(text).cloned().unwrap_or_else(|| vec![0.0, 1.0]))
    }
}

/// Counts loads and sleeps during each one.
struct CountingLoader {
    loads: AtomicUsize,
    latency: Duration,
    table: HashMap<String, Vec<f32>>,
}

impl ModelLoader for CountingLoader {
    fn load(&self, _assets: &ModelAssets) -> Result<Arc<dyn EmbeddingModel>, SemanticError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.latency);
        Ok(Arc::new(FixedModel {
            table: self.table.clone(),
        }))
    }
}

fn fast_lifecycle() -> LifecycleConfig {
    LifecycleConfig {
        load_timeout: Duration::from_secs(5),
        retry: RetryConfig::default().with_base_delay(Duration::from_millis(1)),
        ..Default::default()
    }
}

fn counting_service(latency: Duration) -> (SearchService, Arc<CountingLoader>, Arc<DocumentIndex>) {
    let loader = Arc::new(CountingLoader {
        loads: AtomicUsize::new(0),
        latency,
        table: HashMap::from([("q".to_string(), vec![1.0, 0.0])]),
    });
    let model = ModelConfig {
        required_files: Vec::new(),
        ..Default::default()
    };
    let lifecycle = Arc::new(ModelLifecycle::with_loader(
        model,
        fast_lifecycle(),
        loader.clone(),
    ));
    let store = Arc::new(DocumentIndex::open(&BackendConfig::in_memory()).unwrap());
    let service = SearchService::new(lifecycle, store.clone(), SearchConfig::default());
    (service, loader, store)
}

fn stub_config() -> SemsearchConfig {
    let mut config = SemsearchConfig::default();
    config.model.backend = EmbeddingBackend::Stub;
    config.model.stub_dimension = 24;
    config.model.required_files.clear();
    config.store.backend = StoreBackend::InMemory;
    config.lifecycle = fast_lifecycle();
    config
}

#[tokio::test(flavor = "multi_thread")]
async fn two_document_corpus_ranks_exact_match_first() {
    let (service, _loader, store) = counting_service(Duration::ZERO);
    store
        .upsert(Document::new("1", "A", "a", vec![1.0, 0.0]))
        .unwrap();
    store
        .upsert(Document::new("2", "B", "b", vec![0.0, 1.0]))
        .unwrap();

    let results = service.search("q").await.unwrap();
    let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["1", "2"]);
    assert!((results[0].similarity - 1.0).abs() < 1e-6);
    assert_eq!(results[1].similarity, 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_searches_share_one_load() {
    let (service, loader, store) = counting_service(Duration::from_millis(100));
    store
        .upsert(Document::new("1", "A", "a", vec![1.0, 0.0]))
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.search("q").await })
        })
        .collect();
    for task in tasks {
        let results = task.await.unwrap().unwrap();
        assert_eq!(results[0].id, "1");
    }

    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn status_is_served_during_a_slow_load() {
    let (service, _loader, _store) = counting_service(Duration::from_millis(300));

    let background = {
        let service = service.clone();
        tokio::spawn(async move { service.search("q").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = service.status();
    assert!(!status.is_ready);
    assert_eq!(status.state, semsearch::LifecycleState::Loading);

    background.await.unwrap().unwrap();
    assert!(service.status().is_ready);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_files_block_search_until_they_appear() {
    let root = tempfile::tempdir().unwrap();
    let mut config = stub_config();
    config.model.models_root = root.path().to_path_buf();
    config.model.required_files = vec!["config.json".into()];
    let stack = SearchStack::build(&config).unwrap();

    let err = stack.service().search("login").await.unwrap_err();
    assert!(matches!(
        err,
        MatchError::SearchUnavailable(SemanticError::ModelFilesMissing { .. })
    ));
    assert!(!stack.lifecycle().status().is_ready);

    let model_dir = config.model.model_dir();
    std::fs::create_dir_all(&model_dir).unwrap();
    std::fs::write(model_dir.join("config.json"), "{}").unwrap();

    assert!(stack.service().search("login").await.unwrap().is_empty());
    let status = stack.lifecycle().status();
    assert!(status.is_ready);
    assert!(status.last_error.is_none());
    assert_eq!(status.embedding_dim, Some(24));
}

#[tokio::test(flavor = "multi_thread")]
async fn redb_corpus_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = stub_config();
    config.store.backend = StoreBackend::Redb;
    config.store.path = dir.path().join("search.redb");

    let query = semsearch::sample_documents()[0].embedding_text();
    let before = {
        let stack = SearchStack::build(&config).unwrap();
        semsearch::seed_sample_documents(stack.service()).await.unwrap();
        stack.store().flush().unwrap();
        stack.service().search(&query).await.unwrap()
    };

    let stack = SearchStack::build(&config).unwrap();
    assert_eq!(stack.store().len().unwrap(), 2);
    let ids: Vec<_> = stack
        .store()
        .get_all()
        .unwrap()
        .into_iter()
        .map(|d| d.id)
        .collect();
    assert_eq!(ids, ["1", "2"]);

    let after = stack.service().search(&query).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(after[0].id, "1");
}

#[tokio::test(flavor = "multi_thread")]
async fn search_results_are_repeatable() {
    let stack = SearchStack::build(&stub_config()).unwrap();
    semsearch::seed_sample_documents(stack.service()).await.unwrap();

    let first = stack.service().search("password").await.unwrap();
    let second = stack.service().search("password").await.unwrap();
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0].similarity >= w[1].similarity));
}
