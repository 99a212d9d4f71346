//! Model lifecycle: load, retry, timeout, readiness.
//!
//! ```text
//! Unloaded ──► Loading ──► Ready
//!                 │  ▲
//!                 ▼  │ (next ensure_ready)
//!               Failed
//! ```
//!
//! One [`ModelLifecycle`] owns one model. A load sequence runs on a task the
//! lifecycle spawns, and concurrent callers of
//! [`ensure_ready`](ModelLifecycle::ensure_ready) subscribe to that task's
//! outcome, so at most one sequence is in flight and a caller that gives up
//! early leaves it running to completion.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::assets::verify_model_assets;
use crate::config::{LifecycleConfig, ModelConfig};
use crate::model::{loader_for, EmbeddingModel, ModelLoader};
use crate::retry::execute_with_retry_async;
use crate::status::{LifecycleState, ModelStatus};
use crate::SemanticError;

type SharedModel = Arc<dyn EmbeddingModel>;
type LoadOutcome = Result<SharedModel, SemanticError>;
type AttemptTask = JoinHandle<Result<(SharedModel, usize), SemanticError>>;

pub struct ModelLifecycle {
    shared: Arc<Shared>,
    /// Outcome channel of the most recent load sequence. `None` in the
    /// channel means the sequence is still running.
    in_flight: Mutex<Option<watch::Receiver<Option<LoadOutcome>>>>,
}

/// State the spawned load sequence needs; outlives any single caller.
struct Shared {
    model_config: ModelConfig,
    config: LifecycleConfig,
    loader: Arc<dyn ModelLoader>,
    status: RwLock<ModelStatus>,
    model: RwLock<Option<SharedModel>>,
    /// Blocking load left behind by an attempt that timed out.
    stray: Mutex<Option<AttemptTask>>,
}

struct Loaded {
    model: SharedModel,
    dim: usize,
    elapsed_ms: u64,
}

impl std::fmt::Debug for ModelLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelLifecycle")
            .field("model", &self.shared.model_config.model_name)
            .field("status", &*read(&self.shared.status))
            .finish_non_exhaustive()
    }
}

impl ModelLifecycle {
    /// Lifecycle using the loader that matches `model_config.backend`.
    pub fn new(model_config: ModelConfig, config: LifecycleConfig) -> Self {
        let loader = loader_for(&model_config);
        Self::with_loader(model_config, config, loader)
    }

    pub fn with_loader(
        model_config: ModelConfig,
        config: LifecycleConfig,
        loader: Arc<dyn ModelLoader>,
    ) -> Self {
        let status = ModelStatus::new(model_config.model_name.clone());
        Self {
            shared: Arc::new(Shared {
                model_config,
                config,
                loader,
                status: RwLock::new(status),
                model: RwLock::new(None),
                stray: Mutex::new(None),
            }),
            in_flight: Mutex::new(None),
        }
    }

    pub fn model_name(&self) -> &str {
        self.shared.model_name()
    }

    /// Consistent snapshot; never waits on an in-flight load.
    pub fn status(&self) -> ModelStatus {
        read(&self.shared.status).clone()
    }

    /// The loaded model, if the lifecycle is ready.
    pub fn current_model(&self) -> Option<SharedModel> {
        read(&self.shared.model).clone()
    }

    /// Embeds with the loaded model without triggering a load.
    ///
    /// Blocking; fails with [`SemanticError::ModelNotLoaded`] when nothing is loaded.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let model = self.current_model().ok_or(SemanticError::ModelNotLoaded)?;
        model.embed(text)
    }

    /// Returns the loaded model, running a load sequence first if needed.
    ///
    /// The sequence runs on its own task, so dropping the returned future
    /// does not abandon it. A caller that arrives while a sequence is running
    /// waits for it and gets that sequence's outcome rather than starting
    /// another one.
    pub async fn ensure_ready(&self) -> Result<SharedModel, SemanticError> {
        if let Some(model) = self.current_model() {
            return Ok(model);
        }

        let mut outcome = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(model) = self.current_model() {
                return Ok(model);
            }
            let running = in_flight
                .as_ref()
                .filter(|rx| rx.borrow().is_none() && rx.has_changed().is_ok())
                .cloned();
            match running {
                Some(rx) => {
                    tracing::debug!(model = %self.model_name(), "joining the running load sequence");
                    rx
                }
                None => {
                    let rx = self.start_sequence();
                    *in_flight = Some(rx.clone());
                    rx
                }
            }
        };

        let settled = match outcome.wait_for(Option::is_some).await {
            Ok(done) => (*done).clone(),
            Err(_) => None,
        };
        settled.unwrap_or_else(|| {
            Err(SemanticError::ModelLoadFailure(
                "load sequence ended without an outcome".into(),
            ))
        })
    }

    /// Starts an eager load in the background. Failures only update status.
    pub fn spawn_warmup(self: &Arc<Self>) -> JoinHandle<()> {
        let lifecycle = Arc::clone(self);
        tokio::spawn(async move {
            match lifecycle.ensure_ready().await {
                Ok(_) => tracing::info!(model = %lifecycle.model_name(), "model warm-up finished"),
                Err(err) => tracing::error!(
                    model = %lifecycle.model_name(),
                    error = %err,
                    "model warm-up failed; requests will retry the load"
                ),
            }
        })
    }

    /// Spawns a load sequence owned by the lifecycle. Called with the
    /// `in_flight` guard held.
    fn start_sequence(&self) -> watch::Receiver<Option<LoadOutcome>> {
        let (tx, rx) = watch::channel(None);
        self.shared.update_status(|status| {
            status.state = LifecycleState::Loading;
            status.retry_count = 0;
        });

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let outcome = shared.run_sequence().await;
            tx.send_replace(Some(outcome));
        });
        rx
    }
}

impl Shared {
    fn model_name(&self) -> &str {
        &self.model_config.model_name
    }

    async fn run_sequence(&self) -> LoadOutcome {
        let started = Instant::now();
        let result = execute_with_retry_async(
            &self.config.retry,
            SemanticError::is_retryable,
            |attempt| self.attempt(attempt),
        )
        .await;
        let sequence_ms = started.elapsed().as_millis() as u64;

        match result.result {
            Ok(Loaded {
                model,
                dim,
                elapsed_ms,
            }) => {
                *write(&self.model) = Some(Arc::clone(&model));
                self.update_status(|status| {
                    status.is_initialized = true;
                    status.last_error = None;
                    status.retry_count = 0;
                    status.initialization_time_ms = elapsed_ms;
                    status.embedding_dim = Some(dim);
                    status.state = LifecycleState::Ready;
                });
                tracing::info!(
                    model = %self.model_name(),
                    attempts = result.attempts,
                    elapsed_ms,
                    sequence_ms,
                    embedding_dim = dim,
                    "embedding model ready"
                );
                Ok(model)
            }
            Err(err) => {
                self.update_status(|status| {
                    status.is_initialized = false;
                    status.last_error = Some(err.to_string());
                    status.state = LifecycleState::Failed;
                });
                tracing::error!(
                    model = %self.model_name(),
                    attempts = result.attempts,
                    sequence_ms,
                    error = %err,
                    "embedding model failed to load"
                );
                Err(err)
            }
        }
    }

    async fn attempt(&self, attempt: u32) -> Result<Loaded, SemanticError> {
        let max_attempts = self.config.retry.max_attempts();
        self.update_status(|status| status.retry_count = attempt);
        tracing::info!(
            model = %self.model_name(),
            attempt = attempt + 1,
            max_attempts,
            "loading embedding model"
        );

        let started = Instant::now();
        let outcome = self.instantiate().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok((model, dim)) => Ok(Loaded {
                model,
                dim,
                elapsed_ms,
            }),
            Err(err) => {
                self.update_status(|status| status.last_error = Some(err.to_string()));
                tracing::warn!(
                    model = %self.model_name(),
                    attempt = attempt + 1,
                    max_attempts,
                    elapsed_ms,
                    retryable = err.is_retryable(),
                    error = %err,
                    "model load attempt failed"
                );
                Err(err)
            }
        }
    }

    /// One attempt: verify files, load on the blocking pool, self-test.
    async fn instantiate(&self) -> Result<(SharedModel, usize), SemanticError> {
        self.settle_stray_attempt().await;

        let assets = verify_model_assets(&self.model_config)?;
        let loader = Arc::clone(&self.loader);
        let self_test = self.config.self_test_text.clone();

        let mut task = tokio::task::spawn_blocking(move || {
            let model = loader.load(&assets)?;
            let vector = model
                .embed(&self_test)
                .map_err(|e| SemanticError::ModelLoadFailure(format!("self-test failed: {e}")))?;
            if vector.is_empty() {
                return Err(SemanticError::ModelLoadFailure(
                    "self-test produced an empty vector".into(),
                ));
            }
            Ok((model, vector.len()))
        });

        match timeout(self.config.load_timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(SemanticError::ModelLoadFailure(format!(
                "load task aborted: {join}"
            ))),
            Err(_) => {
                // blocking work cannot be cancelled; keep it so the next attempt can wait on it
                *self.stray.lock().await = Some(task);
                Err(SemanticError::ModelLoadTimeout(self.config.load_timeout))
            }
        }
    }

    /// Gives a timed-out attempt up to one more `load_timeout` to finish
    /// before another load starts next to it.
    async fn settle_stray_attempt(&self) {
        let Some(mut stray) = self.stray.lock().await.take() else {
            return;
        };
        if stray.is_finished() {
            return;
        }

        tracing::info!(
            model = %self.model_name(),
            "waiting for the timed-out load attempt to finish"
        );
        if timeout(self.config.load_timeout, &mut stray).await.is_err() {
            tracing::warn!(
                model = %self.model_name(),
                "timed-out load attempt is still running; starting the next attempt alongside it"
            );
        }
    }

    fn update_status(&self, apply: impl FnOnce(&mut ModelStatus)) {
        let mut status = write(&self.status);
        apply(&mut status);
        status.refresh();
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
