use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::telemetry::{install_recorder, PrometheusSearchMetrics};
use matcher::SearchService;
use metrics_exporter_prometheus::PrometheusHandle;
use semsearch::{SearchStack, SemsearchConfig};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct ServerState {
    /// Server configuration
    pub config: Arc<ServerConfig>,

    /// Lifecycle, store and search service
    pub stack: SearchStack,

    /// Renders `/metrics`; `None` when metrics are disabled
    pub prometheus: Option<PrometheusHandle>,

    pub started_at: Instant,
}

impl ServerState {
    /// Create server state from the YAML file named in `config`, with
    /// `SEMSEARCH_*` environment overrides applied.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let mut pipeline = match &config.pipeline_config {
            Some(path) => SemsearchConfig::from_file(path).map_err(|e| {
                ServerError::Config(format!("{}: {e}", path.display()))
            })?,
            None => SemsearchConfig::default(),
        };
        pipeline.apply_env();
        Self::with_pipeline(config, &pipeline)
    }

    /// Create server state from an already-loaded pipeline configuration.
    pub fn with_pipeline(config: ServerConfig, pipeline: &SemsearchConfig) -> ServerResult<Self> {
        let stack =
            SearchStack::build(pipeline).map_err(|e| ServerError::Config(e.to_string()))?;
        Self::with_stack(config, stack)
    }

    /// Create server state around an already-built stack.
    pub fn with_stack(config: ServerConfig, mut stack: SearchStack) -> ServerResult<Self> {

        let prometheus = if config.metrics_enabled {
            let handle = install_recorder()?;
            stack = stack.with_metrics(Arc::new(PrometheusSearchMetrics));
            Some(handle)
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            stack,
            prometheus,
            started_at: Instant::now(),
        })
    }

    pub fn service(&self) -> &SearchService {
        self.stack.service()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
