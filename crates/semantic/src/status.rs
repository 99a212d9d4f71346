use serde::{Deserialize, Serialize};

/// Where the lifecycle currently stands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    #[default]
    Unloaded,
    Loading,
    Ready,
    Failed,
}

/// Point-in-time view of the model lifecycle, as reported by `/api/status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub is_initialized: bool,
    pub model_name: String,
    pub last_error: Option<String>,
    /// Milliseconds the successful load attempt took; 0 until one succeeds.
    #[serde(rename = "initializationTime")]
    pub initialization_time_ms: u64,
    /// Failed attempts in the current (or last failed) sequence.
    pub retry_count: u32,
    pub embedding_dim: Option<usize>,
    pub state: LifecycleState,
    pub is_ready: bool,
}

impl ModelStatus {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            is_initialized: false,
            model_name: model_name.into(),
            last_error: None,
            initialization_time_ms: 0,
            retry_count: 0,
            embedding_dim: None,
            state: LifecycleState::Unloaded,
            is_ready: false,
        }
    }

    /// Recomputes `is_ready` after a field change.
    pub(crate) fn refresh(&mut self) {
        self.is_ready = self.is_initialized && self.last_error.is_none();
    }
}
