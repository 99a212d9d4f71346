//! semsearch server - HTTP REST API for semantic document search
//!
//! Exposes the search stack (model lifecycle, document store, ranking) over
//! axum. The model warms up in the background at startup; until it is ready,
//! searches that cannot load it answer `503 SEARCH_UNAVAILABLE`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use server::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::load()?;
//!     server::start_server(config).await?;
//!     Ok(())
//! }
//! ```
//!
//! # API Endpoints
//!
//! - `GET /` - API information
//! - `GET /health` - Liveness probe
//! - `GET /ready` - Readiness probe (503 until the model is loaded)
//! - `GET /metrics` - Prometheus metrics
//! - `GET /api/status` - `{status, model, timestamp}`
//! - `POST /api/search` - `{query}` to `{results}`
//! - `POST /api/documents` - Embed and store a document
//! - `GET /api/documents` - List stored documents
//! - `GET /api/documents/{id}` - Fetch one document
//! - `DELETE /api/documents/{id}` - Delete one document
//!
//! Errors are JSON: `{"error": {"code": "...", "message": "..."}}`.

pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::{build_router, spawn_startup_tasks, start_server};
pub use state::ServerState;
