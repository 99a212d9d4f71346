// Metrics hooks for the search service.
//
// A `SearchService` reports per-request latency, hit counts and outcome to an
// optional `SearchMetrics` observer attached with `SearchService::with_metrics`.
// This keeps instrumentation decoupled from any specific metrics backend.
use std::time::Duration;

use crate::types::MatchError;

/// How a search or index request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Ok,
    /// Blank query answered with no results, model untouched.
    EmptyQuery,
    /// The model could not be made ready.
    Unavailable,
    Error,
}

impl SearchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchOutcome::Ok => "ok",
            SearchOutcome::EmptyQuery => "empty_query",
            SearchOutcome::Unavailable => "unavailable",
            SearchOutcome::Error => "error",
        }
    }

    pub(crate) fn from_error(err: &MatchError) -> Self {
        match err {
            MatchError::SearchUnavailable(_) => SearchOutcome::Unavailable,
            _ => SearchOutcome::Error,
        }
    }
}

/// Metrics observer for search operations.
pub trait SearchMetrics: Send + Sync {
    /// `latency` covers readiness, embedding, the store read and ranking;
    /// `hit_count` is the number of results returned (0 on failure).
    fn record_search(&self, latency: Duration, hit_count: usize, outcome: SearchOutcome);

    /// Record one document write (embed + upsert).
    fn record_index(&self, _latency: Duration, _outcome: SearchOutcome) {}
}
