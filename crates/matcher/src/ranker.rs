//! Pure similarity scoring and top-k selection.

use index::Document;
use rayon::prelude::*;
use thiserror::Error;

use crate::types::{MatchError, SearchResult};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("vector dimensions differ: expected {expected}, found {found}")]
pub struct DimensionMismatch {
    pub expected: usize,
    pub found: usize,
}

/// Cosine similarity `dot / (|a| * |b|)`.
///
/// Returns `0.0` when either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, DimensionMismatch> {
    if a.len() != b.len() {
        return Err(DimensionMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (&x, &y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(0.0);
    }
    Ok(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Scores every document against `query` and keeps the best `k`.
///
/// Ordering is by similarity descending; equal scores keep their input order.
pub fn rank(query: &[f32], documents: &[Document], k: usize) -> Result<Vec<SearchResult>, MatchError> {
    rank_with_threshold(query, documents, k, usize::MAX)
}

/// Like [`rank`], but scores on the rayon pool once `documents.len()`
/// reaches `parallel_threshold`. The output is identical either way.
pub fn rank_with_threshold(
    query: &[f32],
    documents: &[Document],
    k: usize,
    parallel_threshold: usize,
) -> Result<Vec<SearchResult>, MatchError> {
    // Checked up front so the reported document is the first bad one in order.
    if let Some(doc) = documents.iter().find(|d| d.embedding.len() != query.len()) {
        return Err(MatchError::DimensionMismatch {
            doc_id: doc.id.clone(),
            expected: query.len(),
            found: doc.embedding.len(),
        });
    }

    let score = |doc: &Document| -> f32 {
        let s = cosine_similarity(query, &doc.embedding).unwrap_or(0.0);
        // -0.0 would sort below +0.0 under total_cmp
        if s == 0.0 {
            0.0
        } else {
            s
        }
    };

    let scores: Vec<f32> = if documents.len() >= parallel_threshold {
        documents.par_iter().map(score).collect()
    } else {
        documents.iter().map(score).collect()
    };

    let mut order: Vec<usize> = (0..documents.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order.truncate(k);

    Ok(order
        .into_iter()
        .map(|i| {
            let doc = &documents[i];
            SearchResult {
                id: doc.id.clone(),
                title: doc.title.clone(),
                content: doc.content.clone(),
                similarity: scores[i],
            }
        })
        .collect())
}
