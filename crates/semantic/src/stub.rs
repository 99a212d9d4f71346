use fxhash::hash64;

use crate::model::EmbeddingModel;
use crate::normalize::l2_normalize_in_place;
use crate::SemanticError;

/// Deterministic hash-derived embedder for development and tests.
///
/// Sinusoids seeded from an `fxhash` of the input give reproducible unit
/// vectors at negligible CPU cost. Identical text always maps to the same
/// vector; the geometry carries no meaning beyond that.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    name: String,
    dimension: usize,
}

impl StubEmbedder {
    pub fn new(name: impl Into<String>, dimension: usize) -> Result<Self, SemanticError> {
        if dimension == 0 {
            return Err(SemanticError::InvalidConfig(
                "stub dimension must be greater than zero".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            dimension,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl EmbeddingModel for StubEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, SemanticError> {
        let h = hash64(text.as_bytes());
        let mut v: Vec<f32> = (0..self.dimension)
            .map(|idx| {
                let salt = h.rotate_left((idx % 64) as u32) ^ (idx as u64);
                ((salt % 100_003) as f32 * 0.001).sin()
            })
            .collect();
        l2_normalize_in_place(&mut v);
        Ok(v)
    }
}
