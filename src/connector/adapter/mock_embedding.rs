use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::application::EmbeddingService;
use crate::domain::{DomainError, EmbeddingConfig};

pub const MOCK_MODEL_NAME: &str = "mock-embedding";
const MOCK_DIMENSIONS: usize = 384;
const MOCK_MAX_SEQ_LENGTH: usize = 512;

/// Deterministic offline embeddings: each text seeds its own random unit vector.
///
/// Equal texts always embed equally, across processes and toolchains, so a
/// store saved with mock vectors stays queryable. Unrelated texts carry no
/// semantic signal.
pub struct MockEmbedding {
    config: EmbeddingConfig,
}

impl MockEmbedding {
    pub fn new() -> Self {
        Self::with_dimensions(MOCK_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self::with_model(MOCK_MODEL_NAME, dimensions)
    }

    /// A mock posing as `model_name`, for exercising model checks on reload.
    pub fn with_model(model_name: impl Into<String>, dimensions: usize) -> Self {
        Self {
            config: EmbeddingConfig::new(model_name.into(), dimensions, MOCK_MAX_SEQ_LENGTH),
        }
    }

    fn unit_vector(&self, text: &str) -> Vec<f32> {
        let mut rng = StdRng::seed_from_u64(seed_for(text));
        let mut vector: Vec<f32> = (0..self.config.dimensions())
            .map(|_| rng.gen_range(-1.0..1.0))
            .collect();

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

impl Default for MockEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_for(text: &str) -> u64 {
    let digest = Sha256::digest(text.as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(seed)
}

#[async_trait]
impl EmbeddingService for MockEmbedding {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        debug!("Mock-embedding {} texts", texts.len());
        Ok(texts.iter().map(|text| self.unit_vector(text)).collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        Ok(self.unit_vector(query))
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
