use async_trait::async_trait;

use crate::domain::{DomainError, EmbeddingConfig};

/// Generates vector embeddings for stored documents and retrieval queries.
///
/// Implementations must be deterministic for a fixed model and input, and must
/// report failures as errors rather than returning empty vectors.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// One vector per text, in input order.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError>;

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError>;

    fn config(&self) -> &EmbeddingConfig;
}
