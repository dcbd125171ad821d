use async_trait::async_trait;

use crate::domain::{Document, DocumentMetadata, DomainError, SearchQuery, SearchResult};

/// Persistent, append-only archive of documents searchable by semantic similarity.
///
/// A store starts uninitialized. `load` (or the first `add_texts`/`retrieve`)
/// brings it into memory; `save` makes in-memory additions durable.
#[async_trait]
pub trait RagStore: Send + Sync {
    /// Reads the persisted index, or starts empty when none exists.
    ///
    /// Discards unsaved additions when called on an already loaded store.
    async fn load(&self) -> Result<(), DomainError>;

    /// Appends `texts` with their metadata and returns how many were added.
    ///
    /// `metadatas` defaults to empty metadata per text. Validation happens
    /// before any mutation: mismatched lengths or an empty text leave the
    /// store untouched.
    async fn add_texts(
        &self,
        texts: &[String],
        metadatas: Option<Vec<DocumentMetadata>>,
    ) -> Result<usize, DomainError>;

    /// Atomically replaces the persisted index. A no-op when never loaded.
    async fn save(&self) -> Result<(), DomainError>;

    /// Up to `k` documents closest to `query`, closest first.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>, DomainError>;

    /// Scored retrieval with optional score and type filters.
    async fn retrieve_scored(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, DomainError>;

    /// Documents currently in memory; 0 before the first load.
    async fn document_count(&self) -> usize;

    async fn is_loaded(&self) -> bool;
}
