use std::path::PathBuf;

use async_trait::async_trait;

use crate::domain::{Brief, DomainError};

/// Keeps a readable copy of every generated brief outside the vector store.
#[async_trait]
pub trait BriefArchive: Send + Sync {
    /// Persists the brief text and returns where it landed.
    async fn archive(&self, brief: &Brief) -> Result<PathBuf, DomainError>;
}
