use std::sync::Arc;

use tracing::{debug, info};

use crate::application::RagStore;
use crate::domain::{interests_query, Document, DomainError};

/// Prior summaries and feedback relevant to a listener, ready for a prompt.
#[derive(Debug, Clone, Default)]
pub struct RetrievalContext {
    documents: Vec<Document>,
    text: String,
}

impl RetrievalContext {
    pub fn new(documents: Vec<Document>) -> Self {
        let text = documents
            .iter()
            .map(Document::content)
            .collect::<Vec<_>>()
            .join("\n");
        Self { documents, text }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Document contents, most relevant first, one per line.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

pub struct RetrieveContextUseCase {
    store: Arc<dyn RagStore>,
}

impl RetrieveContextUseCase {
    pub fn new(store: Arc<dyn RagStore>) -> Self {
        Self { store }
    }

    pub async fn execute(
        &self,
        interests: &[String],
        k: usize,
    ) -> Result<RetrievalContext, DomainError> {
        if interests.is_empty() {
            debug!("No interests given; skipping retrieval");
            return Ok(RetrievalContext::empty());
        }

        let query = interests_query(interests);
        let documents = self.store.retrieve(&query, k).await?;
        info!("Retrieved {} context documents for \"{}\"", documents.len(), query);

        Ok(RetrievalContext::new(documents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentMetadata;

    #[test]
    fn test_context_text_joins_contents() {
        let context = RetrievalContext::new(vec![
            Document::new("first", DocumentMetadata::new()),
            Document::new("second", DocumentMetadata::new()),
        ]);

        assert_eq!(context.text(), "first\nsecond");
        assert_eq!(context.documents().len(), 2);
        assert!(RetrievalContext::empty().is_empty());
    }
}
