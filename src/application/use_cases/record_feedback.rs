use std::sync::Arc;

use tracing::info;

use crate::application::RagStore;
use crate::domain::{current_timestamp, DocumentMetadata, DomainError, Feedback};

pub struct RecordFeedbackUseCase {
    store: Arc<dyn RagStore>,
}

impl RecordFeedbackUseCase {
    pub fn new(store: Arc<dyn RagStore>) -> Self {
        Self { store }
    }

    /// Stores likes and dislikes as feedback documents tied to the brief.
    ///
    /// Returns how many documents were added. Feedback with neither likes
    /// nor dislikes is accepted without touching the store.
    pub async fn execute(&self, feedback: &Feedback) -> Result<usize, DomainError> {
        if feedback.summary_id.trim().is_empty() {
            return Err(DomainError::invalid_input("summary_id must not be empty"));
        }
        if let Some(rating) = feedback.rating.filter(|r| !(1..=5).contains(r)) {
            return Err(DomainError::invalid_input(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let texts = feedback.to_texts();
        if texts.is_empty() {
            info!(
                "Feedback for {} carries no text; nothing to store",
                feedback.summary_id
            );
            return Ok(0);
        }

        let mut metadata =
            DocumentMetadata::feedback(&feedback.summary_id).with_timestamp(current_timestamp());
        if let Some(rating) = feedback.rating {
            metadata = metadata.with_extra("rating", i64::from(rating));
        }
        let added = self
            .store
            .add_texts(&texts, Some(vec![metadata; texts.len()]))
            .await?;
        self.store.save().await?;

        info!(
            "Recorded {} feedback documents for {}",
            added, feedback.summary_id
        );
        Ok(added)
    }
}
