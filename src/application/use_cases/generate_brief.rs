use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use super::{RetrievalContext, RetrieveContextUseCase};
use crate::application::{BriefArchive, ChatClient, RagStore};
use crate::config::GenerationSettings;
use crate::domain::{Article, Brief, DomainError};

/// Inputs for one brief. Articles arrive already fetched.
#[derive(Debug, Clone, Default)]
pub struct BriefRequest {
    pub articles: Vec<Article>,
    pub interests: Vec<String>,
    /// Overrides the configured target length.
    pub target_words: Option<usize>,
}

/// Retrieves personalization context, asks the chat model for a brief, and
/// archives the result so later briefs can build on it.
pub struct GenerateBriefUseCase {
    store: Arc<dyn RagStore>,
    chat: Arc<dyn ChatClient>,
    archive: Option<Arc<dyn BriefArchive>>,
    settings: GenerationSettings,
}

impl GenerateBriefUseCase {
    pub fn new(
        store: Arc<dyn RagStore>,
        chat: Arc<dyn ChatClient>,
        settings: &GenerationSettings,
    ) -> Self {
        Self {
            store,
            chat,
            archive: None,
            settings: settings.clone(),
        }
    }

    /// Also writes every brief to `archive` before it enters the store.
    pub fn with_archive(mut self, archive: Arc<dyn BriefArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub async fn execute(&self, request: BriefRequest) -> Result<Brief, DomainError> {
        let start_time = Instant::now();
        let target_words = request.target_words.unwrap_or(self.settings.target_words);

        let context = match RetrieveContextUseCase::new(self.store.clone())
            .execute(&request.interests, self.settings.retrieval_k)
            .await
        {
            Ok(context) => context,
            Err(e) if e.is_transient() => {
                warn!("Retrieval failed ({}); generating without prior context", e);
                RetrievalContext::empty()
            }
            Err(e) => return Err(e),
        };

        let articles = &request.articles[..request.articles.len().min(self.settings.max_articles)];
        let system = system_prompt(&self.settings.app_name, target_words);
        let prompt = user_prompt(&request.interests, &context, articles, target_words);

        info!(
            "Generating brief with {} from {} articles and {} context documents",
            self.chat.model_name(),
            articles.len(),
            context.documents().len()
        );

        let text = self.chat.complete(&system, &prompt).await?.trim().to_string();
        if text.is_empty() {
            return Err(DomainError::generation("model returned an empty brief"));
        }

        let brief = Brief::new(Uuid::new_v4().simple().to_string(), text);

        if let Some(archive) = &self.archive {
            archive.archive(&brief).await?;
        }

        self.store
            .add_texts(&[brief.text().to_string()], Some(vec![brief.to_metadata()]))
            .await?;
        self.store.save().await?;

        info!(
            "Brief {} ready: {} words, {} sections in {:.2}s",
            brief.summary_id(),
            brief.word_count(),
            brief.sections().len(),
            start_time.elapsed().as_secs_f64()
        );

        Ok(brief)
    }
}

fn system_prompt(app_name: &str, target_words: usize) -> String {
    format!(
        "You host \"{app_name}\", a spoken morning news brief for busy listeners on their commute.\n\
         Aim for roughly {target_words} words in a neutral, upbeat tone.\n\
         \n\
         - Open with a short highlights summary.\n\
         - Group stories into sections, each starting on its own line as \"SECTION: <title>\".\n\
         - Cover the one to three most relevant stories per section.\n\
         - Use the listener interests and prior context to emphasize what they care about and avoid repeating earlier briefs.\n\
         - Credit sources briefly and only state facts present in the articles.\n\
         - Close with what to watch today.\n\
         \n\
         Write natural spoken prose: no markdown and no bullet characters."
    )
}

fn user_prompt(
    interests: &[String],
    context: &RetrievalContext,
    articles: &[Article],
    target_words: usize,
) -> String {
    let articles = articles
        .iter()
        .map(Article::prompt_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "LISTENER INTERESTS:\n{}\n\n\
         RAG CONTEXT (prior summaries and feedback, most relevant first):\n{}\n\n\
         ARTICLES:\n{}\n\n\
         Write about {} words with 'SECTION: ' headers.",
        interests.join(", "),
        context.text(),
        articles,
        target_words
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Document, DocumentMetadata};

    #[test]
    fn test_user_prompt_carries_all_inputs() {
        let context = RetrievalContext::new(vec![Document::new(
            "USER_FEEDBACK_LIKES: more climate",
            DocumentMetadata::feedback("s0"),
        )]);
        let articles = vec![Article::new("Heatwave", "Records fall").with_source("AP")];

        let prompt = user_prompt(&["climate".to_string()], &context, &articles, 800);

        assert!(prompt.contains("LISTENER INTERESTS:\nclimate"));
        assert!(prompt.contains("USER_FEEDBACK_LIKES: more climate"));
        assert!(prompt.contains("- Heatwave — Records fall (via AP) []"));
        assert!(prompt.contains("about 800 words"));
    }

    #[test]
    fn test_system_prompt_names_show() {
        let prompt = system_prompt("Daily Dose", 1200);
        assert!(prompt.contains("\"Daily Dose\""));
        assert!(prompt.contains("1200 words"));
        assert!(prompt.contains("SECTION: <title>"));
    }
}
