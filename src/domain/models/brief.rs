use serde::{Deserialize, Serialize};

use super::{current_timestamp, DocumentMetadata};

const SECTION_PREFIX: &str = "SECTION:";
const LIKES_PREFIX: &str = "USER_FEEDBACK_LIKES: ";
const DISLIKES_PREFIX: &str = "USER_FEEDBACK_DISLIKES: ";

/// A news article handed to brief generation. Fetching articles happens elsewhere.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
}

impl Article {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn prompt_line(&self) -> String {
        format!(
            "- {} — {} (via {}) [{}]",
            self.title, self.description, self.source, self.url
        )
    }
}

/// A generated spoken brief.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Brief {
    summary_id: String,
    text: String,
    sections: Vec<String>,
    created_at: i64,
}

impl Brief {
    pub fn new(summary_id: String, text: String) -> Self {
        let sections = extract_section_titles(&text);
        Self {
            summary_id,
            text,
            sections,
            created_at: current_timestamp(),
        }
    }

    /// Pins the creation time, in unix seconds.
    pub fn with_created_at(mut self, created_at: i64) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn summary_id(&self) -> &str {
        &self.summary_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    pub fn to_metadata(&self) -> DocumentMetadata {
        DocumentMetadata::summary(&self.summary_id).with_timestamp(self.created_at)
    }
}

/// Section titles from lines such as `SECTION: Markets`, matched case-insensitively.
pub fn extract_section_titles(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter_map(|line| {
            let head = line.get(..SECTION_PREFIX.len())?;
            if head.eq_ignore_ascii_case(SECTION_PREFIX) {
                Some(line[SECTION_PREFIX.len()..].trim().to_string())
            } else {
                None
            }
        })
        .collect()
}

/// Listener feedback on one brief.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub summary_id: String,
    /// 1 to 5 when the listener chose to rate the brief.
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub likes: String,
    #[serde(default)]
    pub dislikes: String,
}

impl Feedback {
    pub fn new(summary_id: impl Into<String>) -> Self {
        Self {
            summary_id: summary_id.into(),
            rating: None,
            likes: String::new(),
            dislikes: String::new(),
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_likes(mut self, likes: impl Into<String>) -> Self {
        self.likes = likes.into();
        self
    }

    pub fn with_dislikes(mut self, dislikes: impl Into<String>) -> Self {
        self.dislikes = dislikes.into();
        self
    }

    /// Texts worth remembering for future briefs; the rating alone is not embedded.
    pub fn to_texts(&self) -> Vec<String> {
        let mut texts = Vec::new();
        let likes = self.likes.trim();
        if !likes.is_empty() {
            texts.push(format!("{}{}", LIKES_PREFIX, likes));
        }
        let dislikes = self.dislikes.trim();
        if !dislikes.is_empty() {
            texts.push(format!("{}{}", DISLIKES_PREFIX, dislikes));
        }
        texts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentKind;

    #[test]
    fn test_extract_section_titles() {
        let text = "Good morning.\nSECTION: Markets\nStocks rose.\n  section: Tech  \nSECTIONS are fun\nSECTION:\n";

        let titles = extract_section_titles(text);

        assert_eq!(titles, vec!["Markets".to_string(), "Tech".to_string(), String::new()]);
    }

    #[test]
    fn test_extract_section_titles_ignores_multibyte_prefixes() {
        assert!(extract_section_titles("Ünïcödé line").is_empty());
    }

    #[test]
    fn test_brief_metadata() {
        let brief = Brief::new("abc123".to_string(), "SECTION: World\nHello there".to_string());
        let metadata = brief.to_metadata();

        assert_eq!(brief.sections(), &["World".to_string()]);
        assert_eq!(brief.word_count(), 4);
        assert_eq!(metadata.kind, Some(DocumentKind::Summary));
        assert_eq!(metadata.summary_id.as_deref(), Some("abc123"));
        assert_eq!(metadata.timestamp, Some(brief.created_at()));
    }

    #[test]
    fn test_feedback_texts() {
        let feedback = Feedback::new("s1")
            .with_rating(4)
            .with_likes("more markets")
            .with_dislikes("  ");

        assert_eq!(feedback.to_texts(), vec!["USER_FEEDBACK_LIKES: more markets".to_string()]);
        assert!(Feedback::new("s1").with_rating(3).to_texts().is_empty());
    }

    #[test]
    fn test_article_prompt_line() {
        let article = Article::new("Fed holds", "Rates unchanged")
            .with_source("Reuters")
            .with_url("https://example.com/fed");

        assert_eq!(
            article.prompt_line(),
            "- Fed holds — Rates unchanged (via Reuters) [https://example.com/fed]"
        );
    }
}
