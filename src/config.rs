//! Application settings, built once at startup and passed by reference.
//!
//! Nothing in the library reads the environment; the binary resolves flags and
//! environment variables into an [`AppConfig`] and hands pieces of it to
//! constructors.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::DistanceMetric;

pub const DEFAULT_APP_NAME: &str = "Personalized Morning Brief";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_RETRIEVAL_K: usize = 6;
const DEFAULT_TARGET_WORDS: usize = 1200;
const DEFAULT_MAX_ARTICLES: usize = 30;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where a store lives and how it compares vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    path: PathBuf,
    metric: DistanceMetric,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metric: DistanceMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbeddingProvider {
    #[default]
    Gemini,
    Ort,
    Mock,
}

impl EmbeddingProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingProvider::Gemini => "gemini",
            EmbeddingProvider::Ort => "ort",
            EmbeddingProvider::Mock => "mock",
        }
    }
}

impl std::str::FromStr for EmbeddingProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(EmbeddingProvider::Gemini),
            "ort" | "onnx" | "local" => Ok(EmbeddingProvider::Ort),
            "mock" => Ok(EmbeddingProvider::Mock),
            other => Err(format!(
                "unknown embedding provider '{}', expected gemini, ort or mock",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub provider: EmbeddingProvider,
    /// Model identifier; provider default when `None`.
    pub model: Option<String>,
    /// Output size; required for hosted models missing from the built-in table.
    pub dimensions: Option<usize>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::default(),
            model: None,
            dimensions: None,
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub api_key: Option<String>,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key: None,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    pub app_name: String,
    pub target_words: usize,
    pub retrieval_k: usize,
    pub max_articles: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            target_words: DEFAULT_TARGET_WORDS,
            retrieval_k: DEFAULT_RETRIEVAL_K,
            max_articles: DEFAULT_MAX_ARTICLES,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Plain-text copies of generated briefs.
    pub summaries_dir: PathBuf,
    pub store: StoreConfig,
    pub embedding: EmbeddingSettings,
    pub chat: ChatSettings,
    pub generation: GenerationSettings,
}

impl AppConfig {
    /// Defaults rooted at `data_dir`: the store under `<data_dir>/vectorstore`
    /// and briefs under `<data_dir>/summaries`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let store = StoreConfig::new(data_dir.join("vectorstore"));
        let summaries_dir = data_dir.join("summaries");
        Self {
            data_dir,
            summaries_dir,
            store,
            embedding: EmbeddingSettings::default(),
            chat: ChatSettings::default(),
            generation: GenerationSettings::default(),
        }
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let config = AppConfig::new("/tmp/brief");

        assert_eq!(config.store.path(), Path::new("/tmp/brief/vectorstore"));
        assert_eq!(config.summaries_dir, Path::new("/tmp/brief/summaries"));
        assert_eq!(config.store.metric(), DistanceMetric::SquaredEuclidean);
        assert_eq!(config.generation.retrieval_k, 6);
        assert_eq!(config.generation.target_words, 1200);
        assert_eq!(config.chat.model, "gemini-1.5-flash");
    }

    #[test]
    fn test_store_override() {
        let config = AppConfig::new("data")
            .with_store(StoreConfig::new("elsewhere").with_metric(DistanceMetric::Cosine));

        assert_eq!(config.store.path(), Path::new("elsewhere"));
        assert_eq!(config.store.metric(), DistanceMetric::Cosine);
    }

    #[test]
    fn test_provider_from_str() {
        assert_eq!("ONNX".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Ort));
        assert_eq!("gemini".parse::<EmbeddingProvider>(), Ok(EmbeddingProvider::Gemini));
        assert!("openai".parse::<EmbeddingProvider>().is_err());
    }
}
