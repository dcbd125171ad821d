use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::gemini_api::{model_path, GeminiApi};
use crate::application::EmbeddingService;
use crate::config::{EmbeddingSettings, DEFAULT_EMBEDDING_MODEL};
use crate::domain::{DomainError, EmbeddingConfig};

/// The API accepts at most this many texts per batch request.
const MAX_BATCH: usize = 100;
const MAX_INPUT_TOKENS: usize = 2048;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedRequest<'a> {
    requests: Vec<EmbedRequest<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Values,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<Values>,
}

#[derive(Deserialize)]
struct Values {
    values: Vec<f32>,
}

/// Hosted embeddings from Google's Generative Language API.
///
/// Documents go through `batchEmbedContents`, queries through `embedContent`.
pub struct GeminiEmbedding {
    api: GeminiApi,
    model_path: String,
    /// Truncation requested from the API; `None` keeps the model's native size.
    output_dimensionality: Option<usize>,
    config: EmbeddingConfig,
}

impl GeminiEmbedding {
    /// Fails immediately with a configuration error when no API key is set or
    /// when the output size of the model cannot be determined.
    pub fn new(settings: &EmbeddingSettings) -> Result<Self, DomainError> {
        let model = settings
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string());
        let api = GeminiApi::new(settings.api_key.as_deref(), settings.timeout)?;
        let dimensions = match settings.dimensions.or_else(|| known_dimensions(&model)) {
            Some(0) => {
                return Err(DomainError::configuration(
                    "embedding dimensions must be positive",
                ))
            }
            Some(dimensions) => dimensions,
            None => {
                return Err(DomainError::configuration(format!(
                    "unknown output size for Gemini embedding model '{}'; set EMBEDDING_DIMENSIONS",
                    model
                )))
            }
        };
        info!("Using Gemini embeddings with model {} ({} dims)", model, dimensions);

        Ok(Self {
            api,
            model_path: model_path(&model),
            output_dimensionality: settings.dimensions,
            config: EmbeddingConfig::new(model, dimensions, MAX_INPUT_TOKENS),
        })
    }

    pub fn with_api(mut self, api: GeminiApi) -> Self {
        self.api = api;
        self
    }

    fn request<'a>(&'a self, text: &'a str) -> EmbedRequest<'a> {
        EmbedRequest {
            model: &self.model_path,
            content: Content {
                parts: [Part { text }],
            },
            output_dimensionality: self.output_dimensionality,
        }
    }
}

/// Output length of the published embedding models.
pub fn known_dimensions(model: &str) -> Option<usize> {
    match model.trim_start_matches("models/") {
        "gemini-embedding-001" | "gemini-embedding-exp-03-07" => Some(3072),
        "text-embedding-004" | "embedding-001" => Some(768),
        _ => None,
    }
}

#[async_trait]
impl EmbeddingService for GeminiEmbedding {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let url = self
            .api
            .model_url(self.config.model_name(), "batchEmbedContents");
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(MAX_BATCH) {
            let body = BatchEmbedRequest {
                requests: batch.iter().map(|t| self.request(t)).collect(),
            };
            let response: BatchEmbedResponse = self
                .api
                .post_json(&url, &body, DomainError::EmbeddingError)
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(DomainError::embedding(format!(
                    "requested {} embeddings, received {}",
                    batch.len(),
                    response.embeddings.len()
                )));
            }
            vectors.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        debug!("Embedded {} texts with {}", vectors.len(), self.config.model_name());
        Ok(vectors)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        let url = self.api.model_url(self.config.model_name(), "embedContent");
        let response: EmbedResponse = self
            .api
            .post_json(&url, &self.request(query), DomainError::EmbeddingError)
            .await?;

        if response.embedding.values.is_empty() {
            return Err(DomainError::embedding("Gemini returned an empty embedding"));
        }
        Ok(response.embedding.values)
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
