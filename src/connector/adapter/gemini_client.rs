use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::gemini_api::GeminiApi;
use crate::application::ChatClient;
use crate::config::ChatSettings;
use crate::domain::DomainError;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// [`ChatClient`] backed by Gemini `generateContent`.
pub struct GeminiClient {
    api: GeminiApi,
    model: String,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(settings: &ChatSettings) -> Result<Self, DomainError> {
        Ok(Self {
            api: GeminiApi::new(settings.api_key.as_deref(), settings.timeout)?,
            model: settings.model.clone(),
            max_output_tokens: settings.max_output_tokens,
        })
    }

    pub fn with_api(mut self, api: GeminiApi) -> Self {
        self.api = api;
        self
    }

    fn request<'a>(&self, system: &'a str, user: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: [Part { text: system }],
            },
            contents: [Content {
                role: Some("user"),
                parts: [Part { text: user }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

#[async_trait]
impl ChatClient for GeminiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, DomainError> {
        let url = self.api.model_url(&self.model, "generateContent");
        let response: GenerateResponse = self
            .api
            .post_json(&url, &self.request(system, user), DomainError::GenerationError)
            .await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        debug!("{} returned {} characters", self.model, text.len());
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
