use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::domain::DomainError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Authenticated JSON transport for the Generative Language API.
///
/// Authentication failures surface as configuration errors; every other
/// failure (network, timeout, rate limit, server error) is handed to the
/// caller's `transient` constructor so embeddings and generation report their
/// own error kind. Nothing is retried here.
pub struct GeminiApi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiApi {
    pub fn new(api_key: Option<&str>, timeout: Duration) -> Result<Self, DomainError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| DomainError::configuration("GEMINI_API_KEY not set"))?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model_path(model), method)
    }

    pub async fn post_json<Req, Resp>(
        &self,
        url: &str,
        body: &Req,
        transient: fn(String) -> DomainError,
    ) -> Result<Resp, DomainError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| transient(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Gemini API returned {}: {}", status, body);
            return Err(classify_status(status, transient));
        }

        response
            .json()
            .await
            .map_err(|e| transient(format!("Failed to parse Gemini response: {}", e)))
    }
}

/// `text-embedding-004` → `models/text-embedding-004`; already-qualified names pass through.
pub fn model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn classify_status(status: StatusCode, transient: fn(String) -> DomainError) -> DomainError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DomainError::configuration(format!("Gemini rejected the API key ({})", status))
        }
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
            DomainError::invalid_input(format!("Gemini rejected the request ({})", status))
        }
        _ => transient(format!("Gemini API returned {}", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = GeminiApi::new(None, Duration::from_secs(1)).err().unwrap();
        assert!(err.is_configuration_error());

        let blank = GeminiApi::new(Some("  "), Duration::from_secs(1)).err().unwrap();
        assert!(blank.is_configuration_error());
    }

    #[test]
    fn test_model_url() {
        let api = GeminiApi::new(Some("key"), Duration::from_secs(1))
            .unwrap()
            .with_base_url("http://localhost:8080/v1beta/");

        assert_eq!(
            api.model_url("text-embedding-004", "embedContent"),
            "http://localhost:8080/v1beta/models/text-embedding-004:embedContent"
        );
        assert_eq!(
            api.model_url("models/gemini-1.5-flash", "generateContent"),
            "http://localhost:8080/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn test_status_classification() {
        let auth = classify_status(StatusCode::FORBIDDEN, DomainError::EmbeddingError);
        assert!(auth.is_configuration_error());

        let limited = classify_status(StatusCode::TOO_MANY_REQUESTS, DomainError::EmbeddingError);
        assert!(limited.is_transient());

        let bad = classify_status(StatusCode::BAD_REQUEST, DomainError::GenerationError);
        assert!(bad.is_invalid_input());
    }
}
