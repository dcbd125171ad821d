use std::sync::Mutex;

use async_trait::async_trait;

use crate::application::ChatClient;
use crate::domain::DomainError;

/// Offline [`ChatClient`] returning a fixed brief and remembering every prompt it saw.
pub struct MockChatClient {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl MockChatClient {
    pub fn new() -> Self {
        Self::with_response(
            "Good morning, here are today's highlights.\n\
             SECTION: Top Stories\n\
             Nothing unusual happened overnight.\n\
             SECTION: What to Watch\n\
             Keep an eye on the markets.",
        )
    }

    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// User prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl Default for MockChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn complete(&self, _system: &str, user: &str) -> Result<String, DomainError> {
        self.prompts
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to lock prompt log: {}", e)))?
            .push(user.to_string());
        Ok(self.response.clone())
    }

    fn model_name(&self) -> &str {
        "mock-chat"
    }
}
