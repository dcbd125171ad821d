use async_trait::async_trait;

use crate::domain::DomainError;

/// Text generation backend used to write briefs.
///
/// Failures from the model or its transport are `GenerationError`; missing
/// credentials are `ConfigurationError`.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the model's reply to `user` under the `system` instructions.
    async fn complete(&self, system: &str, user: &str) -> Result<String, DomainError>;

    fn model_name(&self) -> &str;
}
