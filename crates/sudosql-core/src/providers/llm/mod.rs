use crate::errors::Result;
use async_trait::async_trait;

/// A text-generation backend. All transport, auth, rate-limit and
/// response-shape failures surface as `Error::Generation`; no retries here.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
    fn provider_name(&self) -> &str;
    fn model_name(&self) -> &str;
}

pub mod fake;
pub mod ollama;
pub mod openai;
