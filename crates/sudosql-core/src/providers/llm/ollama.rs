use super::LlmClient;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Local models served by an Ollama daemon.
pub struct OllamaClient {
    base_url: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerateOptions>,
}

#[derive(Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(base_url: Option<String>, model: String) -> Self {
        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model,
            temperature: None,
            max_tokens: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    fn request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        let options = if self.temperature.is_some() || self.max_tokens.is_some() {
            Some(GenerateOptions {
                num_predict: self.max_tokens,
                temperature: self.temperature,
            })
        } else {
            None
        };
        GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options,
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));

        let resp = self
            .client
            .post(&url)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| Error::generation("ollama", format!("request to {} failed: {}", url, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(Error::generation(
                "ollama",
                format!("generate API error {}: {}", status, error_text),
            ));
        }

        let body: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| Error::generation("ollama", format!("invalid response: {}", e)))?;
        Ok(body.response.trim().to_string())
    }

    fn provider_name(&self) -> &str {
        "ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
