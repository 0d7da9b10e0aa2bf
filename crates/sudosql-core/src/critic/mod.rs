use crate::errors::Result;
use crate::providers::llm::LlmClient;
use async_trait::async_trait;
use std::sync::Arc;

/// Reviews a candidate SQL string and returns a (possibly identical) correction.
#[async_trait]
pub trait Critic: Send + Sync {
    async fn review_and_correct(
        &self,
        question: &str,
        schema: &str,
        candidate_sql: &str,
    ) -> Result<String>;
}

/// A critic backed by a provider and a fixed correction prompt.
#[derive(Clone)]
pub struct CriticAgent {
    client: Arc<dyn LlmClient>,
}

impl CriticAgent {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn correction_prompt(question: &str, schema: &str, candidate_sql: &str) -> String {
        format!(
            "You are an expert SQL reviewer. Check the candidate SQL query below against the \
             database schema and the question it is meant to answer.\n\
             If the query is correct, return it unchanged. If it is wrong, return a corrected query.\n\
             Respond with the SQL query only, without explanation.\n\n\
             Database schema:\n{schema}\n\n\
             Question:\n\"{question}\"\n\n\
             Candidate SQL:\n{candidate_sql}\n"
        )
    }
}

#[async_trait]
impl Critic for CriticAgent {
    async fn review_and_correct(
        &self,
        question: &str,
        schema: &str,
        candidate_sql: &str,
    ) -> Result<String> {
        let prompt = Self::correction_prompt(question, schema, candidate_sql);
        let raw = self.client.generate(&prompt).await?;
        let corrected = strip_code_fence(&raw);

        tracing::debug!(
            event = "critic.reviewed",
            provider = self.client.provider_name(),
            changed = corrected != candidate_sql.trim(),
        );
        Ok(corrected)
    }
}

/// Models like to wrap answers in ```sql fences; keep only the body.
fn strip_code_fence(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = match rest.find('\n') {
            Some(nl) => &rest[nl + 1..],
            None => rest,
        };
        let body = body.trim_end();
        let body = body.strip_suffix("```").unwrap_or(body);
        return body.trim().to_string();
    }
    trimmed.to_string()
}
