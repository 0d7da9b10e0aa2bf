use crate::config::DEFAULT_TIMEOUT_SECONDS;
use crate::critic::Critic;
use crate::engine::prompt::build_prompt;
use crate::engine::vote::VoteTally;
use crate::errors::{Error, Result};
use crate::model::RunMode;
use crate::providers::llm::LlmClient;
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::{timeout, Duration};

/// Combines an ordered list of providers (the first is primary) and an
/// optional critic. Holds no state between calls and never retries.
pub struct InferenceEngine {
    providers: Vec<Arc<dyn LlmClient>>,
    critic: Option<Arc<dyn Critic>>,
    timeout: Duration,
}

impl InferenceEngine {
    pub fn new(providers: Vec<Arc<dyn LlmClient>>, critic: Option<Arc<dyn Critic>>) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::config("at least one model provider is required"));
        }
        Ok(Self {
            providers,
            critic,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
        })
    }

    /// Deadline applied to every provider and critic call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn primary(&self) -> &Arc<dyn LlmClient> {
        &self.providers[0]
    }

    pub fn providers(&self) -> &[Arc<dyn LlmClient>] {
        &self.providers
    }

    pub fn has_critic(&self) -> bool {
        self.critic.is_some()
    }

    pub async fn run(&self, question: &str, schema: &str) -> Result<String> {
        let prompt = build_prompt(question, schema);
        self.call(self.primary().as_ref(), &prompt).await
    }

    /// One primary generation followed by exactly one critic pass.
    pub async fn run_with_critic(&self, question: &str, schema: &str) -> Result<String> {
        let critic = self
            .critic
            .as_ref()
            .ok_or_else(|| Error::config("critic is not configured for this engine"))?;

        let initial = self.run(question, schema).await?;
        let fut = critic.review_and_correct(question, schema, &initial);
        timeout(self.timeout, fut)
            .await
            .map_err(|_| Error::Timeout {
                provider: "critic".into(),
                seconds: self.timeout.as_secs(),
            })?
    }

    /// Every provider answers the same prompt concurrently; the most common
    /// exact string wins, ties going to the lowest-indexed provider.
    pub async fn run_with_voting(&self, question: &str, schema: &str) -> Result<String> {
        if self.providers.len() < 2 {
            tracing::warn!(
                event = "engine.voting_degraded",
                providers = self.providers.len(),
                "voting requires at least 2 providers; running with the primary provider only"
            );
            return self.run(question, schema).await;
        }

        let prompt = build_prompt(question, schema);
        let calls = self
            .providers
            .iter()
            .map(|p| self.call(p.as_ref(), &prompt));
        let outputs = join_all(calls)
            .await
            .into_iter()
            .collect::<Result<Vec<String>>>()?;

        let tally = VoteTally::from_outputs(outputs);
        let winner = tally
            .winner()
            .ok_or_else(|| Error::generation("voting", "no provider output to tally"))?;

        tracing::debug!(
            event = "engine.vote",
            providers = self.providers.len(),
            groups = tally.groups().len(),
            winning_votes = winner.votes,
            winner_index = winner.first_index,
            unanimous = tally.is_unanimous(),
        );
        Ok(winner.text.clone())
    }

    pub async fn run_mode(&self, mode: RunMode, question: &str, schema: &str) -> Result<String> {
        match mode {
            RunMode::Single => self.run(question, schema).await,
            RunMode::Critic => self.run_with_critic(question, schema).await,
            RunMode::Voting => self.run_with_voting(question, schema).await,
        }
    }

    async fn call(&self, client: &dyn LlmClient, prompt: &str) -> Result<String> {
        match timeout(self.timeout, client.generate(prompt)).await {
            Ok(res) => res,
            Err(_) => Err(Error::Timeout {
                provider: client.provider_name().to_string(),
                seconds: self.timeout.as_secs(),
            }),
        }
    }
}
