use super::LlmClient;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Deterministic offline backend for dry runs and tests.
pub struct FakeClient {
    name: String,
    behavior: Behavior,
    next: AtomicUsize,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
    journal: Option<Arc<Mutex<Vec<String>>>>,
}

enum Behavior {
    Fixed(String),
    Cycle(Vec<String>),
    Fail(String),
}

impl FakeClient {
    pub fn fixed(text: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fixed(text.into()))
    }

    /// Returns `responses[i % len]` on the i-th call.
    pub fn cycle(responses: Vec<String>) -> Self {
        if responses.is_empty() {
            return Self::with_behavior(Behavior::Fixed(String::new()));
        }
        Self::with_behavior(Behavior::Cycle(responses))
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_behavior(Behavior::Fail(message.into()))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            name: "fake".into(),
            behavior,
            next: AtomicUsize::new(0),
            delay: None,
            prompts: Mutex::new(Vec::new()),
            journal: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Shared call log: each call pushes this client's name.
    pub fn with_journal(mut self, journal: Arc<Mutex<Vec<String>>>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Upcasts fakes into an engine's provider list, keeping order.
pub fn as_providers(clients: &[Arc<FakeClient>]) -> Vec<Arc<dyn LlmClient>> {
    clients
        .iter()
        .map(|c| c.clone() as Arc<dyn LlmClient>)
        .collect()
}

#[async_trait]
impl LlmClient for FakeClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());
        if let Some(j) = &self.journal {
            j.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(self.name.clone());
        }
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }

        match &self.behavior {
            Behavior::Fixed(t) => Ok(t.clone()),
            Behavior::Cycle(all) => {
                let i = self.next.fetch_add(1, Ordering::SeqCst);
                Ok(all[i % all.len()].clone())
            }
            Behavior::Fail(msg) => Err(Error::generation(self.name.clone(), msg.clone())),
        }
    }

    fn provider_name(&self) -> &str {
        &self.name
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cycle_and_record() {
        let c = FakeClient::cycle(vec!["A".into(), "B".into()]);
        assert_eq!(c.generate("p1").await.unwrap(), "A");
        assert_eq!(c.generate("p2").await.unwrap(), "B");
        assert_eq!(c.generate("p3").await.unwrap(), "A");
        assert_eq!(c.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_failing_records_call() {
        let c = FakeClient::failing("rate limited").named("flaky");
        let err = c.generate("p").await.unwrap_err();
        assert!(err.is_generation());
        assert!(err.to_string().contains("flaky"));
        assert_eq!(c.call_count(), 1);
    }
}
