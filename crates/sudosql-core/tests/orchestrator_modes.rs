use std::sync::{Arc, Mutex};
use sudosql_core::critic::{Critic, CriticAgent};
use sudosql_core::engine::prompt::build_prompt;
use sudosql_core::engine::InferenceEngine;
use sudosql_core::model::RunMode;
use sudosql_core::providers::llm::fake::{as_providers, FakeClient};
use sudosql_core::Error;

const SCHEMA: &str = "CREATE TABLE singer(singer_id INTEGER, name TEXT);";
const QUESTION: &str = "How many singers do we have?";

fn fakes(outputs: &[&str]) -> Vec<Arc<FakeClient>> {
    outputs
        .iter()
        .enumerate()
        .map(|(i, o)| Arc::new(FakeClient::fixed(*o).named(format!("p{}", i))))
        .collect()
}

#[tokio::test]
async fn test_voting_majority_wins() {
    let ps = fakes(&["A", "B", "A"]);
    let engine = InferenceEngine::new(as_providers(&ps), None).unwrap();

    let sql = engine.run_with_voting(QUESTION, SCHEMA).await.unwrap();
    assert_eq!(sql, "A");
    // every provider saw the same prompt exactly once
    for p in &ps {
        assert_eq!(p.prompts(), vec![build_prompt(QUESTION, SCHEMA)]);
    }
}

#[tokio::test]
async fn test_voting_tie_goes_to_first_provider() {
    let ps = fakes(&["A", "B"]);
    let engine = InferenceEngine::new(as_providers(&ps), None).unwrap();
    assert_eq!(engine.run_with_voting(QUESTION, SCHEMA).await.unwrap(), "A");

    let ps = fakes(&["B", "A", "C", "A", "B"]);
    let engine = InferenceEngine::new(as_providers(&ps), None).unwrap();
    assert_eq!(engine.run_with_voting(QUESTION, SCHEMA).await.unwrap(), "B");
}

#[tokio::test]
async fn test_voting_is_exact_string_match() {
    // whitespace and case variants are distinct candidates
    let ps = fakes(&["SELECT 1", "select 1", "SELECT  1", "select 1"]);
    let engine = InferenceEngine::new(as_providers(&ps), None).unwrap();
    assert_eq!(
        engine.run_with_voting(QUESTION, SCHEMA).await.unwrap(),
        "select 1"
    );
}

#[tokio::test]
async fn test_voting_single_provider_degrades_to_run() {
    let ps = fakes(&["SELECT count(*) FROM singer"]);
    let engine = InferenceEngine::new(as_providers(&ps), None).unwrap();

    let voted = engine.run_with_voting(QUESTION, SCHEMA).await.unwrap();
    let single = engine.run(QUESTION, SCHEMA).await.unwrap();
    assert_eq!(voted, single);
    assert_eq!(ps[0].call_count(), 2);
}

#[tokio::test]
async fn test_voting_failure_aborts_question() {
    let ok = Arc::new(FakeClient::fixed("A").named("ok"));
    let bad = Arc::new(FakeClient::failing("503 service unavailable").named("bad"));
    let engine = InferenceEngine::new(as_providers(&[ok.clone(), bad, ok.clone()]), None).unwrap();

    let err = engine.run_with_voting(QUESTION, SCHEMA).await.unwrap_err();
    assert!(err.is_generation());
    assert!(matches!(err, Error::Generation { ref provider, .. } if provider == "bad"));
}

#[tokio::test]
async fn test_critic_runs_after_primary_once() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let primary = Arc::new(
        FakeClient::fixed("SELECT nme FROM singer")
            .named("primary")
            .with_journal(journal.clone()),
    );
    let reviewer = Arc::new(
        FakeClient::fixed("```sql\nSELECT count(*) FROM singer\n```")
            .named("reviewer")
            .with_journal(journal.clone()),
    );
    let critic: Arc<dyn Critic> = Arc::new(CriticAgent::new(reviewer.clone()));
    let engine = InferenceEngine::new(as_providers(&[primary.clone()]), Some(critic)).unwrap();

    let sql = engine.run_with_critic(QUESTION, SCHEMA).await.unwrap();
    assert_eq!(sql, "SELECT count(*) FROM singer");
    assert_eq!(*journal.lock().unwrap(), vec!["primary", "reviewer"]);

    // the critic sees the primary's candidate, not a fresh prompt
    let seen = reviewer.prompts();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].contains("SELECT nme FROM singer"));
    assert!(seen[0].contains(SCHEMA));
}

#[tokio::test]
async fn test_critic_runs_even_when_it_agrees() {
    let journal = Arc::new(Mutex::new(Vec::new()));
    let candidate = "SELECT count(*) FROM singer";
    let primary = Arc::new(
        FakeClient::fixed(candidate)
            .named("primary")
            .with_journal(journal.clone()),
    );
    let reviewer = Arc::new(
        FakeClient::fixed(candidate)
            .named("reviewer")
            .with_journal(journal.clone()),
    );
    let critic: Arc<dyn Critic> = Arc::new(CriticAgent::new(reviewer.clone()));
    let engine = InferenceEngine::new(as_providers(&[primary]), Some(critic)).unwrap();

    let sql = engine.run_with_critic(QUESTION, SCHEMA).await.unwrap();
    assert_eq!(sql, candidate);
    assert_eq!(*journal.lock().unwrap(), vec!["primary", "reviewer"]);
    assert_eq!(reviewer.call_count(), 1);
}

#[tokio::test]
async fn test_critic_skipped_when_primary_fails() {
    let primary = Arc::new(FakeClient::failing("401 unauthorized").named("primary"));
    let reviewer = Arc::new(FakeClient::fixed("SELECT 1").named("reviewer"));
    let critic: Arc<dyn Critic> = Arc::new(CriticAgent::new(reviewer.clone()));
    let engine = InferenceEngine::new(as_providers(&[primary]), Some(critic)).unwrap();

    let err = engine.run_with_critic(QUESTION, SCHEMA).await.unwrap_err();
    assert!(err.is_generation());
    assert_eq!(reviewer.call_count(), 0);
}

#[tokio::test]
async fn test_run_mode_dispatch() {
    let ps = fakes(&["X", "Y", "Y"]);
    let engine = InferenceEngine::new(as_providers(&ps), None).unwrap();

    assert_eq!(engine.run_mode(RunMode::Single, QUESTION, SCHEMA).await.unwrap(), "X");
    assert_eq!(engine.run_mode(RunMode::Voting, QUESTION, SCHEMA).await.unwrap(), "Y");
    let err = engine
        .run_mode(RunMode::Critic, QUESTION, SCHEMA)
        .await
        .unwrap_err();
    assert!(err.is_configuration());
}
