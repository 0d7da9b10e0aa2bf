use chrono::{Local, TimeZone};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sudosql_core::engine::{BatchRunner, InferenceEngine};
use sudosql_core::model::{OutputConfig, RunResult, SaveMode, StandardizedRecord};
use sudosql_core::providers::llm::fake::{as_providers, FakeClient};
use tempfile::tempdir;

fn record(question: &str) -> StandardizedRecord {
    StandardizedRecord {
        question: question.into(),
        reference_sql: format!("SELECT '{}'", question),
        database_id: "concert_singer".into(),
        database_location: PathBuf::from("database/concert_singer/concert_singer.sqlite"),
        schema: "CREATE TABLE singer(name TEXT);".into(),
        evidence: None,
        difficulty: None,
    }
}

fn runner(client: Arc<FakeClient>, save_path: &Path, mode: SaveMode) -> BatchRunner {
    let engine = InferenceEngine::new(as_providers(&[client]), None).unwrap();
    BatchRunner::new(Arc::new(engine), "fake-model").with_output(OutputConfig {
        save_path: save_path.to_path_buf(),
        save_mode: mode,
    })
}

fn read_rows(path: &Path) -> Vec<RunResult> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn test_end_to_end_writes_one_line_per_question() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let client = Arc::new(FakeClient::fixed("SELECT 1"));
    let r = runner(client.clone(), dir.path(), SaveMode::Resume);

    let summary = r.run("spider", "dev", vec![record("Q1"), record("Q2")]).await?;
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 0);

    let path = summary.output_path.unwrap();
    assert_eq!(path, dir.path().join("spider_dev_fake-model.jsonl"));
    let rows = read_rows(&path);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].question, "Q1");
    assert_eq!(rows[1].question, "Q2");
    assert!(rows.iter().all(|r| r.generated_sql == "SELECT 1"));
    assert_eq!(rows[1].reference_sql, "SELECT 'Q2'");
    Ok(())
}

#[tokio::test]
async fn test_resume_skips_completed_questions() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("spider_dev_fake-model.jsonl");
    std::fs::write(
        &path,
        "{\"db_id\":\"concert_singer\",\"question\":\"Q1\",\"generated_sql\":\"SELECT old\",\"ground_truth_sql\":\"SELECT 'Q1'\"}\n",
    )?;

    let client = Arc::new(FakeClient::fixed("SELECT new"));
    let r = runner(client.clone(), dir.path(), SaveMode::Resume);
    let summary = r.run("spider", "dev", vec![record("Q1"), record("Q2")]).await?;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(client.call_count(), 1);
    assert!(client.prompts()[0].contains("\"Q2\""));

    let rows = read_rows(&path);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].generated_sql, "SELECT old");
    assert_eq!(rows[1].question, "Q2");

    // a second resume has nothing left to do
    let again = r.run("spider", "dev", vec![record("Q1"), record("Q2")]).await?;
    assert_eq!(again.processed, 0);
    assert_eq!(client.call_count(), 1);
    assert_eq!(read_rows(&path).len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_overwrite_runs_get_separate_files() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let client = Arc::new(FakeClient::fixed("SELECT 1"));
    let r = runner(client.clone(), dir.path(), SaveMode::Overwrite);

    let t1 = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
    let t2 = t1 + chrono::Duration::milliseconds(1);
    let first = r.run_at("bird", "dev", vec![record("Q1")], t1).await?;
    let second = r.run_at("bird", "dev", vec![record("Q1")], t2).await?;

    let p1 = first.output_path.unwrap();
    let p2 = second.output_path.unwrap();
    assert_ne!(p1, p2);
    assert_eq!(read_rows(&p1).len(), 1);
    assert_eq!(read_rows(&p2).len(), 1);
    // overwrite never consults earlier logs
    assert_eq!(client.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_back_to_back_overwrite_runs_never_share_a_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let client = Arc::new(FakeClient::fixed("SELECT 1"));
    let r = runner(client, dir.path(), SaveMode::Overwrite);

    // fast enough that most pairs start within the same millisecond
    let mut seen = std::collections::HashSet::new();
    for _ in 0..25 {
        let empty = r.run("spider", "dev", vec![]).await?;
        let one = r.run("spider", "dev", vec![record("Q2")]).await?;

        let p_empty = empty.output_path.unwrap();
        let p_one = one.output_path.unwrap();
        assert_ne!(p_empty, p_one);
        assert!(p_empty.exists(), "first run's log was removed: {}", p_empty.display());
        assert!(read_rows(&p_empty).is_empty());
        let rows = read_rows(&p_one);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].question, "Q2");

        assert!(seen.insert(p_empty));
        assert!(seen.insert(p_one));
    }
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 50);
    Ok(())
}

#[tokio::test]
async fn test_failure_aborts_and_keeps_completed_lines() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let client = Arc::new(FakeClient::cycle(vec!["SELECT 1".into()]));
    let r = runner(client, dir.path(), SaveMode::Resume);
    r.run("spider", "dev", vec![record("Q1")]).await?;

    let failing = Arc::new(FakeClient::failing("429 too many requests"));
    let r = runner(failing.clone(), dir.path(), SaveMode::Resume);
    let err = r
        .run("spider", "dev", vec![record("Q1"), record("Q2"), record("Q3")])
        .await
        .unwrap_err();
    assert!(err.is_generation());
    // Q1 skipped, Q2 failed, Q3 never attempted
    assert_eq!(failing.call_count(), 1);

    let rows = read_rows(&dir.path().join("spider_dev_fake-model.jsonl"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].question, "Q1");
    Ok(())
}

#[tokio::test]
async fn test_duplicate_questions_recorded_once() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let client = Arc::new(FakeClient::fixed("SELECT 1"));
    let r = runner(client.clone(), dir.path(), SaveMode::Overwrite);

    let summary = r
        .run("spider", "dev", vec![record("Q1"), record("Q2"), record("Q1")])
        .await?;
    assert_eq!(summary.total, 3);
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(client.call_count(), 2);
    assert_eq!(read_rows(&summary.output_path.unwrap()).len(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_parallel_keeps_dataset_order() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let client = Arc::new(FakeClient::fixed("SELECT 1").with_delay(Duration::from_millis(10)));
    let r = runner(client.clone(), dir.path(), SaveMode::Resume).with_parallel(4);

    let questions: Vec<String> = (0..10).map(|i| format!("Q{}", i)).collect();
    let summary = r
        .run("spider", "dev", questions.iter().map(|q| record(q)).collect())
        .await?;
    assert_eq!(summary.processed, 10);

    let got: Vec<String> = read_rows(&summary.output_path.unwrap())
        .into_iter()
        .map(|r| r.question)
        .collect();
    assert_eq!(got, questions);
    Ok(())
}

#[tokio::test]
async fn test_without_output_nothing_is_persisted() -> anyhow::Result<()> {
    let client = Arc::new(FakeClient::fixed("SELECT 1"));
    let engine = InferenceEngine::new(as_providers(&[client.clone()]), None)?;
    let r = BatchRunner::new(Arc::new(engine), "fake-model");

    let summary = r.run("spider", "dev", vec![record("Q1"), record("Q1")]).await?;
    assert_eq!(summary.processed, 1);
    assert!(summary.output_path.is_none());
    Ok(())
}
