use crate::engine::orchestrator::InferenceEngine;
use crate::errors::Result;
use crate::model::{BatchSummary, OutputConfig, RunMode, RunResult, SaveMode, StandardizedRecord};
use crate::storage::result_log::{output_path, ResultLog};
use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

/// Drives the engine over a dataset, one persisted result per record.
///
/// In resume mode the questions already in the log are skipped before any
/// provider is called. Results are appended by this loop alone, in dataset
/// order, each as a complete flushed line. The first generation failure
/// aborts the batch; everything appended before it stays valid.
pub struct BatchRunner {
    engine: Arc<InferenceEngine>,
    model_name: String,
    mode: RunMode,
    parallel: usize,
    output: Option<OutputConfig>,
}

impl BatchRunner {
    pub fn new(engine: Arc<InferenceEngine>, model_name: impl Into<String>) -> Self {
        Self {
            engine,
            model_name: model_name.into(),
            mode: RunMode::Single,
            parallel: 1,
            output: None,
        }
    }

    pub fn with_output(mut self, output: OutputConfig) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    /// Records with provider calls in flight at once.
    pub fn with_parallel(mut self, parallel: usize) -> Self {
        self.parallel = parallel.max(1);
        self
    }

    pub fn output_path(&self, dataset_name: &str, split: &str, started_at: DateTime<Local>) -> Option<PathBuf> {
        self.output.as_ref().map(|o| {
            output_path(
                &o.save_path,
                dataset_name,
                split,
                &self.model_name,
                o.save_mode,
                started_at,
            )
        })
    }

    pub async fn run(
        &self,
        dataset_name: &str,
        split: &str,
        records: Vec<StandardizedRecord>,
    ) -> Result<BatchSummary> {
        self.run_at(dataset_name, split, records, Local::now()).await
    }

    /// Same as [`run`](Self::run) with an explicit run start time, which
    /// names the log in overwrite mode.
    pub async fn run_at(
        &self,
        dataset_name: &str,
        split: &str,
        records: Vec<StandardizedRecord>,
        started_at: DateTime<Local>,
    ) -> Result<BatchSummary> {
        let total = records.len();

        let mut log = match (&self.output, self.output_path(dataset_name, split, started_at)) {
            (Some(o), Some(path)) => Some(ResultLog::prepare(path, o.save_mode)?),
            _ => None,
        };

        let mut done: HashSet<String> = HashSet::new();
        if let (Some(o), Some(l)) = (&self.output, &log) {
            if o.save_mode == SaveMode::Resume {
                done = l.load_completed()?;
                tracing::info!(
                    event = "batch.resume",
                    path = %l.path().display(),
                    completed = done.len(),
                    "resuming run; previously completed questions will be skipped"
                );
            }
        }

        // Claiming a question here also skips later duplicates within the same
        // split, so a fresh run and an interrupted-then-resumed run agree.
        let mut skipped = 0usize;
        let mut pending = Vec::with_capacity(total);
        for rec in records {
            if done.insert(rec.question.clone()) {
                pending.push(rec);
            } else {
                tracing::debug!(event = "batch.skip", question = %rec.question);
                skipped += 1;
            }
        }

        tracing::info!(
            event = "batch.start",
            dataset = dataset_name,
            split = split,
            mode = self.mode.as_str(),
            total = total,
            pending = pending.len(),
            parallel = self.parallel,
        );

        let engine = &self.engine;
        let mode = self.mode;
        let mut results = stream::iter(pending.into_iter().map(|rec| async move {
            let sql = engine.run_mode(mode, &rec.question, &rec.schema).await;
            (rec, sql)
        }))
        .buffered(self.parallel);

        let mut processed = 0usize;
        while let Some((rec, sql)) = results.next().await {
            let sql = match sql {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(
                        event = "batch.aborted",
                        db_id = %rec.database_id,
                        question = %rec.question,
                        completed = processed,
                        skipped = skipped,
                        error = %e,
                        "generation failed; rerun in resume mode to continue"
                    );
                    return Err(e);
                }
            };

            tracing::info!(
                event = "batch.record",
                db_id = %rec.database_id,
                question = %rec.question,
                generated_sql = %sql,
                ground_truth_sql = %rec.reference_sql,
            );

            let row = RunResult::from_record(&rec, sql);
            if let Some(l) = log.as_mut() {
                l.append(&row)?;
            }
            processed += 1;
        }

        let summary = BatchSummary {
            total,
            processed,
            skipped,
            output_path: log.map(|l| l.path().to_path_buf()),
        };
        tracing::info!(
            event = "batch.done",
            total = summary.total,
            processed = summary.processed,
            skipped = summary.skipped,
            output = ?summary.output_path,
        );
        Ok(summary)
    }
}
