use super::{read_json, DatasetLoader};
use crate::cache::SchemaCache;
use crate::errors::{Error, Result};
use crate::model::StandardizedRecord;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// BIRD ships each split in its own dated directory (e.g. `dev_20240627/`)
/// holding `<split>.json` and `<split>_databases/<db_id>/<db_id>.sqlite`.
pub struct BirdLoader {
    data_path: PathBuf,
    cache: Arc<SchemaCache>,
}

#[derive(Deserialize)]
struct BirdItem {
    db_id: String,
    question: String,
    #[serde(rename = "SQL")]
    sql: String,
    #[serde(default)]
    evidence: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
}

impl BirdLoader {
    pub fn new(data_path: impl Into<PathBuf>, cache: Arc<SchemaCache>) -> Self {
        Self {
            data_path: data_path.into(),
            cache,
        }
    }

    /// First directory (by name) whose name starts with `split`.
    fn split_dir(&self, split: &str) -> Result<PathBuf> {
        let entries = std::fs::read_dir(&self.data_path).map_err(|e| {
            Error::dataset(format!(
                "failed to list {}: {}",
                self.data_path.display(),
                e
            ))
        })?;

        let mut candidates: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter(|e| e.file_name().to_string_lossy().starts_with(split))
            .map(|e| e.path())
            .collect();
        candidates.sort();

        candidates.into_iter().next().ok_or_else(|| {
            Error::dataset(format!(
                "could not find data directory for split '{}' under {}",
                split,
                self.data_path.display()
            ))
        })
    }
}

impl DatasetLoader for BirdLoader {
    fn name(&self) -> &'static str {
        "bird"
    }

    fn load(
        &self,
        split: &str,
        schema_type: &str,
        use_cache: bool,
    ) -> Result<Vec<StandardizedRecord>> {
        let split_dir = self.split_dir(split)?;
        let items: Vec<BirdItem> = read_json(&split_dir.join(format!("{}.json", split)))?;
        let db_root = split_dir.join(format!("{}_databases", split));

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            let db_path = db_root
                .join(&item.db_id)
                .join(format!("{}.sqlite", item.db_id));
            let schema =
                self.cache
                    .get_schema(&db_path, schema_type, use_cache, self.name(), &item.db_id)?;

            records.push(StandardizedRecord {
                question: item.question,
                reference_sql: item.sql,
                database_id: item.db_id,
                database_location: db_path,
                schema,
                evidence: item.evidence,
                difficulty: item.difficulty,
            });
        }

        tracing::info!(
            event = "dataset.loaded",
            dataset = self.name(),
            split = split,
            records = records.len(),
        );
        Ok(records)
    }
}
