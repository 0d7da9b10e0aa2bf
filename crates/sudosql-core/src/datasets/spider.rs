use super::{read_json, DatasetLoader};
use crate::cache::SchemaCache;
use crate::errors::Result;
use crate::model::StandardizedRecord;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Spider layout: `<root>/{train_spider,<split>}.json` and
/// `<root>/database/<db_id>/<db_id>.sqlite`.
pub struct SpiderLoader {
    data_path: PathBuf,
    cache: Arc<SchemaCache>,
}

#[derive(Deserialize)]
struct SpiderItem {
    db_id: String,
    question: String,
    query: String,
}

impl SpiderLoader {
    pub fn new(data_path: impl Into<PathBuf>, cache: Arc<SchemaCache>) -> Self {
        Self {
            data_path: data_path.into(),
            cache,
        }
    }

    fn split_file(&self, split: &str) -> PathBuf {
        if split == "train" {
            self.data_path.join("train_spider.json")
        } else {
            self.data_path.join(format!("{}.json", split))
        }
    }
}

impl DatasetLoader for SpiderLoader {
    fn name(&self) -> &'static str {
        "spider"
    }

    fn load(
        &self,
        split: &str,
        schema_type: &str,
        use_cache: bool,
    ) -> Result<Vec<StandardizedRecord>> {
        let items: Vec<SpiderItem> = read_json(&self.split_file(split))?;

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            let db_path = self
                .data_path
                .join("database")
                .join(&item.db_id)
                .join(format!("{}.sqlite", item.db_id));
            let schema =
                self.cache
                    .get_schema(&db_path, schema_type, use_cache, self.name(), &item.db_id)?;

            records.push(StandardizedRecord {
                question: item.question,
                reference_sql: item.query,
                database_id: item.db_id,
                database_location: db_path,
                schema,
                evidence: None,
                difficulty: None,
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
