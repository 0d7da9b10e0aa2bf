//! Dataset collaborators: locate benchmark files and produce standardized records.

use crate::cache::SchemaCache;
use crate::errors::{Error, Result};
use crate::model::StandardizedRecord;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod bird;
pub mod spider;

pub use bird::BirdLoader;
pub use spider::SpiderLoader;

pub trait DatasetLoader: Send + Sync {
    /// Name used as the schema cache namespace.
    fn name(&self) -> &'static str;

    /// Records of `split`, in file order, each carrying its resolved schema text.
    fn load(&self, split: &str, schema_type: &str, use_cache: bool)
        -> Result<Vec<StandardizedRecord>>;
}

pub fn get_loader(
    dataset_name: &str,
    data_path: impl Into<PathBuf>,
    cache: Arc<SchemaCache>,
) -> Result<Box<dyn DatasetLoader>> {
    match dataset_name.to_ascii_lowercase().as_str() {
        "spider" => Ok(Box::new(SpiderLoader::new(data_path, cache))),
        "bird" => Ok(Box::new(BirdLoader::new(data_path, cache))),
        other => Err(Error::dataset(format!("unknown dataset: {}", other))),
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::dataset(format!("failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::dataset(format!("failed to parse {}: {}", path.display(), e)))
}
