use crate::cache::key::entry_path;
use crate::errors::{Error, Result, StorageContext};
use crate::schema::SchemaGenerator;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

/// File-backed schema cache.
///
/// An entry is served only while its write time is strictly newer than the
/// source database's modification time; anything else regenerates and
/// overwrites it. There is no explicit eviction. The check-regenerate-store
/// sequence runs under a per-entry lock.
pub struct SchemaCache {
    root: PathBuf,
    generator: Arc<dyn SchemaGenerator>,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl SchemaCache {
    pub fn new(root: impl Into<PathBuf>, generator: Arc<dyn SchemaGenerator>) -> Self {
        Self {
            root: root.into(),
            generator,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get_schema(
        &self,
        db_location: &Path,
        schema_type: &str,
        use_cache: bool,
        dataset_name: &str,
        db_id: &str,
    ) -> Result<String> {
        if !use_cache {
            return self.generator.generate(db_location, schema_type);
        }

        let path = entry_path(&self.root, dataset_name, db_id, schema_type);
        let lock = self.entry_lock(&path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        match std::fs::metadata(&path) {
            Ok(meta) => {
                let cached_at = meta.modified().at_path(&path)?;
                let db_modified_at = source_mtime(db_location)?;
                if cached_at > db_modified_at {
                    tracing::debug!(
                        event = "schema_cache.hit",
                        dataset = dataset_name,
                        db_id = db_id,
                        schema_type = schema_type,
                    );
                    return std::fs::read_to_string(&path).at_path(&path);
                }
                tracing::info!(
                    event = "schema_cache.stale",
                    dataset = dataset_name,
                    db_id = db_id,
                    schema_type = schema_type,
                    "source database changed since the schema was cached; regenerating"
                );
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!(
                    event = "schema_cache.miss",
                    dataset = dataset_name,
                    db_id = db_id,
                    schema_type = schema_type,
                );
            }
            Err(e) => return Err(Error::storage(&path, e)),
        }

        let schema = self.generator.generate(db_location, schema_type)?;
        store(&path, &schema)?;
        Ok(schema)
    }

    fn entry_lock(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn source_mtime(db_location: &Path) -> Result<SystemTime> {
    std::fs::metadata(db_location)
        .and_then(|m| m.modified())
        .map_err(|e| {
            Error::schema_generation(
                db_location.display().to_string(),
                format!("cannot read modification time: {}", e),
            )
        })
}

/// Full overwrite through a sibling temp file, so readers never see a partial entry.
fn store(path: &Path, schema: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).at_path(parent)?;
    }
    let tmp = path.with_extension("txt.tmp");
    std::fs::write(&tmp, schema).at_path(&tmp)?;
    std::fs::rename(&tmp, path).at_path(path)?;
    Ok(())
}
