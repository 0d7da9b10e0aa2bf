//! Schema derivation: turns a source database into a textual schema document.

use crate::errors::Result;
use std::path::Path;

pub mod sqlite;

pub use sqlite::SqliteSchemaGenerator;

pub trait SchemaGenerator: Send + Sync {
    fn generate(&self, db_path: &Path, schema_type: &str) -> Result<String>;
}
