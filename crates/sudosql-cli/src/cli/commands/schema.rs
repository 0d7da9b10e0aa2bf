use super::exit_codes;
use crate::cli::args::SchemaArgs;
use anyhow::Context;
use std::sync::Arc;
use sudosql_core::cache::SchemaCache;
use sudosql_core::schema::{SchemaGenerator, SqliteSchemaGenerator};

pub fn run(args: SchemaArgs) -> anyhow::Result<i32> {
    let generator = Arc::new(SqliteSchemaGenerator::new());

    let schema = match (args.use_cache, args.dataset.as_deref(), args.db_id.as_deref()) {
        (true, Some(dataset), Some(db_id)) => {
            let cache = SchemaCache::new(&args.cache_root, generator);
            cache.get_schema(&args.db_path, &args.schema_type, true, dataset, db_id)?
        }
        _ => generator.generate(&args.db_path, &args.schema_type)?,
    };

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &schema)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{}", schema),
    }
    Ok(exit_codes::OK)
}
