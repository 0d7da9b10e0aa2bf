use super::exit_codes;
use crate::cli::args::InferArgs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use sudosql_core::cache::SchemaCache;
use sudosql_core::config::{
    load_pipeline_config, load_providers_config, PipelineConfig, DEFAULT_CACHE_ROOT,
    DEFAULT_TIMEOUT_SECONDS,
};
use sudosql_core::critic::{Critic, CriticAgent};
use sudosql_core::datasets::get_loader;
use sudosql_core::engine::{BatchRunner, InferenceEngine};
use sudosql_core::model::{RunMode, SaveMode};
use sudosql_core::providers::{self, llm::LlmClient};
use sudosql_core::schema::SqliteSchemaGenerator;
use sudosql_core::Error;

pub async fn run(args: InferArgs) -> anyhow::Result<i32> {
    let mut cfg = load_pipeline_config(&args.config, args.strict)?;

    if let Some(mode) = args.save_mode.as_deref().and_then(SaveMode::parse) {
        match cfg.inference.output.as_mut() {
            Some(out) => out.save_mode = mode,
            None => tracing::warn!(
                event = "infer.save_mode_ignored",
                "--save-mode given but inference.output is not configured; results are not persisted"
            ),
        }
    }

    let clients = build_providers(&cfg)?;
    let mode = effective_mode(&cfg);
    let critic = if mode == RunMode::Critic {
        Some(Arc::new(CriticAgent::new(clients[0].clone())) as Arc<dyn Critic>)
    } else {
        None
    };
    let timeout = cfg.settings.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let engine = InferenceEngine::new(clients, critic)?.with_timeout(Duration::from_secs(timeout));

    let inf = &cfg.inference;
    let cache_root = inf
        .cache_root
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_ROOT));
    let cache = Arc::new(SchemaCache::new(
        cache_root,
        Arc::new(SqliteSchemaGenerator::new()),
    ));

    let loader = get_loader(&inf.dataset_name, &inf.data_path, cache)?;
    let dataset_name = loader.name();
    // schema derivation is blocking rusqlite and filesystem work
    let records = {
        let (split, schema_type, use_cache) =
            (inf.split.clone(), inf.schema_type.clone(), inf.use_cache);
        tokio::task::spawn_blocking(move || loader.load(&split, &schema_type, use_cache)).await??
    };

    let mut runner = BatchRunner::new(Arc::new(engine), cfg.model.name.clone())
        .with_mode(mode)
        .with_parallel(cfg.settings.parallel.unwrap_or(1));
    if let Some(out) = inf.output.clone() {
        runner = runner.with_output(out);
    }

    let summary = runner.run(dataset_name, &inf.split, records).await?;

    eprintln!(
        "infer: {} records, {} generated, {} skipped",
        summary.total, summary.processed, summary.skipped
    );
    if let Some(path) = &summary.output_path {
        eprintln!("results: {}", path.display());
    }
    Ok(exit_codes::OK)
}

/// `providers:` names go through the registry; otherwise the `model:` block
/// is the only provider.
fn build_providers(cfg: &PipelineConfig) -> anyhow::Result<Vec<Arc<dyn LlmClient>>> {
    if cfg.providers.is_empty() {
        let client = providers::build_client(&cfg.model.name, &cfg.model.as_provider_spec())?;
        return Ok(vec![client]);
    }
    let registry_path = cfg
        .providers_config
        .as_deref()
        .ok_or_else(|| Error::config("`providers` is set but `providers_config` is missing"))?;
    let registry = load_providers_config(Path::new(registry_path))?;
    Ok(providers::resolve(&cfg.providers, &registry)?)
}

/// `critic: true` upgrades a single-provider run to critic mode.
fn effective_mode(cfg: &PipelineConfig) -> RunMode {
    match cfg.run_mode {
        RunMode::Single if cfg.critic => RunMode::Critic,
        m => m,
    }
}
