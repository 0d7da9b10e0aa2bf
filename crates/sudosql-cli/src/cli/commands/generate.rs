use super::exit_codes;
use crate::cli::args::GenerateArgs;
use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use sudosql_core::config::{load_providers_config, DEFAULT_TIMEOUT_SECONDS};
use sudosql_core::critic::{Critic, CriticAgent};
use sudosql_core::engine::InferenceEngine;
use sudosql_core::model::RunMode;
use sudosql_core::providers;

pub async fn run(args: GenerateArgs) -> anyhow::Result<i32> {
    let schema = std::fs::read_to_string(&args.schema_path)
        .with_context(|| format!("failed to read schema file {}", args.schema_path.display()))?;

    let registry = load_providers_config(&args.config)?;
    let clients = providers::resolve(&args.providers, &registry)?;

    let mode = if args.use_critic {
        RunMode::Critic
    } else if args.voting {
        RunMode::Voting
    } else {
        RunMode::Single
    };

    let critic = if args.use_critic {
        Some(Arc::new(CriticAgent::new(clients[0].clone())) as Arc<dyn Critic>)
    } else {
        None
    };

    let timeout = args.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let engine = InferenceEngine::new(clients, critic)?.with_timeout(Duration::from_secs(timeout));

    tracing::debug!(
        event = "generate.start",
        mode = mode.as_str(),
        providers = ?args.providers,
        timeout_seconds = timeout,
    );

    let sql = engine.run_mode(mode, &args.question, &schema).await?;
    println!("{}", sql);
    Ok(exit_codes::OK)
}
