use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sudosql",
    version,
    about = "Text-to-SQL inference: schema cache, multi-provider orchestration, resumable batch runs"
)]
pub struct Cli {
    /// log output format (filter with SUDOSQL_LOG, e.g. SUDOSQL_LOG=sudosql_core=debug)
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Generate SQL for one question against a schema file
    Generate(GenerateArgs),
    /// Run batch inference over a dataset split
    Infer(InferArgs),
    /// Derive (or fetch from the cache) a database schema document
    Schema(SchemaArgs),
    /// Write sample infer.yaml and models.yaml
    Init(InitArgs),
    Version,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GenerateArgs {
    pub question: String,

    /// file containing the schema text given to the model
    pub schema_path: PathBuf,

    /// provider names from the providers config; the first is primary
    #[arg(long = "provider", required = true, num_args = 1..)]
    pub providers: Vec<String>,

    #[arg(long, default_value = "configs/models.yaml")]
    pub config: PathBuf,

    /// review the primary output with the primary provider acting as critic
    #[arg(long, conflicts_with = "voting")]
    pub use_critic: bool,

    /// majority vote across all providers
    #[arg(long)]
    pub voting: bool,

    #[arg(long, env = "SUDOSQL_TIMEOUT_SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_seconds: Option<u64>,
}

#[derive(clap::Args, Clone, Debug)]
pub struct InferArgs {
    #[arg(long, default_value = "infer.yaml")]
    pub config: PathBuf,

    /// reject unknown config keys instead of warning
    #[arg(long)]
    pub strict: bool,

    /// override inference.output.save_mode
    #[arg(long, value_parser = ["overwrite", "resume"])]
    pub save_mode: Option<String>,
}

#[derive(clap::Args, Clone, Debug)]
pub struct SchemaArgs {
    #[arg(long)]
    pub db_path: PathBuf,

    /// ddl-schema | ddl | column-list
    #[arg(long, default_value = "ddl-schema")]
    pub schema_type: String,

    /// write here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// serve from (and refresh) the schema cache; needs --dataset and --db-id
    #[arg(long, requires_all = ["dataset", "db_id"])]
    pub use_cache: bool,

    #[arg(long)]
    pub dataset: Option<String>,

    #[arg(long)]
    pub db_id: Option<String>,

    #[arg(long, default_value = sudosql_core::config::DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,
}

#[derive(clap::Args, Clone, Debug)]
pub struct InitArgs {
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,
}
