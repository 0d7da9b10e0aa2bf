use crate::errors::{Error, Result};
use crate::model::{OutputConfig, RunMode};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

pub mod path_resolver;

use path_resolver::PathResolver;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_CACHE_ROOT: &str = "cache/schemas";

/// Top-level pipeline file (`sudosql infer --config infer.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    pub model: ModelConfig,
    /// Named provider registry; when set, `providers` are looked up in it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub providers_config: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<String>,
    #[serde(default)]
    pub critic: bool,
    #[serde(default)]
    pub run_mode: RunMode,
    #[serde(default)]
    pub settings: Settings,
    pub inference: InferenceConfig,
}

fn default_mode() -> String {
    "infer".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    #[serde(default = "default_provider_type")]
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_provider_type() -> String {
    "openai".into()
}

impl ModelConfig {
    /// The provider entry implied by `model:` when no registry is used.
    pub fn as_provider_spec(&self) -> ProviderSpec {
        ProviderSpec {
            kind: self.provider.clone(),
            args: ProviderArgs {
                model: Some(self.name.clone()),
                base_url: self.base_url.clone(),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub dataset_name: String,
    pub data_path: String,
    pub split: String,
    pub schema_type: String,
    #[serde(default = "default_true")]
    pub use_cache: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

fn default_true() -> bool {
    true
}

/// `configs/models.yaml`: provider name -> `{type, args}`.
pub type ProvidersConfig = BTreeMap<String, ProviderSpec>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: ProviderArgs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProviderArgs {
    #[serde(default, alias = "model_name", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// `fake` only: fixed response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    /// `fake` only: responses cycled per call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub responses: Vec<String>,
}

pub fn load_pipeline_config(path: &Path, strict: bool) -> Result<PipelineConfig> {
    let mut cfg: PipelineConfig = read_yaml(path, strict)?;

    if cfg.mode != "infer" {
        return Err(Error::config(format!(
            "unsupported mode '{}' in {} (only 'infer' is executable; training modes are not part of this tool)",
            cfg.mode,
            path.display()
        )));
    }

    let inf = &cfg.inference;
    for (field, value) in [
        ("inference.dataset_name", &inf.dataset_name),
        ("inference.split", &inf.split),
        ("inference.schema_type", &inf.schema_type),
        ("model.name", &cfg.model.name),
    ] {
        if value.trim().is_empty() {
            return Err(Error::config(format!(
                "{} must not be empty (file: {})",
                field,
                path.display()
            )));
        }
    }

    if cfg.settings.parallel == Some(0) {
        return Err(Error::config("settings.parallel must be at least 1"));
    }
    if cfg.settings.timeout_seconds == Some(0) {
        return Err(Error::config("settings.timeout_seconds must be at least 1"));
    }

    normalize_paths(&mut cfg, path);
    Ok(cfg)
}

pub fn load_providers_config(path: &Path) -> Result<ProvidersConfig> {
    read_yaml(path, false)
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path, strict: bool) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::config(format!("failed to read config {}: {}", path.display(), e)))?;

    let mut ignored_keys = BTreeSet::new();
    let deserializer = serde_yaml::Deserializer::from_str(&raw);

    let cfg: T = serde_ignored::deserialize(deserializer, |p| {
        ignored_keys.insert(p.to_string());
    })
    .map_err(|e| Error::config(format!("failed to parse YAML {}: {}", path.display(), e)))?;

    // YAML anchors and extension keys are allowed.
    let meaningful: Vec<_> = ignored_keys
        .iter()
        .filter(|k| !k.starts_with('_') && !k.starts_with("x-"))
        .collect();

    if !meaningful.is_empty() {
        if strict {
            return Err(Error::config(format!(
                "unknown fields detected in strict mode: {:?} (file: {})",
                meaningful,
                path.display()
            )));
        }
        tracing::warn!(
            event = "config.unknown_fields",
            file = %path.display(),
            fields = ?meaningful,
            "ignored unknown config fields"
        );
    }

    Ok(cfg)
}

fn normalize_paths(cfg: &mut PipelineConfig, config_path: &Path) {
    let r = PathResolver::new(config_path);
    r.resolve_str(&mut cfg.inference.data_path);
    r.resolve_opt_str(&mut cfg.inference.cache_root);
    r.resolve_opt_str(&mut cfg.providers_config);
    if let Some(out) = cfg.inference.output.as_mut() {
        r.resolve_path(&mut out.save_path);
    }
}

pub const SAMPLE_PIPELINE_CONFIG: &str = r#"mode: infer
model:
  name: gpt-4o-mini
  provider: openai
providers_config: models.yaml
providers: [gpt4o-mini]
run_mode: single
settings:
  timeout_seconds: 120
  parallel: 1
inference:
  dataset_name: spider
  data_path: ./data/spider
  split: dev
  schema_type: ddl-schema
  use_cache: true
  output:
    save_path: results
    save_mode: resume
"#;

pub const SAMPLE_PROVIDERS_CONFIG: &str = r#"gpt4o-mini:
  type: openai
  args:
    model: gpt-4o-mini
llama:
  type: ollama
  args:
    model: llama3.2
    base_url: http://localhost:11434
dry-run:
  type: fake
  args:
    response: "SELECT 1"
"#;

/// Writes `content` to `path` unless a file already exists there.
/// Returns whether a file was created.
pub fn write_sample_config(path: &Path, content: &str) -> Result<bool> {
    use crate::errors::StorageContext;

    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).at_path(parent)?;
    }
    std::fs::write(path, content).at_path(path)?;
    Ok(true)
}

/// Writes `infer.yaml` and `models.yaml` into `dir`, skipping existing files.
/// Returns `(path, created)` for each.
pub fn write_sample_configs(dir: &Path) -> Result<Vec<(PathBuf, bool)>> {
    [
        ("infer.yaml", SAMPLE_PIPELINE_CONFIG),
        ("models.yaml", SAMPLE_PROVIDERS_CONFIG),
    ]
    .into_iter()
    .map(|(name, content)| {
        let path = dir.join(name);
        let created = write_sample_config(&path, content)?;
        Ok((path, created))
    })
    .collect()
}
