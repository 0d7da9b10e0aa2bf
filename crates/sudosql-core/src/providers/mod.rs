use crate::config::{ProviderSpec, ProvidersConfig};
use crate::errors::{Error, Result};
use std::sync::Arc;

pub mod llm;

use llm::fake::FakeClient;
use llm::ollama::OllamaClient;
use llm::openai::OpenAIClient;
use llm::LlmClient;

/// Builds one backend from its `{type, args}` entry.
pub fn build_client(name: &str, spec: &ProviderSpec) -> Result<Arc<dyn LlmClient>> {
    let args = &spec.args;
    match spec.kind.as_str() {
        "openai" => {
            let model = args.model.clone().unwrap_or_else(|| "gpt-4".to_string());
            let api_key = match &args.api_key {
                Some(k) => k.clone(),
                None => std::env::var("OPENAI_API_KEY").map_err(|_| {
                    Error::config(format!(
                        "provider '{}': OpenAI API key not provided; set OPENAI_API_KEY or args.api_key",
                        name
                    ))
                })?,
            };
            let mut client = OpenAIClient::new(model, api_key)
                .with_sampling(args.temperature, args.max_tokens);
            if let Some(url) = &args.base_url {
                client = client.with_base_url(url.clone());
            }
            Ok(Arc::new(client))
        }
        "ollama" => {
            let model = args.model.clone().ok_or_else(|| {
                Error::config(format!("provider '{}': ollama requires args.model", name))
            })?;
            Ok(Arc::new(
                OllamaClient::new(args.base_url.clone(), model)
                    .with_sampling(args.temperature, args.max_tokens),
            ))
        }
        "fake" => {
            let client = if !args.responses.is_empty() {
                FakeClient::cycle(args.responses.clone())
            } else {
                FakeClient::fixed(args.response.clone().unwrap_or_else(|| "SELECT 1".into()))
            };
            Ok(Arc::new(client.named(name)))
        }
        other => Err(Error::config(format!(
            "unknown provider type '{}' for provider '{}'",
            other, name
        ))),
    }
}

/// Resolves provider names against the registry, preserving order
/// (the first one is the primary).
pub fn resolve(names: &[String], registry: &ProvidersConfig) -> Result<Vec<Arc<dyn LlmClient>>> {
    if names.is_empty() {
        return Err(Error::config("at least one provider is required"));
    }
    names
        .iter()
        .map(|name| {
            let spec = registry.get(name).ok_or_else(|| {
                Error::config(format!("configuration for provider '{}' not found", name))
            })?;
            build_client(name, spec)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderArgs;

    fn registry() -> ProvidersConfig {
        let mut r = ProvidersConfig::new();
        r.insert(
            "dry".into(),
            ProviderSpec {
                kind: "fake".into(),
                args: ProviderArgs {
                    response: Some("SELECT 42".into()),
                    ..Default::default()
                },
            },
        );
        r.insert(
            "local".into(),
            ProviderSpec {
                kind: "ollama".into(),
                args: ProviderArgs {
                    model: Some("sqlcoder".into()),
                    ..Default::default()
                },
            },
        );
        r.insert(
            "hf".into(),
            ProviderSpec {
                kind: "huggingface".into(),
                args: ProviderArgs::default(),
            },
        );
        r
    }

    #[tokio::test]
    async fn test_resolve_in_order() {
        let clients = resolve(&["local".into(), "dry".into()], &registry()).unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].provider_name(), "ollama");
        assert_eq!(clients[0].model_name(), "sqlcoder");
        assert_eq!(clients[1].provider_name(), "dry");
        assert_eq!(clients[1].generate("anything").await.unwrap(), "SELECT 42");
    }

    #[test]
    fn test_resolve_errors() {
        let r = registry();
        let missing = resolve(&["gpt5".into()], &r).err().unwrap();
        assert!(missing.to_string().contains("provider 'gpt5' not found"));

        let unknown = resolve(&["hf".into()], &r).err().unwrap();
        assert!(unknown.to_string().contains("unknown provider type 'huggingface'"));

        assert!(resolve(&[], &r).err().unwrap().is_configuration());
    }
}
