use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::llm::{LlmError, LlmProvider, OpenAiCompatibleProvider};

/// Provider families reachable through an OpenAI-compatible endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Provider {
    /// OpenAI API
    OpenAI,
    /// Ollama local models, served on `/v1`
    Ollama,
    /// Any other OpenAI-compatible server, addressed by base URL
    Custom(String),
}

impl Provider {
    /// Split a model identifier such as `ollama/llama3.1` into provider and model name.
    /// Identifiers without a known prefix are passed through unchanged.
    pub fn parse_model_id(model_id: &str, api_base: Option<&str>) -> (Provider, String) {
        if let Some(name) = model_id.strip_prefix("ollama/") {
            return (Provider::Ollama, name.to_string());
        }
        if let Some(name) = model_id.strip_prefix("openai/") {
            return (Provider::OpenAI, name.to_string());
        }
        match api_base {
            Some(base) => (Provider::Custom(base.to_string()), model_id.to_string()),
            None => (Provider::OpenAI, model_id.to_string()),
        }
    }

    /// Get the base URL for the provider
    pub fn get_base_url(&self) -> String {
        match self {
            Provider::OpenAI => "https://api.openai.com/v1".to_string(),
            Provider::Ollama => "http://localhost:11434/v1".to_string(),
            Provider::Custom(url) => url.clone(),
        }
    }
}

/// LLM connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// The provider to use
    pub provider: Provider,
    /// API key for the provider
    pub api_key: Option<String>,
    /// Custom base URL (overrides default for provider)
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn new(provider: Provider, api_key: Option<String>) -> Self {
        Self {
            provider,
            api_key,
            base_url: None,
        }
    }

    pub fn new_with_base_url(provider: Provider, api_key: Option<String>, base_url: String) -> Self {
        Self {
            provider,
            api_key,
            base_url: Some(base_url),
        }
    }

    /// Base URL the chat completions endpoint hangs off
    pub fn resolved_base_url(&self) -> String {
        let base = self
            .base_url
            .clone()
            .unwrap_or_else(|| self.provider.get_base_url());
        let base = base.trim_end_matches('/').to_string();

        // Ollama's native API lives at the root, the OpenAI-compatible one under /v1
        if self.provider == Provider::Ollama && !base.ends_with("/v1") {
            format!("{}/v1", base)
        } else {
            base
        }
    }
}

/// Builds LLM clients from connection settings
pub trait ProviderFactory: Send + Sync {
    fn create(&self, config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError>;
}

/// Factory producing HTTP clients for OpenAI-compatible servers
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpProviderFactory;

impl ProviderFactory for HttpProviderFactory {
    fn create(&self, config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
        let base_url = config.resolved_base_url();
        if base_url.is_empty() {
            return Err(LlmError::ConfigError("empty API base URL".to_string()));
        }
        Ok(Arc::new(OpenAiCompatibleProvider::new(base_url, config.api_key.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ollama_model_id() {
        let (provider, model) = Provider::parse_model_id("ollama/llama3.1", Some("http://localhost:11434"));
        assert_eq!(provider, Provider::Ollama);
        assert_eq!(model, "llama3.1");
    }

    #[test]
    fn test_parse_plain_model_id_uses_api_base() {
        let (provider, model) = Provider::parse_model_id("gpt-4o-mini", Some("https://openrouter.ai/api/v1"));
        assert_eq!(provider, Provider::Custom("https://openrouter.ai/api/v1".to_string()));
        assert_eq!(model, "gpt-4o-mini");

        let (provider, _) = Provider::parse_model_id("gpt-4o-mini", None);
        assert_eq!(provider, Provider::OpenAI);
    }

    #[test]
    fn test_ollama_base_url_gets_v1_suffix() {
        let config = LlmConfig::new_with_base_url(Provider::Ollama, None, "http://localhost:11434/".to_string());
        assert_eq!(config.resolved_base_url(), "http://localhost:11434/v1");

        let config = LlmConfig::new_with_base_url(Provider::Ollama, None, "http://gpu-box:11434/v1".to_string());
        assert_eq!(config.resolved_base_url(), "http://gpu-box:11434/v1");
    }

    #[test]
    fn test_default_base_urls() {
        assert_eq!(LlmConfig::new(Provider::OpenAI, None).resolved_base_url(), "https://api.openai.com/v1");
        assert_eq!(LlmConfig::new(Provider::Ollama, None).resolved_base_url(), "http://localhost:11434/v1");
    }

    #[test]
    fn test_http_factory_rejects_empty_base() {
        let config = LlmConfig::new(Provider::Custom(String::new()), None);
        assert!(HttpProviderFactory.create(&config).is_err());
    }
}
