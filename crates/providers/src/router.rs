//! Client selection: builds the configured model client.

use std::sync::Arc;
use toolpilot_config::AppConfig;
use toolpilot_core::error::ModelError;
use toolpilot_core::provider::ModelClient;

use crate::anthropic::AnthropicClient;
use crate::openai_compat::OpenAiCompatClient;

/// Build the model client named by `config.provider`.
///
/// `"anthropic"` gets the native Messages client; every other name is treated
/// as an OpenAI-compatible endpoint.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn ModelClient>, ModelError> {
    let provider = config.provider.as_str();
    let api_key = match config.api_key.as_deref() {
        Some(key) if !key.is_empty() => key.to_string(),
        _ if !requires_api_key(provider) => String::new(),
        _ => {
            return Err(ModelError::NotConfigured(format!(
                "no API key for provider '{provider}'; set TOOLPILOT_API_KEY or api_key in the config file"
            )));
        }
    };

    let client: Arc<dyn ModelClient> = if provider == "anthropic" {
        let mut client = AnthropicClient::new(api_key)?;
        if let Some(url) = &config.api_url {
            client = client.with_base_url(url);
        }
        Arc::new(client)
    } else {
        let base_url = config
            .api_url
            .clone()
            .or_else(|| default_base_url(provider).map(String::from))
            .ok_or_else(|| {
                ModelError::NotConfigured(format!(
                    "unknown provider '{provider}'; set api_url to its OpenAI-compatible endpoint"
                ))
            })?;
        Arc::new(OpenAiCompatClient::new(provider, base_url, api_key)?)
    };

    tracing::debug!(provider, model = %config.model, "Model client ready");
    Ok(client)
}

/// Local servers accept anonymous requests.
fn requires_api_key(provider: &str) -> bool {
    !matches!(provider, "ollama" | "vllm" | "llamacpp" | "llama.cpp")
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    Some(match provider_name {
        "openai" => "https://api.openai.com/v1",
        "openrouter" => "https://openrouter.ai/api/v1",
        "ollama" => "http://localhost:11434/v1",
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "together" => "https://api.together.xyz/v1",
        "fireworks" => "https://api.fireworks.ai/inference/v1",
        "vllm" => "http://localhost:8000/v1",
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1",
        _ => return None,
    })
}
