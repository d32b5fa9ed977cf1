// src/provider/resolver.rs — Build a provider from a "provider/model" reference

use std::sync::Arc;

use super::google::GoogleProvider;
use super::ollama::OllamaProvider;
use super::openai_compat::OpenAICompatProvider;
use super::retry::RetryProvider;
use super::{ModelProvider, ModelRef};
use crate::infra::config::ModelConfig;
use crate::infra::errors::CodeCraftError;

/// OpenAI-compatible endpoints: (id, display name, API key env var, base URL).
const OPENAI_COMPAT_PROVIDERS: &[(&str, &str, &str, &str)] = &[
    ("openai", "OpenAI", "OPENAI_API_KEY", "https://api.openai.com/v1"),
    ("openrouter", "OpenRouter", "OPENROUTER_API_KEY", "https://openrouter.ai/api/v1"),
    ("groq", "Groq", "GROQ_API_KEY", "https://api.groq.com/openai/v1"),
    ("deepseek", "DeepSeek", "DEEPSEEK_API_KEY", "https://api.deepseek.com/v1"),
];

/// Gemini keys are accepted under either name.
const GOOGLE_KEY_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Resolve the provider for `model_ref` using process environment credentials.
/// The result is wrapped in a `RetryProvider`.
pub fn build_provider(
    model_ref: &ModelRef,
    config: &ModelConfig,
) -> Result<Arc<dyn ModelProvider>, CodeCraftError> {
    build_provider_with(model_ref, config, &|var| {
        std::env::var(var).ok().filter(|v| !v.trim().is_empty())
    })
}

/// Same as [`build_provider`] with an injectable environment lookup.
pub fn build_provider_with(
    model_ref: &ModelRef,
    config: &ModelConfig,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<Arc<dyn ModelProvider>, CodeCraftError> {
    let inner: Arc<dyn ModelProvider> = match model_ref.provider.as_str() {
        "google" | "gemini" => {
            let key = GOOGLE_KEY_VARS
                .iter()
                .find_map(|var| env(var))
                .ok_or_else(|| CodeCraftError::MissingCredential {
                    provider: "google".into(),
                    env_var: GOOGLE_KEY_VARS.join(" or "),
                })?;
            let mut provider = GoogleProvider::new(key);
            if let Some(ref url) = config.base_url {
                provider = provider.with_base_url(url.clone());
            }
            Arc::new(provider)
        }
        "ollama" => {
            let base_url = config.base_url.clone().or_else(|| env("OLLAMA_HOST"));
            Arc::new(OllamaProvider::new(base_url))
        }
        other => {
            let Some(&(id, name, env_var, default_url)) =
                OPENAI_COMPAT_PROVIDERS.iter().find(|(id, ..)| *id == other)
            else {
                return Err(CodeCraftError::UnknownProvider(other.to_string()));
            };
            let key = env(env_var).ok_or_else(|| CodeCraftError::MissingCredential {
                provider: id.into(),
                env_var: env_var.into(),
            })?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| default_url.to_string());
            Arc::new(OpenAICompatProvider::new(id, name, key, base_url))
        }
    };

    tracing::debug!(provider = inner.id(), model = %model_ref.model, "Provider resolved");
    Ok(Arc::new(RetryProvider::new(inner)))
}
