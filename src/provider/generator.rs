// src/provider/generator.rs — Prompt-in, text-out generation
//
// The retry loop only ever sees text. Provider failures are folded into the
// returned string so a failed call still flows through extraction and
// verification and costs one attempt like any other bad answer.

use std::sync::Arc;

use async_trait::async_trait;

use super::{ChatRequest, Message, ModelProvider};

/// Turns a prompt into raw model text. Never fails.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str, stop: &[String]) -> String;
}

/// `Generator` backed by a chat-style `ModelProvider`.
pub struct ProviderGenerator {
    provider: Arc<dyn ModelProvider>,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ProviderGenerator {
    pub fn new(provider: Arc<dyn ModelProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[async_trait]
impl Generator for ProviderGenerator {
    async fn generate(&self, prompt: &str, stop: &[String]) -> String {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: None,
            stop: stop.to_vec(),
        };

        match self.provider.chat(request).await {
            Ok(response) => {
                tracing::debug!(
                    provider = self.provider.id(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    "Generation complete"
                );
                response.content
            }
            Err(e) => {
                tracing::warn!(provider = self.provider.id(), "Generation failed: {}", e);
                error_text(self.provider.id(), &e.to_string())
            }
        }
    }
}

/// Text returned in place of a model answer when the call itself failed.
pub fn error_text(provider: &str, message: &str) -> String {
    format!("# ERROR {}: {}", provider.to_uppercase(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::errors::CodeCraftError;
    use crate::provider::{ChatResponse, StopReason, TokenUsage};
    use std::sync::Mutex;

    struct RecordingProvider {
        reply: Result<String, String>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    #[async_trait]
    impl ModelProvider for RecordingProvider {
        fn id(&self) -> &str {
            "mock"
        }

        fn name(&self) -> &str {
            "Mock"
        }

        async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, CodeCraftError> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(content) => Ok(ChatResponse {
                    content: content.clone(),
                    usage: TokenUsage::default(),
                    stop_reason: StopReason::EndTurn,
                }),
                Err(message) => Err(CodeCraftError::Provider {
                    provider: "mock".into(),
                    message: message.clone(),
                    retriable: false,
                }),
            }
        }
    }

    #[tokio::test]
    async fn test_forwards_prompt_and_settings() {
        let provider = Arc::new(RecordingProvider {
            reply: Ok("```python\nx = 1\n```".into()),
            seen: Mutex::new(vec![]),
        });
        let gen = ProviderGenerator::new(provider.clone(), "mock-model")
            .with_temperature(0.1)
            .with_max_tokens(2000);

        let out = gen.generate("write x", &["<|im_end|>".to_string()]).await;
        assert_eq!(out, "```python\nx = 1\n```");

        let seen = provider.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].model, "mock-model");
        assert_eq!(seen[0].messages[0].content, "write x");
        assert_eq!(seen[0].max_tokens, Some(2000));
        assert_eq!(seen[0].stop, vec!["<|im_end|>".to_string()]);
    }

    #[tokio::test]
    async fn test_provider_error_becomes_text() {
        let provider = Arc::new(RecordingProvider {
            reply: Err("HTTP 500".into()),
            seen: Mutex::new(vec![]),
        });
        let gen = ProviderGenerator::new(provider, "mock-model");

        let out = gen.generate("anything", &[]).await;
        assert!(out.starts_with("# ERROR MOCK:"));
        assert!(out.contains("HTTP 500"));
    }
}
