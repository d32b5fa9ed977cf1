// src/infra/errors.rs — Error types for CodeCraft

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodeCraftError {
    // Provider errors (retriable)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // User errors
    #[error("No credentials for provider '{provider}'. Set {env_var}.")]
    MissingCredential { provider: String, env_var: String },

    #[error("Unknown provider '{0}'. Expected one of: google, openai, openrouter, groq, deepseek, ollama.")]
    UnknownProvider(String),

    #[error("Retry budget must allow at least one attempt (got {0})")]
    InvalidRetryBudget(u32),

    #[error("Instruction is empty")]
    EmptyInstruction,

    // Infra
    #[error("Prompt template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CodeCraftError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            CodeCraftError::Provider {
                retriable: true,
                ..
            } | CodeCraftError::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retriable_classification() {
        let rl = CodeCraftError::RateLimited {
            provider: "google".into(),
            retry_after_ms: 100,
        };
        assert!(rl.is_retriable());

        let fatal = CodeCraftError::Provider {
            provider: "google".into(),
            message: "HTTP 401".into(),
            retriable: false,
        };
        assert!(!fatal.is_retriable());
        assert!(!CodeCraftError::InvalidRetryBudget(0).is_retriable());
    }

    #[test]
    fn test_missing_credential_message_names_env_var() {
        let e = CodeCraftError::MissingCredential {
            provider: "google".into(),
            env_var: "GEMINI_API_KEY".into(),
        };
        assert!(e.to_string().contains("GEMINI_API_KEY"));
    }
}
