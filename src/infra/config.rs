// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::prompt::PromptStrategy;
use crate::evaluator::static_analysis::SecurityRule;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub agent: AgentSection,

    #[serde(default)]
    pub verifier: VerifierConfig,

    #[serde(default)]
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// "provider/model", e.g. "google/gemini-2.5-flash"
    pub default: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Override for OpenAI-compatible or Ollama endpoints.
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            default: "google/gemini-2.5-flash".into(),
            temperature: 0.1,
            max_tokens: 2000,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSection {
    pub max_retries: u32,
    pub retrieval_k: usize,
    pub prompt_strategy: PromptStrategy,
    pub stop: Vec<String>,
    pub prompt_template: Option<PathBuf>,
}

impl Default for AgentSection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retrieval_k: 3,
            prompt_strategy: PromptStrategy::default(),
            stop: Vec::new(),
            prompt_template: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub python: String,
    pub syntax_check: bool,
    /// Accept candidates unchecked when the interpreter cannot run.
    pub allow_missing_interpreter: bool,
    pub timeout_seconds: u64,
    pub rules: Vec<SecurityRule>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            python: "python3".into(),
            syntax_check: true,
            allow_missing_interpreter: false,
            timeout_seconds: 10,
            rules: SecurityRule::defaults(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Defaults to `<data dir>/codecraft.db`.
    pub db_path: Option<PathBuf>,
}

impl MemoryConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(paths::db_path)
    }
}

impl Config {
    /// Load config from file, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
