// src/core/types.rs — Core domain types

use serde::{Deserialize, Serialize};

use super::prompt::PromptStrategy;
use crate::evaluator::VerificationResult;

/// Literal first line of an unverified result.
pub const FAILURE_MARKER: &str = "# FAILURE";

/// One generate → extract → verify cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Zero-based, `< max_retries`.
    pub index: u32,
    pub raw_output: String,
    /// Possibly empty.
    pub code: String,
    /// `None` when extraction was empty and verification was skipped.
    pub verification: Option<VerificationResult>,
}

impl Attempt {
    pub fn is_verified(&self) -> bool {
        self.verification.as_ref().is_some_and(|v| v.valid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Verified,
    Exhausted,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Verified => write!(f, "verified"),
            Outcome::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Result of a run.
///
/// `code` is the verified artifact, or on exhaustion the last non-empty
/// candidate (empty if every extraction was empty). Use [`RunResult::render`]
/// to obtain the text with the failure marker applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub outcome: Outcome,
    pub code: String,
    pub attempts: Vec<Attempt>,
}

impl RunResult {
    pub fn is_verified(&self) -> bool {
        self.outcome == Outcome::Verified
    }

    /// Verified code as-is; otherwise `# FAILURE` on its own line, then the code.
    pub fn render(&self) -> String {
        match self.outcome {
            Outcome::Verified => self.code.clone(),
            Outcome::Exhausted => format!("{FAILURE_MARKER}\n{}", self.code),
        }
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// True when `text` carries the failure marker as its first line.
pub fn is_failure_marked(text: &str) -> bool {
    text.lines().next() == Some(FAILURE_MARKER)
}

/// Orchestrator settings that are fixed for the lifetime of an instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub retrieval_k: usize,
    pub prompt_strategy: PromptStrategy,
    pub stop: Vec<String>,
    /// Replaces the built-in prompt template when set.
    pub prompt_template: Option<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            retrieval_k: 3,
            prompt_strategy: PromptStrategy::Accumulate,
            stop: Vec::new(),
            prompt_template: None,
        }
    }
}

/// Observational lifecycle events emitted during a run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    ContextRetrieved {
        chars: usize,
    },
    AttemptStart {
        attempt: u32,
        max_attempts: u32,
    },
    Extracted {
        attempt: u32,
        preview: String,
    },
    ExtractionEmpty {
        attempt: u32,
    },
    Verified {
        attempt: u32,
        score: Option<f32>,
    },
    Rejected {
        attempt: u32,
        errors: String,
    },
    Exhausted {
        attempts: u32,
    },
}
