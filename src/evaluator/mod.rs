// src/evaluator/mod.rs — Verification of candidate code

pub mod static_analysis;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Verdict on one candidate artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub valid: bool,
    pub errors: Option<String>,
    pub score: Option<f32>,
}

impl VerificationResult {
    pub fn pass(score: f32) -> Self {
        Self {
            valid: true,
            errors: None,
            score: Some(score),
        }
    }

    pub fn fail(errors: impl Into<String>, score: f32) -> Self {
        Self {
            valid: false,
            errors: Some(errors.into()),
            score: Some(score),
        }
    }
}

/// Anything that can accept or reject a code artifact.
///
/// Implementations report problems through `VerificationResult::errors`
/// rather than failing the call; the text is fed back to the model verbatim.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, code: &str) -> VerificationResult;
}
