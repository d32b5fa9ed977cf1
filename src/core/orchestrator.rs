// src/core/orchestrator.rs — Generate / extract / verify / retry loop

use std::sync::Arc;
use std::time::Instant;

use super::extractor::extract_code;
use super::prompt::Prompt;
use super::types::*;
use crate::evaluator::{VerificationResult, Verifier};
use crate::infra::errors::CodeCraftError;
use crate::memory::Retriever;
use crate::provider::Generator;
use crate::util::preview_lines;

/// Correction text used when the verifier rejects code without saying why.
const UNEXPLAINED_REJECTION: &str = "Verifier rejected the code without details.";

/// Drives one instruction through repeated generate/extract/verify attempts.
///
/// Holds no per-run state, so a single instance may serve concurrent `run`
/// calls as long as its collaborators allow it.
pub struct Orchestrator {
    generator: Arc<dyn Generator>,
    retriever: Arc<dyn Retriever>,
    verifier: Arc<dyn Verifier>,
    config: AgentConfig,
    on_progress: Option<Box<dyn Fn(ProgressEvent) + Send + Sync>>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn Generator>,
        retriever: Arc<dyn Retriever>,
        verifier: Arc<dyn Verifier>,
        config: AgentConfig,
    ) -> Self {
        Self {
            generator,
            retriever,
            verifier,
            config,
            on_progress: None,
        }
    }

    /// Set a callback for progress events (used by CLI for live output).
    pub fn with_progress(mut self, f: impl Fn(ProgressEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(ref f) = self.on_progress {
            f(event);
        }
    }

    /// Run `instruction` for at most `max_retries` attempts.
    ///
    /// Errors only on invalid input or an unrenderable prompt template. Model
    /// and verifier faults are absorbed into attempts.
    pub async fn run(
        &self,
        instruction: &str,
        max_retries: u32,
    ) -> Result<RunResult, CodeCraftError> {
        if max_retries == 0 {
            return Err(CodeCraftError::InvalidRetryBudget(max_retries));
        }
        if instruction.trim().is_empty() {
            return Err(CodeCraftError::EmptyInstruction);
        }

        let start = Instant::now();
        let context = self
            .retriever
            .retrieve_relevant(instruction, self.config.retrieval_k)
            .await;
        tracing::debug!("Retrieved {} chars of context", context.len());
        self.emit(ProgressEvent::ContextRetrieved {
            chars: context.len(),
        });

        let mut prompt = match self.config.prompt_template.as_deref() {
            Some(template) => Prompt::from_template(
                template,
                instruction,
                &context,
                self.config.prompt_strategy,
            )?,
            None => Prompt::new(instruction, &context, self.config.prompt_strategy)?,
        };

        let mut attempts: Vec<Attempt> = Vec::with_capacity(max_retries as usize);
        let mut error_log = String::new();
        let mut last_candidate = String::new();

        for index in 0..max_retries {
            let attempt_no = index + 1;
            self.emit(ProgressEvent::AttemptStart {
                attempt: attempt_no,
                max_attempts: max_retries,
            });

            let previous_rejected = attempts
                .last()
                .and_then(|a| a.verification.as_ref())
                .is_some_and(|v| !v.valid);
            if previous_rejected {
                prompt.push_correction(&error_log);
                tracing::debug!(
                    "Attempt {}: prompt carries {} correction(s)",
                    attempt_no,
                    prompt.directive_count()
                );
            }

            let raw_output = self
                .generator
                .generate(&prompt.render(), &self.config.stop)
                .await;
            let code = extract_code(&raw_output);

            if code.is_empty() {
                tracing::debug!("Attempt {}: no code extracted", attempt_no);
                self.emit(ProgressEvent::ExtractionEmpty {
                    attempt: attempt_no,
                });
                attempts.push(Attempt {
                    index,
                    raw_output,
                    code,
                    verification: None,
                });
                continue;
            }

            self.emit(ProgressEvent::Extracted {
                attempt: attempt_no,
                preview: preview_lines(&code, 3),
            });
            last_candidate = code.clone();

            let verification = self.verifier.verify(&code).await;
            let valid = verification.valid;
            let score = verification.score;
            if !valid {
                error_log = rejection_text(&verification);
            }
            attempts.push(Attempt {
                index,
                raw_output,
                code,
                verification: Some(verification),
            });

            if valid {
                tracing::info!(
                    "Verified on attempt {}/{} ({:.1}s)",
                    attempt_no,
                    max_retries,
                    start.elapsed().as_secs_f64()
                );
                self.emit(ProgressEvent::Verified {
                    attempt: attempt_no,
                    score,
                });
                return Ok(RunResult {
                    outcome: Outcome::Verified,
                    code: last_candidate,
                    attempts,
                });
            }

            tracing::info!("Attempt {} rejected", attempt_no);
            self.emit(ProgressEvent::Rejected {
                attempt: attempt_no,
                errors: error_log.clone(),
            });
        }

        tracing::warn!(
            "No verified code after {} attempt(s) ({:.1}s)",
            max_retries,
            start.elapsed().as_secs_f64()
        );
        self.emit(ProgressEvent::Exhausted {
            attempts: max_retries,
        });
        Ok(RunResult {
            outcome: Outcome::Exhausted,
            code: last_candidate,
            attempts,
        })
    }
}

fn rejection_text(result: &VerificationResult) -> String {
    match result.errors.as_deref() {
        Some(e) if !e.trim().is_empty() => e.to_string(),
        _ => UNEXPLAINED_REJECTION.to_string(),
    }
}
