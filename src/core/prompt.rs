// src/core/prompt.rs — Prompt construction and retry feedback

use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};

use crate::infra::errors::CodeCraftError;

/// Built-in prompt: ChatML framing, a silent-expert system role, the retrieved
/// context and the task, ending on an open assistant turn.
pub const DEFAULT_TEMPLATE: &str = r#"<|im_start|>system
You are a silent Python expert. You answer only with code.
<|im_end|>
<|im_start|>user

CODE CONTEXT:
{{ context if context else "(no stored code is relevant to this task)" }}

TASK:
{{ instruction }}

STRICT RULES:
1. Return ONLY valid Python code.
2. NO explanations, NO text before or after.
3. Wrap the code in a Markdown fence: ```python ... ```.
4. The code must be complete (imports included).

<|im_end|>
<|im_start|>assistant
"#;

/// How correction directives are carried across attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptStrategy {
    /// Every directive stays in the prompt for the rest of the run.
    #[default]
    Accumulate,
    /// Only the newest directive is sent; the prompt stays bounded.
    LatestError,
}

/// Correction directive appended after a rejected attempt.
pub fn correction_directive(errors: &str) -> String {
    format!("The previous code had errors:\n{errors}\nFix the code.\n")
}

/// The prompt for one run: a fixed base plus the directives collected so far.
#[derive(Debug, Clone)]
pub struct Prompt {
    base: String,
    directives: Vec<String>,
    strategy: PromptStrategy,
}

impl Prompt {
    /// Render the built-in template.
    pub fn new(
        instruction: &str,
        context: &str,
        strategy: PromptStrategy,
    ) -> Result<Self, CodeCraftError> {
        Self::from_template(DEFAULT_TEMPLATE, instruction, context, strategy)
    }

    /// Render a caller-supplied template. It sees `instruction` and `context`.
    pub fn from_template(
        template: &str,
        instruction: &str,
        context: &str,
        strategy: PromptStrategy,
    ) -> Result<Self, CodeCraftError> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        let base = env.render_str(template, context! { instruction, context })?;
        Ok(Self {
            base,
            directives: Vec::new(),
            strategy,
        })
    }

    pub fn push_correction(&mut self, errors: &str) {
        self.directives.push(correction_directive(errors));
    }

    pub fn directive_count(&self) -> usize {
        self.directives.len()
    }

    /// Text sent to the generator for the current attempt.
    pub fn render(&self) -> String {
        let mut out = self.base.clone();
        match self.strategy {
            PromptStrategy::Accumulate => {
                for d in &self.directives {
                    out.push_str(d);
                }
            }
            PromptStrategy::LatestError => {
                if let Some(d) = self.directives.last() {
                    out.push_str(d);
                }
            }
        }
        out
    }
}
