// src/evaluator/static_analysis.rs — Built-in Python static analysis
//
// Stages, in order:
//   1. Substance: reject candidates made only of comments and blank lines
//      (this is also what a provider error folded into text looks like).
//   2. Syntax: compile the candidate with the local Python interpreter.
//   3. Security: substring rules for dangerous calls (eval/exec by default).
// An interpreter that cannot run or times out fails stage 2 unless
// `allow_missing_interpreter` is set.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{VerificationResult, Verifier};
use crate::infra::config::VerifierConfig;

const SCORE_SYNTAX_ERROR: f32 = 0.0;
const SCORE_SECURITY_ISSUE: f32 = 4.0;
const SCORE_CLEAN: f32 = 10.0;

/// Filename the candidate is compiled under, so its traceback frames can be
/// told apart from the driver script's.
const CANDIDATE_FILENAME: &str = "<candidate>";

const COMPILE_SCRIPT: &str =
    "import sys; compile(sys.stdin.read(), '<candidate>', 'exec')";

/// A substring rule; fires when any pattern occurs in the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityRule {
    pub id: String,
    pub patterns: Vec<String>,
    pub message: String,
}

impl SecurityRule {
    pub fn defaults() -> Vec<Self> {
        vec![Self {
            id: "CWE-95".into(),
            patterns: vec!["eval(".into(), "exec(".into()],
            message: "Usage of eval/exec detected.".into(),
        }]
    }

    fn matches(&self, code: &str) -> bool {
        self.patterns.iter().any(|p| code.contains(p.as_str()))
    }
}

/// Verifier for Python candidates.
pub struct PythonStaticAnalyzer {
    python: String,
    syntax_check: bool,
    allow_missing_interpreter: bool,
    timeout: Duration,
    rules: Vec<SecurityRule>,
}

impl Default for PythonStaticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonStaticAnalyzer {
    pub fn new() -> Self {
        Self::from_config(&VerifierConfig::default())
    }

    pub fn from_config(config: &VerifierConfig) -> Self {
        Self {
            python: config.python.clone(),
            syntax_check: config.syntax_check,
            allow_missing_interpreter: config.allow_missing_interpreter,
            timeout: Duration::from_secs(config.timeout_seconds),
            rules: config.rules.clone(),
        }
    }

    pub fn with_syntax_check(mut self, enabled: bool) -> Self {
        self.syntax_check = enabled;
        self
    }

    pub fn with_allow_missing_interpreter(mut self, allow: bool) -> Self {
        self.allow_missing_interpreter = allow;
        self
    }

    pub fn with_rules(mut self, rules: Vec<SecurityRule>) -> Self {
        self.rules = rules;
        self
    }

    /// Messages for every rule that fires, as `"<id>: <message>"`.
    pub fn scan_security(&self, code: &str) -> Vec<String> {
        self.rules
            .iter()
            .filter(|r| r.matches(code))
            .map(|r| format!("{}: {}", r.id, r.message))
            .collect()
    }

    /// Compile `code` with the configured interpreter. The stdin write and
    /// the wait share one timeout.
    async fn check_syntax(&self, code: &str) -> SyntaxCheck {
        let child = Command::new(&self.python)
            .args(["-c", COMPILE_SCRIPT])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(c) => c,
            Err(e) => {
                return SyntaxCheck::Unavailable(format!("cannot start {}: {}", self.python, e))
            }
        };

        let stdin = child.stdin.take();
        let run = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(code.as_bytes()).await?;
            }
            child.wait_with_output().await
        };

        let output = match tokio::time::timeout(self.timeout, run).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return SyntaxCheck::Unavailable(format!("{} failed to run: {}", self.python, e))
            }
            Err(_) => {
                return SyntaxCheck::Unavailable(format!(
                    "{} timed out after {}s",
                    self.python,
                    self.timeout.as_secs()
                ))
            }
        };

        if output.status.success() {
            SyntaxCheck::Passed
        } else {
            SyntaxCheck::Failed(parse_python_error(&String::from_utf8_lossy(&output.stderr)))
        }
    }
}

enum SyntaxCheck {
    Passed,
    Failed(String),
    /// The interpreter could not give a verdict.
    Unavailable(String),
}

#[async_trait]
impl Verifier for PythonStaticAnalyzer {
    async fn verify(&self, code: &str) -> VerificationResult {
        if !has_statements(code) {
            return VerificationResult::fail(
                "No executable statements: the candidate is empty or only comments.",
                SCORE_SYNTAX_ERROR,
            );
        }

        if self.syntax_check {
            match self.check_syntax(code).await {
                SyntaxCheck::Passed => {}
                SyntaxCheck::Failed(error) => {
                    tracing::debug!(%error, "Candidate failed to compile");
                    return VerificationResult::fail(error, SCORE_SYNTAX_ERROR);
                }
                SyntaxCheck::Unavailable(reason) if self.allow_missing_interpreter => {
                    tracing::warn!("Syntax check skipped: {}", reason);
                }
                SyntaxCheck::Unavailable(reason) => {
                    tracing::warn!("Syntax check unavailable: {}", reason);
                    return VerificationResult::fail(
                        format!("Syntax check unavailable: {reason}"),
                        SCORE_SYNTAX_ERROR,
                    );
                }
            }
        }

        let issues = self.scan_security(code);
        if !issues.is_empty() {
            return VerificationResult::fail(issues.join("\n"), SCORE_SECURITY_ISSUE);
        }

        VerificationResult::pass(SCORE_CLEAN)
    }
}

/// At least one line that is neither blank nor a `#` comment.
fn has_statements(code: &str) -> bool {
    code.lines().map(str::trim).any(|l| !l.is_empty() && !l.starts_with('#'))
}

/// Condense a Python traceback to its final line plus the candidate line number.
///
/// ```text
///   File "<candidate>", line 2
///     def f(
///          ^
/// SyntaxError: '(' was never closed
/// ```
/// becomes `SyntaxError: '(' was never closed (line 2)`.
pub fn parse_python_error(stderr: &str) -> String {
    let last = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .next_back()
        .unwrap_or("SyntaxError: compilation failed");

    let frame_prefix = format!("File \"{CANDIDATE_FILENAME}\", line ");
    let line_no = stderr.lines().rev().find_map(|l| {
        let rest = l.trim().strip_prefix(frame_prefix.as_str())?;
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        (!digits.is_empty()).then_some(digits)
    });

    match line_no {
        Some(n) => format!("{last} (line {n})"),
        None => last.to_string(),
    }
}
