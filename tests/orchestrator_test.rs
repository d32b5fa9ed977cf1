// tests/orchestrator_test.rs — Integration test: retry loop with mock collaborators

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use codecraft::core::orchestrator::Orchestrator;
use codecraft::core::prompt::PromptStrategy;
use codecraft::core::types::{AgentConfig, Outcome, ProgressEvent, FAILURE_MARKER};
use codecraft::evaluator::{VerificationResult, Verifier};
use codecraft::infra::errors::CodeCraftError;
use codecraft::memory::{Metadata, Retriever};
use codecraft::provider::Generator;

/// Replays canned responses in order, repeating the last one, and records
/// every prompt it receives.
struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    prompts: Mutex<Vec<String>>,
    stops: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGenerator {
    fn new(responses: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            last: Mutex::new(String::new()),
            prompts: Mutex::new(Vec::new()),
            stops: Mutex::new(Vec::new()),
        })
    }

    fn always(response: &str) -> Arc<Self> {
        Self::new(&[response])
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, stop: &[String]) -> String {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.stops.lock().unwrap().push(stop.to_vec());
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.responses.lock().unwrap().pop_front() {
            *last = next;
        }
        last.clone()
    }
}

/// Fixed context; records queries.
struct StaticRetriever {
    context: String,
    queries: Mutex<Vec<(String, usize)>>,
}

impl StaticRetriever {
    fn new(context: &str) -> Arc<Self> {
        Arc::new(Self {
            context: context.into(),
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve_relevant(&self, query: &str, k: usize) -> String {
        self.queries.lock().unwrap().push((query.to_string(), k));
        self.context.clone()
    }

    async fn add_code_artifact(
        &self,
        _code: &str,
        _metadata: &Metadata,
    ) -> Result<usize, CodeCraftError> {
        Ok(0)
    }
}

/// Rejects code containing a marker substring, accepts everything else.
struct MarkerVerifier {
    marker: Option<&'static str>,
    errors: Option<&'static str>,
    seen: Mutex<Vec<String>>,
}

impl MarkerVerifier {
    fn accept_all() -> Arc<Self> {
        Arc::new(Self {
            marker: None,
            errors: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn reject_all(errors: &'static str) -> Arc<Self> {
        Self::rejecting("", Some(errors))
    }

    fn rejecting(marker: &'static str, errors: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            marker: Some(marker),
            errors,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Verifier for MarkerVerifier {
    async fn verify(&self, code: &str) -> VerificationResult {
        self.seen.lock().unwrap().push(code.to_string());
        match self.marker {
            Some(m) if code.contains(m) => VerificationResult {
                valid: false,
                errors: self.errors.map(String::from),
                score: Some(0.0),
            },
            _ => VerificationResult::pass(10.0),
        }
    }
}

fn orchestrator(
    generator: Arc<ScriptedGenerator>,
    verifier: Arc<MarkerVerifier>,
) -> Orchestrator {
    Orchestrator::new(
        generator,
        StaticRetriever::new(""),
        verifier,
        AgentConfig::default(),
    )
}

#[tokio::test]
async fn test_first_attempt_verified() {
    let gen = ScriptedGenerator::always("```python\ndef f(): return 1\n```");
    let verifier = MarkerVerifier::accept_all();
    let orch = orchestrator(gen.clone(), verifier.clone());

    let result = orch.run("write f", 3).await.unwrap();

    assert_eq!(result.outcome, Outcome::Verified);
    assert_eq!(result.code, "def f(): return 1");
    assert_eq!(result.to_string(), "def f(): return 1");
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(gen.calls(), 1);
    assert_eq!(verifier.calls(), 1);
}

#[tokio::test]
async fn test_error_fed_back_then_verified() {
    let gen = ScriptedGenerator::new(&[
        "```python\ndef run(x):\n    return eval(x)\n```",
        "```python\ndef run(x):\n    return int(x)\n```",
    ]);
    let verifier = MarkerVerifier::rejecting("eval(", Some("CWE-95: Usage of eval/exec detected."));
    let orch = orchestrator(gen.clone(), verifier.clone());

    let result = orch.run("parse a number", 5).await.unwrap();

    assert!(result.is_verified());
    assert_eq!(result.code, "def run(x):\n    return int(x)");
    assert_eq!(result.attempts.len(), 2);

    let prompts = gen.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("CWE-95"));
    assert!(prompts[1].contains("CWE-95: Usage of eval/exec detected."));
    assert!(prompts[1].starts_with(&prompts[0]));
}

#[tokio::test]
async fn test_unparseable_prose_exhausts_with_marker() {
    let gen = ScriptedGenerator::new(&[
        "I cannot help with that right now.",
        "Sorry, still nothing useful here.",
    ]);
    let verifier = MarkerVerifier::reject_all("not python");
    let orch = orchestrator(gen.clone(), verifier);

    let result = orch.run("do something", 2).await.unwrap();

    assert_eq!(result.outcome, Outcome::Exhausted);
    assert_eq!(result.code, "Sorry, still nothing useful here.");
    assert_eq!(
        result.render(),
        format!("{}\nSorry, still nothing useful here.", FAILURE_MARKER)
    );
    assert_eq!(gen.calls(), 2);
}

#[tokio::test]
async fn test_never_exceeds_budget() {
    for n in 1..=4u32 {
        let gen = ScriptedGenerator::always("```\nbad()\n```");
        let orch = orchestrator(gen.clone(), MarkerVerifier::reject_all("nope"));
        let result = orch.run("task", n).await.unwrap();
        assert_eq!(gen.calls(), n as usize);
        assert_eq!(result.attempts.len(), n as usize);
        let indices: Vec<u32> = result.attempts.iter().map(|a| a.index).collect();
        assert_eq!(indices, (0..n).collect::<Vec<_>>());
    }
}

#[tokio::test]
async fn test_zero_budget_rejected_before_any_call() {
    let gen = ScriptedGenerator::always("```\nx = 1\n```");
    let retriever = StaticRetriever::new("ctx");
    let orch = Orchestrator::new(
        gen.clone(),
        retriever.clone(),
        MarkerVerifier::accept_all(),
        AgentConfig::default(),
    );

    let err = orch.run("task", 0).await.unwrap_err();
    assert!(matches!(err, CodeCraftError::InvalidRetryBudget(0)));
    assert_eq!(gen.calls(), 0);
    assert!(retriever.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_blank_instruction_rejected() {
    let gen = ScriptedGenerator::always("```\nx = 1\n```");
    let orch = orchestrator(gen.clone(), MarkerVerifier::accept_all());
    let err = orch.run("  \n", 3).await.unwrap_err();
    assert!(matches!(err, CodeCraftError::EmptyInstruction));
    assert_eq!(gen.calls(), 0);
}

#[tokio::test]
async fn test_empty_extraction_skips_verify_and_keeps_error_log() {
    let gen = ScriptedGenerator::new(&[
        "```python\nx = eval('1')\n```",
        "```python\n```",
        "```python\nx = 1\n```",
    ]);
    let verifier = MarkerVerifier::rejecting("eval(", Some("E-FIRST"));
    let orch = orchestrator(gen.clone(), verifier.clone());

    let result = orch.run("assign x", 3).await.unwrap();

    assert!(result.is_verified());
    assert_eq!(result.attempts.len(), 3);
    assert!(result.attempts[1].code.is_empty());
    assert!(result.attempts[1].verification.is_none());
    // Verifier never saw the empty candidate.
    assert_eq!(verifier.calls(), 2);

    let prompts = gen.prompts();
    // Directive added once after attempt 1; the empty attempt adds nothing.
    assert_eq!(prompts[1].matches("E-FIRST").count(), 1);
    assert_eq!(prompts[2], prompts[1]);
}

#[tokio::test]
async fn test_all_extractions_empty_gives_marked_empty_result() {
    let gen = ScriptedGenerator::always("```\n```");
    let verifier = MarkerVerifier::accept_all();
    let orch = orchestrator(gen.clone(), verifier.clone());

    let result = orch.run("task", 3).await.unwrap();

    assert_eq!(result.outcome, Outcome::Exhausted);
    assert_eq!(result.code, "");
    assert_eq!(result.render(), format!("{}\n", FAILURE_MARKER));
    assert_eq!(verifier.calls(), 0);
    assert_eq!(gen.calls(), 3);
}

#[tokio::test]
async fn test_exhaustion_keeps_last_non_empty_candidate() {
    let gen = ScriptedGenerator::new(&["```\nfirst = 1\n```", "```\nsecond = 2\n```", "```\n```"]);
    let orch = orchestrator(gen, MarkerVerifier::reject_all("bad"));
    let result = orch.run("task", 3).await.unwrap();
    assert_eq!(result.code, "second = 2");
    assert_eq!(result.to_string(), "# FAILURE\nsecond = 2");
}

#[tokio::test]
async fn test_accumulate_keeps_every_directive() {
    let gen = ScriptedGenerator::new(&["```\na()\n```", "```\nb()\n```", "```\nc()\n```"]);
    let verifier = MarkerVerifier::reject_all("REJECTED");
    let orch = orchestrator(gen.clone(), verifier);
    orch.run("task", 3).await.unwrap();

    let prompts = gen.prompts();
    assert_eq!(prompts[0].matches("REJECTED").count(), 0);
    assert_eq!(prompts[1].matches("REJECTED").count(), 1);
    assert_eq!(prompts[2].matches("REJECTED").count(), 2);
    assert!(prompts[2].starts_with(&prompts[1]));
}

#[tokio::test]
async fn test_latest_error_strategy_bounds_prompt() {
    let gen = ScriptedGenerator::new(&["```\na()\n```", "```\nb()\n```", "```\nc()\n```"]);
    let config = AgentConfig {
        prompt_strategy: PromptStrategy::LatestError,
        ..AgentConfig::default()
    };
    let orch = Orchestrator::new(
        gen.clone(),
        StaticRetriever::new(""),
        MarkerVerifier::reject_all("REJECTED"),
        config,
    );
    orch.run("task", 3).await.unwrap();

    let prompts = gen.prompts();
    assert_eq!(prompts[1].matches("REJECTED").count(), 1);
    assert_eq!(prompts[2].matches("REJECTED").count(), 1);
    assert_eq!(prompts[1].len(), prompts[2].len());
}

#[tokio::test]
async fn test_rejection_without_errors_uses_fallback_text() {
    let gen = ScriptedGenerator::new(&["```\nbad = 1\n```", "```\ngood = 1\n```"]);
    let verifier = MarkerVerifier::rejecting("bad", None);
    let orch = orchestrator(gen.clone(), verifier);
    let result = orch.run("task", 2).await.unwrap();
    assert!(result.is_verified());
    assert!(gen.prompts()[1].contains("without details"));
}

#[tokio::test]
async fn test_context_and_stop_sequences_forwarded() {
    let gen = ScriptedGenerator::always("```\nx = 1\n```");
    let retriever = StaticRetriever::new("# pricing.py::calculate_price\ndef calculate_price(): ...");
    let config = AgentConfig {
        retrieval_k: 5,
        stop: vec!["<|im_end|>".into()],
        ..AgentConfig::default()
    };
    let orch = Orchestrator::new(
        gen.clone(),
        retriever.clone(),
        MarkerVerifier::accept_all(),
        config,
    );
    orch.run("reuse calculate_price", 1).await.unwrap();

    assert_eq!(
        retriever.queries.lock().unwrap().as_slice(),
        &[("reuse calculate_price".to_string(), 5)]
    );
    assert!(gen.prompts()[0].contains("def calculate_price(): ..."));
    assert!(gen.prompts()[0].contains("reuse calculate_price"));
    assert_eq!(gen.stops.lock().unwrap()[0], vec!["<|im_end|>".to_string()]);
}

#[tokio::test]
async fn test_custom_template() {
    let gen = ScriptedGenerator::always("```\nx = 1\n```");
    let config = AgentConfig {
        prompt_template: Some("TASK={{ instruction }}\n".into()),
        ..AgentConfig::default()
    };
    let orch = Orchestrator::new(
        gen.clone(),
        StaticRetriever::new(""),
        MarkerVerifier::accept_all(),
        config,
    );
    orch.run("hello", 1).await.unwrap();
    assert_eq!(gen.prompts()[0], "TASK=hello\n");
}

#[tokio::test]
async fn test_progress_events_in_order() {
    let gen = ScriptedGenerator::new(&["```\nbad = 1\n```", "```\ngood = 1\n```"]);
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let orch = orchestrator(gen, MarkerVerifier::rejecting("bad", Some("E")))
        .with_progress(move |e: ProgressEvent| {
            let tag = match e {
                ProgressEvent::ContextRetrieved { .. } => "context",
                ProgressEvent::AttemptStart { .. } => "start",
                ProgressEvent::Extracted { .. } => "extracted",
                ProgressEvent::ExtractionEmpty { .. } => "empty",
                ProgressEvent::Verified { .. } => "verified",
                ProgressEvent::Rejected { .. } => "rejected",
                ProgressEvent::Exhausted { .. } => "exhausted",
            };
            sink.lock().unwrap().push(tag.to_string());
        });

    orch.run("task", 3).await.unwrap();

    assert_eq!(
        events.lock().unwrap().as_slice(),
        &["context", "start", "extracted", "rejected", "start", "extracted", "verified"]
    );
}

#[tokio::test]
async fn test_concurrent_runs_do_not_share_prompt_state() {
    let gen = ScriptedGenerator::always("```\nbad = 1\n```");
    let orch = Arc::new(orchestrator(gen.clone(), MarkerVerifier::reject_all("ERR")));

    let a = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.run("task a", 2).await })
    };
    let b = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.run("task b", 2).await })
    };
    let (ra, rb) = (a.await.unwrap().unwrap(), b.await.unwrap().unwrap());

    assert_eq!(ra.attempts.len(), 2);
    assert_eq!(rb.attempts.len(), 2);
    for prompt in gen.prompts() {
        // Each run appends at most its own single directive.
        assert!(prompt.matches("ERR").count() <= 1);
        assert!(prompt.contains("task a") ^ prompt.contains("task b"));
    }
}

#[tokio::test]
async fn test_provider_error_text_consumes_attempt() {
    let gen = ScriptedGenerator::new(&[
        "# ERROR GOOGLE: quota exceeded",
        "```python\ndef ok():\n    return 1\n```",
    ]);
    let verifier = Arc::new(codecraft::evaluator::static_analysis::PythonStaticAnalyzer::new()
        .with_syntax_check(false));
    let orch = Orchestrator::new(
        gen.clone(),
        StaticRetriever::new(""),
        verifier,
        AgentConfig::default(),
    );

    let result = orch.run("task", 2).await.unwrap();

    assert!(result.is_verified());
    assert_eq!(result.attempts.len(), 2);
    assert!(!result.attempts[0].is_verified());
}

#[tokio::test]
async fn test_extracted_preview_is_first_three_lines() {
    let gen = ScriptedGenerator::always("```python\ndef f():\n    a = 1\n    b = 2\n    return a + b\n```");
    let previews: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = previews.clone();
    let orch = orchestrator(gen, MarkerVerifier::accept_all()).with_progress(move |e| {
        if let ProgressEvent::Extracted { preview, .. } = e {
            sink.lock().unwrap().push(preview);
        }
    });

    orch.run("task", 1).await.unwrap();

    assert_eq!(
        previews.lock().unwrap().as_slice(),
        &["def f():\n    a = 1\n    b = 2".to_string()]
    );
}
